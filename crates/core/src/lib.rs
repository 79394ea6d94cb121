//! QuoteDesk Core - stock domain entities, services, and traits.
//!
//! This crate joins stored stock records with quotes from
//! `quotedesk-market-data`. Storage is behind [`StockRepositoryTrait`]; an
//! in-memory implementation is provided.

pub mod errors;
pub mod stocks;

pub use stocks::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

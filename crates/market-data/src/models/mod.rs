//! Market data models
//!
//! - `types` - Type aliases for common identifiers
//! - `quote` - Live quote and daily bar structures (Quote, HistoricalPoint)

mod quote;
mod types;

pub use quote::{HistoricalPoint, Quote};
pub use types::ProviderId;

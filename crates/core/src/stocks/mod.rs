//! Stocks module - stored records, quote enrichment and fallback derivation.

mod stocks_fallback;
mod stocks_model;
mod stocks_repository;
mod stocks_service;
mod stocks_traits;


pub use stocks_fallback::{price_change, FallbackPolicy};
pub use stocks_model::{CacheStatus, EnrichedStock, NewStock, QuoteSource, StockRecord};
pub use stocks_repository::InMemoryStockRepository;
pub use stocks_service::StockService;
pub use stocks_traits::{StockRepositoryTrait, StockServiceTrait};

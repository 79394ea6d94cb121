use async_trait::async_trait;
use quotedesk_market_data::HistoricalPoint;

use crate::errors::Result;
use crate::stocks::stocks_model::{CacheStatus, EnrichedStock, NewStock, StockRecord};

/// Trait for stock record storage.
///
/// Symbol lookups are case-insensitive.
#[async_trait]
pub trait StockRepositoryTrait: Send + Sync {
    fn find_all(&self) -> Result<Vec<StockRecord>>;
    fn find_by_symbol(&self, symbol: &str) -> Result<Option<StockRecord>>;
    async fn insert(&self, record: StockRecord) -> Result<StockRecord>;
}

/// Trait for stock service operations
#[async_trait]
pub trait StockServiceTrait: Send + Sync {
    /// Every stored stock with a quote. Per-symbol quote failures degrade to
    /// derived values; only repository failures are returned.
    async fn list_stocks(&self) -> Result<Vec<EnrichedStock>>;

    /// One stock with its live quote. Quote failures are returned.
    async fn get_stock(&self, symbol: &str) -> Result<EnrichedStock>;

    async fn get_history(&self, symbol: &str, days: u32) -> Result<Vec<HistoricalPoint>>;

    async fn create_stock(&self, new_stock: NewStock) -> Result<StockRecord>;

    fn cache_status(&self) -> CacheStatus;

    fn clear_cache(&self);
}

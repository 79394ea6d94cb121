use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use quotedesk_market_data::{HistoricalPoint, QuoteServiceTrait};

use super::stocks_fallback::FallbackPolicy;
use super::stocks_model::{CacheStatus, EnrichedStock, NewStock, StockRecord};
use super::stocks_traits::{StockRepositoryTrait, StockServiceTrait};
use crate::errors::{Error, Result, ValidationError};

/// Service joining stored stock records with market quotes.
pub struct StockService {
    repository: Arc<dyn StockRepositoryTrait>,
    quote_service: Arc<dyn QuoteServiceTrait>,
    fallback: FallbackPolicy,
}

impl StockService {
    pub fn new(
        repository: Arc<dyn StockRepositoryTrait>,
        quote_service: Arc<dyn QuoteServiceTrait>,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            repository,
            quote_service,
            fallback,
        }
    }

    fn require_stock(&self, symbol: &str) -> Result<StockRecord> {
        self.repository
            .find_by_symbol(symbol)?
            .ok_or_else(|| Error::StockNotFound(symbol.trim().to_uppercase()))
    }
}

#[async_trait]
impl StockServiceTrait for StockService {
    async fn list_stocks(&self) -> Result<Vec<EnrichedStock>> {
        let records = self.repository.find_all()?;
        let mut enriched = Vec::with_capacity(records.len());

        // One symbol at a time: keeps a single outstanding upstream request
        // per listing no matter how many records there are.
        for record in &records {
            match self.quote_service.get_live_quote(&record.symbol, true).await {
                Ok(quote) => enriched.push(EnrichedStock::from_live(record, quote)),
                Err(e) => {
                    warn!("Using stored prices for {}: {}", record.symbol, e);
                    enriched.push(self.fallback.derive(record));
                }
            }
        }

        debug!("Enriched {} stocks", enriched.len());
        Ok(enriched)
    }

    async fn get_stock(&self, symbol: &str) -> Result<EnrichedStock> {
        let record = self.require_stock(symbol)?;
        let quote = self
            .quote_service
            .get_live_quote(&record.symbol, true)
            .await?;
        Ok(EnrichedStock::from_live(&record, quote))
    }

    async fn get_history(&self, symbol: &str, days: u32) -> Result<Vec<HistoricalPoint>> {
        let record = self.require_stock(symbol)?;
        Ok(self
            .quote_service
            .get_historical_data(&record.symbol, days, true)
            .await?)
    }

    async fn create_stock(&self, new_stock: NewStock) -> Result<StockRecord> {
        let symbol = new_stock.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ValidationError::MissingField("symbol".to_string()).into());
        }
        if symbol.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidInput(format!(
                "symbol '{}' must not contain whitespace",
                symbol
            ))
            .into());
        }
        if let Some((field, price)) = new_stock.prices.iter().find(|(_, p)| p.is_sign_negative()) {
            return Err(ValidationError::InvalidInput(format!(
                "price '{}' must not be negative, got {}",
                field, price
            ))
            .into());
        }
        if self.repository.find_by_symbol(&symbol)?.is_some() {
            return Err(Error::StockAlreadyExists(symbol));
        }

        let record = StockRecord {
            id: new_stock
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| symbol.clone()),
            symbol,
            name: new_stock.name,
            company: new_stock.company,
            prices: new_stock.prices,
        };

        let created = self.repository.insert(record).await?;
        info!("Created stock {}", created.symbol);
        Ok(created)
    }

    fn cache_status(&self) -> CacheStatus {
        CacheStatus {
            cache: self.quote_service.cache_stats(),
            queue_length: self.quote_service.queue_length(),
        }
    }

    fn clear_cache(&self) {
        self.quote_service.clear_cache();
    }
}

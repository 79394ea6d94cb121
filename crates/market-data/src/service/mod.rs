//! Quote service: cache first, then the rate-limited provider.
//!
//! ```text
//! get_live_quote / get_historical_data
//!        │
//!        ├── cache hit ──────────────────────────────▶ return (no queue wait)
//!        │
//!        └── miss ─▶ RateLimiter::submit ─▶ QuoteProvider ─▶ cache.set ─▶ return
//! ```
//!
//! Every failure is wrapped into a [`QuoteFetchError`] carrying the symbol.
//! Nothing here swallows errors; degrading to stored data is the caller's call.

#[cfg(test)]
mod service_tests;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{debug, info};

use crate::cache::{CacheStats, ExpiringCache};
use crate::errors::{MarketDataError, QuoteFetchError};
use crate::models::{HistoricalPoint, Quote};
use crate::provider::QuoteProvider;
use crate::rate_limiter::RateLimiter;

/// Days of history returned when the caller does not say.
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

const DEFAULT_LIVE_QUOTE_TTL: Duration = Duration::from_secs(60);
const DEFAULT_HISTORY_TTL: Duration = Duration::from_secs(60 * 60);

/// Freshness windows for the two cached artifacts.
#[derive(Clone, Debug)]
pub struct QuoteServiceSettings {
    pub live_quote_ttl: Duration,
    pub history_ttl: Duration,
}

impl Default for QuoteServiceSettings {
    fn default() -> Self {
        Self {
            live_quote_ttl: DEFAULT_LIVE_QUOTE_TTL,
            history_ttl: DEFAULT_HISTORY_TTL,
        }
    }
}

/// What the shared cache stores.
#[derive(Clone, Debug)]
pub enum CachedPayload {
    Quote(Quote),
    History(Arc<Vec<HistoricalPoint>>),
}

pub fn quote_cache_key(symbol: &str) -> String {
    format!("quote:{}", symbol)
}

/// Different day counts are different artifacts and must not share an entry.
pub fn history_cache_key(symbol: &str, days: u32) -> String {
    format!("history:{}:{}", symbol, days)
}

/// Operations the rest of the application uses to get market data.
#[async_trait]
pub trait QuoteServiceTrait: Send + Sync {
    /// Current quote for `symbol` (case-insensitive).
    async fn get_live_quote(&self, symbol: &str, use_cache: bool) -> Result<Quote, QuoteFetchError>;

    /// Daily bars for the last `days` calendar days, newest first.
    async fn get_historical_data(
        &self,
        symbol: &str,
        days: u32,
        use_cache: bool,
    ) -> Result<Vec<HistoricalPoint>, QuoteFetchError>;

    fn cache_stats(&self) -> CacheStats;

    /// Upstream requests waiting for their turn.
    fn queue_length(&self) -> usize;

    fn clear_cache(&self);
}

/// Default [`QuoteServiceTrait`] implementation.
///
/// All three collaborators are injected so tests (and multiple services in
/// one process) get isolated instances.
pub struct QuoteService {
    provider: Arc<dyn QuoteProvider>,
    cache: Arc<ExpiringCache<CachedPayload>>,
    limiter: Arc<RateLimiter>,
    settings: QuoteServiceSettings,
}

impl QuoteService {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        cache: Arc<ExpiringCache<CachedPayload>>,
        limiter: Arc<RateLimiter>,
        settings: QuoteServiceSettings,
    ) -> Self {
        info!(
            "Quote service using {} (quote ttl {:?}, history ttl {:?}, min interval {:?})",
            provider.id(),
            settings.live_quote_ttl,
            settings.history_ttl,
            limiter.min_interval()
        );
        Self {
            provider,
            cache,
            limiter,
            settings,
        }
    }

    fn normalize_symbol(symbol: &str) -> Result<String, QuoteFetchError> {
        let normalized = symbol.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(QuoteFetchError::new(
                normalized,
                MarketDataError::InvalidRequest("symbol must not be empty".to_string()),
            ));
        }
        Ok(normalized)
    }
}

/// Sort newest first, drop duplicate dates, and keep only bars on or after
/// `today - days`.
pub(crate) fn normalize_series(
    mut points: Vec<HistoricalPoint>,
    days: u32,
    today: NaiveDate,
) -> Vec<HistoricalPoint> {
    let cutoff = today
        .checked_sub_days(chrono::Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);

    points.retain(|p| p.date >= cutoff);
    points.sort_by(|a, b| b.date.cmp(&a.date));
    points.dedup_by_key(|p| p.date);
    points
}

#[async_trait]
impl QuoteServiceTrait for QuoteService {
    async fn get_live_quote(&self, symbol: &str, use_cache: bool) -> Result<Quote, QuoteFetchError> {
        let symbol = Self::normalize_symbol(symbol)?;
        let key = quote_cache_key(&symbol);

        if use_cache {
            if let Some(CachedPayload::Quote(quote)) = self.cache.get(&key) {
                debug!("Quote cache hit for {}", symbol);
                return Ok(quote);
            }
        }
        debug!("Quote cache miss for {}, queueing upstream request", symbol);

        let provider = self.provider.clone();
        let upstream_symbol = symbol.clone();
        let quote = self
            .limiter
            .execute(move || async move { provider.fetch_live_quote(&upstream_symbol).await })
            .await
            .map_err(MarketDataError::from)
            .and_then(|result| result)
            .map_err(|cause| QuoteFetchError::new(symbol.clone(), cause))?;

        self.cache.set_with_ttl(
            key,
            CachedPayload::Quote(quote.clone()),
            self.settings.live_quote_ttl,
        );
        Ok(quote)
    }

    async fn get_historical_data(
        &self,
        symbol: &str,
        days: u32,
        use_cache: bool,
    ) -> Result<Vec<HistoricalPoint>, QuoteFetchError> {
        let symbol = Self::normalize_symbol(symbol)?;
        if days == 0 {
            return Err(QuoteFetchError::new(
                symbol,
                MarketDataError::InvalidRequest("days must be at least 1".to_string()),
            ));
        }
        let key = history_cache_key(&symbol, days);

        if use_cache {
            if let Some(CachedPayload::History(points)) = self.cache.get(&key) {
                debug!("History cache hit for {} ({} days)", symbol, days);
                return Ok(points.as_ref().clone());
            }
        }
        debug!(
            "History cache miss for {} ({} days), queueing upstream request",
            symbol, days
        );

        let provider = self.provider.clone();
        let upstream_symbol = symbol.clone();
        let points = self
            .limiter
            .execute(move || async move {
                provider.fetch_daily_history(&upstream_symbol, days).await
            })
            .await
            .map_err(MarketDataError::from)
            .and_then(|result| result)
            .map_err(|cause| QuoteFetchError::new(symbol.clone(), cause))?;

        let points = normalize_series(points, days, Utc::now().date_naive());

        self.cache.set_with_ttl(
            key,
            CachedPayload::History(Arc::new(points.clone())),
            self.settings.history_ttl,
        );
        Ok(points)
    }

    fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn queue_length(&self) -> usize {
        self.limiter.queue_length()
    }

    fn clear_cache(&self) {
        self.cache.clear();
        info!("Quote cache cleared");
    }
}

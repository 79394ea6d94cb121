//! Quote provider trait definition.
//!
//! This module defines the narrow adapter interface every upstream provider
//! implements. The quote service only talks to this trait, so caching and
//! rate limiting stay provider-agnostic.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{HistoricalPoint, Quote};

/// Adapter for one upstream market data API.
///
/// Implementations own the HTTP details and the provider-specific JSON
/// mapping. They do not cache and do not rate limit; the quote service does
/// both around every call.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use quotedesk_market_data::provider::QuoteProvider;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl QuoteProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     // ... implement fetch_live_quote and fetch_daily_history
/// }
/// ```
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "ALPHA_VANTAGE" or "FINNHUB".
    /// Used for logging and as the `source` of produced quotes.
    fn id(&self) -> &'static str;

    /// Fetch the current quote for an (already upper-cased) symbol.
    ///
    /// Provider sentinels for unknown symbols or missing data must come back
    /// as errors, never as a quote full of zeros.
    async fn fetch_live_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Fetch daily bars covering at least the last `days` calendar days.
    ///
    /// Ordering and trimming to the exact window are left to the caller.
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPoint>, MarketDataError>;
}

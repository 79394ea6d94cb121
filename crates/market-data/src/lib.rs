//! QuoteDesk Market Data Crate
//!
//! This crate fetches live quotes and daily history from a single upstream
//! market data provider, without exceeding the provider's request quota and
//! without repeating requests whose answers are still fresh.
//!
//! # Architecture
//!
//! ```text
//!                          +------------------+
//!                          |  QuoteService    |  (get_live_quote, get_historical_data)
//!                          +------------------+
//!                             |            |
//!                   hit       v            v   miss
//!                 +------------------+  +------------------+
//!                 |  ExpiringCache   |  |   RateLimiter    |  (one worker, FIFO, spaced)
//!                 +------------------+  +------------------+
//!                                                |
//!                                                v
//!                                       +------------------+
//!                                       |  QuoteProvider   |  (Alpha Vantage, Finnhub)
//!                                       +------------------+
//!                                                |
//!                                                v
//!                                       +------------------+
//!                                       | Quote / History  |
//!                                       +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Quote`] - Live quote with change, percent change and volume
//! - [`HistoricalPoint`] - One daily OHLCV bar
//! - [`QuoteFetchError`] - Failed lookup carrying the symbol and its cause
//! - [`FailureKind`] - Transport / provider rejection / mapping classification

pub mod cache;
pub mod errors;
pub mod models;
pub mod provider;
pub mod rate_limiter;
pub mod service;

pub use models::{HistoricalPoint, ProviderId, Quote};

pub use errors::{FailureKind, MarketDataError, QuoteFetchError};

pub use cache::{spawn_sweeper, CacheStats, ExpiringCache};

pub use rate_limiter::{interval_for_rate, RateLimiter, RateLimiterError, TaskHandle};

pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::finnhub::FinnhubProvider;
pub use provider::{build_provider, ProviderKind, QuoteProvider};

pub use service::{
    CachedPayload, QuoteService, QuoteServiceSettings, QuoteServiceTrait, DEFAULT_HISTORY_DAYS,
};

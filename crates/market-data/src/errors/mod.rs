//! Error types and failure classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: every way a single upstream fetch can fail
//! - [`FailureKind`]: the transport / rejection / mapping taxonomy
//! - [`QuoteFetchError`]: the one error the quote service hands to callers

mod kind;

pub use kind::FailureKind;

use thiserror::Error;

/// Errors that can occur while fetching or mapping upstream market data.
///
/// Each variant is classified into a [`FailureKind`] via [`kind`](Self::kind).
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider reports the symbol as unknown (or returned an empty quote).
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The symbol exists but the provider has no data for the requested window.
    #[error("No data available")]
    NoData,

    /// The provider told us to slow down, either via HTTP 429 or a notice in the body.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The provider rejected the request for a reason we do not model.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status} from {provider}")]
    HttpStatus {
        /// The provider that answered
        provider: String,
        /// Numeric HTTP status code
        status: u16,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The payload could not be decoded or a field had the wrong shape.
    #[error("Mapping failed: {message}")]
    Mapping {
        /// What did not match
        message: String,
    },

    /// The caller asked for something we can never satisfy (blank symbol, zero days).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The rate limiter's worker is gone or the queued operation panicked.
    #[error("Request queue unavailable")]
    QueueUnavailable,
}

impl MarketDataError {
    /// Shorthand for a mapping failure.
    pub fn mapping(message: impl Into<String>) -> Self {
        Self::Mapping {
            message: message.into(),
        }
    }

    /// Returns the failure classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use quotedesk_market_data::errors::{FailureKind, MarketDataError};
    ///
    /// let error = MarketDataError::RateLimited { provider: "FINNHUB".to_string() };
    /// assert_eq!(error.kind(), FailureKind::ProviderRejection);
    ///
    /// let error = MarketDataError::mapping("bad price");
    /// assert_eq!(error.kind(), FailureKind::Mapping);
    /// ```
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::SymbolNotFound(_)
            | Self::NoData
            | Self::RateLimited { .. }
            | Self::ProviderError { .. } => FailureKind::ProviderRejection,

            Self::Timeout { .. }
            | Self::HttpStatus { .. }
            | Self::Network(_)
            | Self::QueueUnavailable => FailureKind::Transport,

            Self::Mapping { .. } | Self::InvalidRequest(_) => FailureKind::Mapping,
        }
    }
}

/// A failed quote or history lookup, normalized at the quote service boundary.
///
/// Carries the (normalized) symbol and the underlying cause. This is the only
/// error shape the stock layer relies on when deciding to fall back.
#[derive(Error, Debug)]
#[error("Failed to fetch {symbol}: {cause}")]
pub struct QuoteFetchError {
    /// Upper-cased symbol the request was made for
    pub symbol: String,
    /// What went wrong
    #[source]
    pub cause: MarketDataError,
}

impl QuoteFetchError {
    pub fn new(symbol: impl Into<String>, cause: MarketDataError) -> Self {
        Self {
            symbol: symbol.into(),
            cause,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.cause.kind()
    }
}

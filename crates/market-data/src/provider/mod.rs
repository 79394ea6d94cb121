//! Upstream provider abstractions and implementations.
//!
//! This module contains:
//! - The `QuoteProvider` trait that all providers implement
//! - Concrete providers: Alpha Vantage (flat "global quote" objects) and
//!   Finnhub (parallel-array candles)
//! - `ProviderKind` / `build_provider` for picking the single configured one

mod traits;

pub mod alpha_vantage;
pub mod finnhub;

use std::str::FromStr;
use std::sync::Arc;

pub use traits::QuoteProvider;

use alpha_vantage::AlphaVantageProvider;
use finnhub::FinnhubProvider;

/// Which upstream API to talk to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderKind {
    AlphaVantage,
    Finnhub,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "alpha_vantage" | "alphavantage" => Ok(Self::AlphaVantage),
            "finnhub" => Ok(Self::Finnhub),
            other => Err(format!("Unknown market data provider: {}", other)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlphaVantage => write!(f, "alpha_vantage"),
            Self::Finnhub => write!(f, "finnhub"),
        }
    }
}

/// Build the configured provider.
///
/// `base_url` overrides the provider's public endpoint (proxies, test servers).
pub fn build_provider(
    kind: ProviderKind,
    api_key: String,
    base_url: Option<String>,
) -> Arc<dyn QuoteProvider> {
    match kind {
        ProviderKind::AlphaVantage => {
            let provider = AlphaVantageProvider::new(api_key);
            match base_url {
                Some(url) => Arc::new(provider.with_base_url(url)),
                None => Arc::new(provider),
            }
        }
        ProviderKind::Finnhub => {
            let provider = FinnhubProvider::new(api_key);
            match base_url {
                Some(url) => Arc::new(provider.with_base_url(url)),
                None => Arc::new(provider),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("alpha_vantage".parse::<ProviderKind>(), Ok(ProviderKind::AlphaVantage));
        assert_eq!("Alpha-Vantage".parse::<ProviderKind>(), Ok(ProviderKind::AlphaVantage));
        assert_eq!(" FINNHUB ".parse::<ProviderKind>(), Ok(ProviderKind::Finnhub));
        assert!("yahoo".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_build_provider_selects_implementation() {
        let provider = build_provider(ProviderKind::Finnhub, "key".to_string(), None);
        assert_eq!(provider.id(), "FINNHUB");

        let provider = build_provider(
            ProviderKind::AlphaVantage,
            "key".to_string(),
            Some("http://localhost:9999/query".to_string()),
        );
        assert_eq!(provider.id(), "ALPHA_VANTAGE");
    }
}

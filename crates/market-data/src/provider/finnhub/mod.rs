//! Finnhub market data provider implementation.
//!
//! This module provides market data from Finnhub API:
//! - Live quotes via /quote
//! - Daily history via /stock/candle (parallel arrays, one per field)
//!
//! API documentation: https://finnhub.io/docs/api

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{HistoricalPoint, Quote};
use crate::provider::QuoteProvider;

const BASE_URL: &str = "https://finnhub.io/api/v1";
const PROVIDER_ID: &str = "FINNHUB";

const SECONDS_PER_DAY: i64 = 86_400;

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /quote endpoint
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// Change
    d: Option<f64>,
    /// Percent change
    dp: Option<f64>,
    /// High price of the day
    h: Option<f64>,
    /// Low price of the day
    l: Option<f64>,
    /// Open price of the day
    o: Option<f64>,
    /// Previous close price
    pc: Option<f64>,
    /// Timestamp (Unix)
    t: Option<i64>,
}

/// Response from /stock/candle endpoint
#[derive(Debug, Deserialize)]
struct CandleResponse {
    /// Status: "ok" or "no_data"
    s: String,
    /// Close prices
    #[serde(default)]
    c: Vec<f64>,
    /// High prices
    #[serde(default)]
    h: Vec<f64>,
    /// Low prices
    #[serde(default)]
    l: Vec<f64>,
    /// Open prices
    #[serde(default)]
    o: Vec<f64>,
    /// Volume
    #[serde(default)]
    v: Vec<f64>,
    /// Timestamps (Unix)
    #[serde(default)]
    t: Vec<i64>,
}

/// Error response from Finnhub
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

// ============================================================================
// FinnhubProvider
// ============================================================================

/// Finnhub market data provider.
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FinnhubProvider {
    /// Create a new Finnhub provider with the given API key.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the provider at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Make a GET request to the Finnhub API.
    async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let url = format!("{}{}", self.base_url, endpoint);

        // API key as header keeps it out of logged URLs
        let request = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", &self.api_key)
            .query(params);

        debug!("Finnhub request: {} with {} params", endpoint, params.len());

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::Network(e)
            }
        })?;

        let status = response.status();

        // 403 is what Finnhub sends once the key's quota is used up
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Invalid or missing API key".to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(ErrorResponse { error: Some(message) }) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message,
                });
            }

            return Err(MarketDataError::HttpStatus {
                provider: PROVIDER_ID.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(MarketDataError::Network)
    }

    fn to_decimal(field: &str, value: f64) -> Result<Decimal, MarketDataError> {
        Decimal::try_from(value)
            .map_err(|_| MarketDataError::mapping(format!("invalid {}: {}", field, value)))
    }

    fn to_optional_decimal(field: &str, value: Option<f64>) -> Result<Option<Decimal>, MarketDataError> {
        value.map(|v| Self::to_decimal(field, v)).transpose()
    }

    /// Map a /quote payload into a [`Quote`].
    fn map_quote(symbol: &str, text: &str) -> Result<Quote, MarketDataError> {
        let response: QuoteResponse = serde_json::from_str(text).map_err(|e| {
            MarketDataError::mapping(format!("Failed to parse quote response: {}", e))
        })?;

        let price = response.c.unwrap_or(0.0);

        // Finnhub returns zeros (and null change fields) for unknown symbols
        if price == 0.0 && response.o.unwrap_or(0.0) == 0.0 {
            return Err(MarketDataError::SymbolNotFound(format!(
                "Symbol not found or no trading data: {}",
                symbol
            )));
        }

        let timestamp = response
            .t
            .filter(|ts| *ts > 0)
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());

        Ok(Quote {
            symbol: symbol.to_string(),
            price: Self::to_decimal("price", price)?,
            change: Self::to_decimal("change", response.d.unwrap_or(0.0))?,
            change_percent: Self::to_decimal("change percent", response.dp.unwrap_or(0.0))?,
            // /quote does not report volume
            volume: 0,
            high: Self::to_optional_decimal("high", response.h)?,
            low: Self::to_optional_decimal("low", response.l)?,
            open: Self::to_optional_decimal("open", response.o)?,
            previous_close: Self::to_optional_decimal("previous close", response.pc)?,
            timestamp,
            source: PROVIDER_ID.into(),
        })
    }

    /// Map a /stock/candle payload into daily bars (unordered).
    fn map_candles(symbol: &str, text: &str) -> Result<Vec<HistoricalPoint>, MarketDataError> {
        let response: CandleResponse = serde_json::from_str(text).map_err(|e| {
            MarketDataError::mapping(format!("Failed to parse candle response: {}", e))
        })?;

        if response.s == "no_data" {
            return Err(MarketDataError::NoData);
        }

        if response.s != "ok" {
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Unexpected candle status: {}", response.s),
            });
        }

        let len = response.t.len();
        if response.c.len() != len
            || response.o.len() != len
            || response.h.len() != len
            || response.l.len() != len
        {
            return Err(MarketDataError::mapping(
                "Mismatched array lengths in candle response",
            ));
        }

        if len == 0 {
            return Err(MarketDataError::NoData);
        }

        let mut points = Vec::with_capacity(len);

        for i in 0..len {
            let Some(timestamp) = Utc.timestamp_opt(response.t[i], 0).single() else {
                warn!("Invalid timestamp at index {} for {}: {}", i, symbol, response.t[i]);
                continue;
            };

            let volume = response
                .v
                .get(i)
                .copied()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v.round() as u64)
                .unwrap_or(0);

            points.push(HistoricalPoint {
                date: timestamp.date_naive(),
                open: Self::to_decimal("open", response.o[i])?,
                high: Self::to_decimal("high", response.h[i])?,
                low: Self::to_decimal("low", response.l[i])?,
                close: Self::to_decimal("close", response.c[i])?,
                volume,
            });
        }

        Ok(points)
    }
}

// ============================================================================
// QuoteProvider Implementation
// ============================================================================

#[async_trait]
impl QuoteProvider for FinnhubProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_live_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let text = self.fetch("/quote", &[("symbol", symbol)]).await?;
        let quote = Self::map_quote(symbol, &text)?;

        debug!("Finnhub: fetched quote for {} at {}", symbol, quote.price);
        Ok(quote)
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPoint>, MarketDataError> {
        let to = Utc::now().timestamp();
        let from = to - i64::from(days) * SECONDS_PER_DAY;
        let (from_ts, to_ts) = (from.to_string(), to.to_string());

        let params = [
            ("symbol", symbol),
            ("resolution", "D"),
            ("from", from_ts.as_str()),
            ("to", to_ts.as_str()),
        ];

        let text = self.fetch("/stock/candle", &params).await?;
        let points = Self::map_candles(symbol, &text)?;

        debug!(
            "Finnhub: fetched {} daily candles for {} over {} days",
            points.len(),
            symbol,
            days
        );
        Ok(points)
    }
}

// ============================================================================
// Tests
// ============================================================================

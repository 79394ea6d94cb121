//! Alpha Vantage market data provider implementation.
//!
//! This module provides market data from Alpha Vantage API:
//! - Live quotes via GLOBAL_QUOTE (a flat object of numbered string fields)
//! - Daily history via TIME_SERIES_DAILY
//!
//! Alpha Vantage reports most problems inside a 200 response body ("Error
//! Message", "Note", "Information"), so every payload is checked for those
//! before mapping.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::MarketDataError;
use crate::models::{HistoricalPoint, Quote};
use crate::provider::QuoteProvider;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// `compact` returns the latest 100 data points; anything longer needs `full`.
const COMPACT_OUTPUT_DAYS: u32 = 100;

/// Alpha Vantage market data provider.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// GLOBAL_QUOTE response
#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

/// Unknown symbols come back as `"Global Quote": {}`, so every field is optional.
#[derive(Debug, Default, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "02. open")]
    open: Option<String>,
    #[serde(rename = "03. high")]
    high: Option<String>,
    #[serde(rename = "04. low")]
    low: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
    #[serde(rename = "08. previous close")]
    previous_close: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

impl GlobalQuote {
    fn is_empty(&self) -> bool {
        self.symbol.is_none() && self.price.is_none()
    }
}

/// TIME_SERIES_DAILY response for equities
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyBar>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

// ============================================================================
// AlphaVantageProvider implementation
// ============================================================================

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider with the given API key.
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

    /// Point the provider at a different query endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(&self.base_url, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::Network(e)
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::HttpStatus {
                provider: PROVIDER_ID.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(MarketDataError::Network)
    }

    /// Check for API-level errors in the response.
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(ref msg) = error_message {
            // Alpha Vantage answers unknown symbols with "Invalid API call"
            if msg.contains("Invalid API call") || msg.contains("not found") {
                return Err(MarketDataError::SymbolNotFound(msg.clone()));
            }
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: msg.clone(),
            });
        }

        // "Note" and "Information" both carry the daily/per-minute quota notice
        for msg in [note, information].into_iter().flatten() {
            if Self::is_rate_limit_notice(msg) {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage notice: {}", msg);
        }

        Ok(())
    }

    fn is_rate_limit_notice(msg: &str) -> bool {
        let lower = msg.to_lowercase();
        lower.contains("api call frequency")
            || lower.contains("rate limit")
            || lower.contains("requests per day")
    }

    /// Parse a numeric string field. Absent or blank means zero; anything
    /// else that does not parse is a mapping failure.
    fn parse_decimal_field(name: &str, raw: &Option<String>) -> Result<Decimal, MarketDataError> {
        Ok(Self::parse_optional_decimal_field(name, raw)?.unwrap_or(Decimal::ZERO))
    }

    fn parse_optional_decimal_field(
        name: &str,
        raw: &Option<String>,
    ) -> Result<Option<Decimal>, MarketDataError> {
        let Some(value) = raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        let value = value.trim_end_matches('%');
        Decimal::from_str(value)
            .or_else(|_| Decimal::from_scientific(value))
            .map(Some)
            .map_err(|_| MarketDataError::mapping(format!("invalid {}: '{}'", name, value)))
    }

    fn parse_volume(name: &str, raw: &Option<String>) -> Result<u64, MarketDataError> {
        let Some(value) = raw.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(0);
        };
        value
            .parse::<u64>()
            .map_err(|_| MarketDataError::mapping(format!("invalid {}: '{}'", name, value)))
    }

    /// Map a GLOBAL_QUOTE payload into a [`Quote`].
    fn map_global_quote(symbol: &str, text: &str) -> Result<Quote, MarketDataError> {
        let response: GlobalQuoteResponse = serde_json::from_str(text).map_err(|e| {
            MarketDataError::mapping(format!("Failed to parse GLOBAL_QUOTE response: {}", e))
        })?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let quote = response.global_quote.unwrap_or_default();
        if quote.is_empty() {
            return Err(MarketDataError::SymbolNotFound(format!(
                "No quote data for symbol: {}",
                symbol
            )));
        }

        let timestamp = quote
            .latest_trading_day
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|dt| Utc.from_local_datetime(&dt).single());

        Ok(Quote {
            symbol: quote
                .symbol
                .as_deref()
                .map(str::to_uppercase)
                .unwrap_or_else(|| symbol.to_string()),
            price: Self::parse_decimal_field("price", &quote.price)?,
            change: Self::parse_decimal_field("change", &quote.change)?,
            change_percent: Self::parse_decimal_field("change percent", &quote.change_percent)?,
            volume: Self::parse_volume("volume", &quote.volume)?,
            high: Self::parse_optional_decimal_field("high", &quote.high)?,
            low: Self::parse_optional_decimal_field("low", &quote.low)?,
            open: Self::parse_optional_decimal_field("open", &quote.open)?,
            previous_close: Self::parse_optional_decimal_field(
                "previous close",
                &quote.previous_close,
            )?,
            timestamp,
            source: PROVIDER_ID.into(),
        })
    }

    /// Map a TIME_SERIES_DAILY payload into daily bars (unordered).
    ///
    /// Rows that fail to parse are skipped; a series where nothing parses is
    /// a mapping failure.
    fn map_time_series(symbol: &str, text: &str) -> Result<Vec<HistoricalPoint>, MarketDataError> {
        let response: TimeSeriesResponse = serde_json::from_str(text).map_err(|e| {
            MarketDataError::mapping(format!("Failed to parse TIME_SERIES_DAILY response: {}", e))
        })?;

        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        let time_series = response.time_series.ok_or_else(|| {
            MarketDataError::SymbolNotFound(format!("No time series for symbol: {}", symbol))
        })?;

        if time_series.is_empty() {
            return Err(MarketDataError::NoData);
        }

        let total = time_series.len();
        let points: Vec<HistoricalPoint> = time_series
            .into_iter()
            .filter_map(|(date_str, bar)| {
                let point = Self::map_daily_bar(&date_str, &bar);
                if point.is_none() {
                    warn!("Alpha Vantage: skipping malformed bar {} for {}", date_str, symbol);
                }
                point
            })
            .collect();

        if points.is_empty() {
            return Err(MarketDataError::mapping(format!(
                "none of {} daily bars for {} could be parsed",
                total, symbol
            )));
        }

        Ok(points)
    }

    fn map_daily_bar(date_str: &str, bar: &DailyBar) -> Option<HistoricalPoint> {
        Some(HistoricalPoint {
            date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?,
            open: Decimal::from_str(&bar.open).ok()?,
            high: Decimal::from_str(&bar.high).ok()?,
            low: Decimal::from_str(&bar.low).ok()?,
            close: Decimal::from_str(&bar.close).ok()?,
            volume: bar.volume.parse().ok()?,
        })
    }
}

// ============================================================================
// QuoteProvider Implementation
// ============================================================================

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_live_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol)];
        let text = self.fetch(&params).await?;
        let quote = Self::map_global_quote(symbol, &text)?;

        debug!("Alpha Vantage: fetched quote for {} at {}", symbol, quote.price);
        Ok(quote)
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPoint>, MarketDataError> {
        let output_size = if days <= COMPACT_OUTPUT_DAYS {
            "compact"
        } else {
            "full"
        };
        let params = [
            ("function", "TIME_SERIES_DAILY"),
            ("symbol", symbol),
            ("outputsize", output_size),
        ];

        let text = self.fetch(&params).await?;
        let points = Self::map_time_series(symbol, &text)?;

        debug!(
            "Alpha Vantage: fetched {} daily bars for {}",
            points.len(),
            symbol
        );
        Ok(points)
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::ProviderId;

/// Live market quote for one symbol.
///
/// Numeric fields the provider did not send are zero rather than absent; the
/// OHLC extras stay optional because some providers never send them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Upper-cased ticker
    pub symbol: String,

    /// Last/current price
    pub price: Decimal,

    /// Absolute change versus previous close
    pub change: Decimal,

    /// Percent change versus previous close (e.g. `1.25` for +1.25%)
    pub change_percent: Decimal,

    /// Trading volume for the session
    pub volume: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<Decimal>,

    /// When the provider says this quote was taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Provider that produced the quote (ALPHA_VANTAGE, FINNHUB)
    pub source: ProviderId,
}

impl Quote {
    /// Create a quote with the required fields; extras default to `None`.
    pub fn new(
        symbol: impl Into<String>,
        price: Decimal,
        change: Decimal,
        change_percent: Decimal,
        volume: u64,
        source: ProviderId,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change,
            change_percent,
            volume,
            high: None,
            low: None,
            open: None,
            previous_close: None,
            timestamp: None,
            source,
        }
    }
}

/// One daily bar of a historical series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

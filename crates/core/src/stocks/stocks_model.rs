//! Stocks domain models.

use std::collections::BTreeMap;

use quotedesk_market_data::{CacheStats, Quote};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored stock record.
///
/// `prices` holds whatever baseline price fields were last written for the
/// stock (`c`, `pc`, `current`, ...). They are only read when a live quote
/// cannot be fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub id: String,
    pub symbol: String,
    pub name: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub prices: BTreeMap<String, Decimal>,
}

/// Input model for creating a new stock record
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewStock {
    pub id: Option<String>,
    pub symbol: String,
    pub name: Option<String>,
    pub company: Option<String>,
    #[serde(default)]
    pub prices: BTreeMap<String, Decimal>,
}

/// Which path produced an [`EnrichedStock`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    Live,
    Derived,
}

/// A stock record merged with its quote.
///
/// Live and derived entries have the same shape so consumers do not need to
/// care which one they got.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedStock {
    pub id: String,
    pub symbol: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub volume: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<Decimal>,
    pub source: QuoteSource,
}

impl EnrichedStock {
    /// Merge a stored record with a freshly fetched quote.
    pub fn from_live(record: &StockRecord, quote: Quote) -> Self {
        Self {
            id: record.id.clone(),
            symbol: record.symbol.clone(),
            name: record.name.clone(),
            company: record.company.clone(),
            price: quote.price,
            change: quote.change,
            change_percent: quote.change_percent,
            volume: quote.volume,
            high: quote.high,
            low: quote.low,
            open: quote.open,
            previous_close: quote.previous_close,
            source: QuoteSource::Live,
        }
    }
}

/// Operational snapshot of the quote pipeline.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub cache: CacheStats,
    pub queue_length: usize,
}

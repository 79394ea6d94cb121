//! Derived quotes from stored baseline prices.
//!
//! Used by batch listings when a live fetch fails for one symbol. Which
//! stored fields count as "current", "baseline" and "previous" is a
//! [`FallbackPolicy`], each list tried in order.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::stocks_model::{EnrichedStock, QuoteSource, StockRecord};

/// Field precedence for deriving a quote from a [`StockRecord`]'s prices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FallbackPolicy {
    pub current_fields: Vec<String>,
    pub baseline_fields: Vec<String>,
    pub previous_fields: Vec<String>,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            current_fields: vec!["current".to_string(), "c".to_string()],
            baseline_fields: vec!["baseline".to_string(), "initial".to_string()],
            previous_fields: vec!["pc".to_string()],
        }
    }
}

fn first_present(prices: &BTreeMap<String, Decimal>, fields: &[String]) -> Option<Decimal> {
    fields.iter().find_map(|field| prices.get(field).copied())
}

/// `(change, change_percent)` of `current` against `previous`.
///
/// Percent is zero when `previous` is zero or the division overflows. Both
/// are zero when the difference itself overflows.
pub fn price_change(current: Decimal, previous: Decimal) -> (Decimal, Decimal) {
    let Some(change) = current.checked_sub(previous) else {
        return (Decimal::ZERO, Decimal::ZERO);
    };
    if previous.is_zero() {
        return (change, Decimal::ZERO);
    }
    let percent = change
        .checked_div(previous)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO);
    (change, percent)
}

impl FallbackPolicy {
    pub fn current_price(&self, prices: &BTreeMap<String, Decimal>) -> Decimal {
        first_present(prices, &self.current_fields)
            .or_else(|| first_present(prices, &self.baseline_fields))
            .unwrap_or(Decimal::ZERO)
    }

    /// Falls back to `current`, which yields a zero change.
    pub fn previous_price(&self, prices: &BTreeMap<String, Decimal>, current: Decimal) -> Decimal {
        first_present(prices, &self.previous_fields)
            .or_else(|| first_present(prices, &self.baseline_fields))
            .unwrap_or(current)
    }

    /// Build a quote-shaped entry from the record's stored prices alone.
    pub fn derive(&self, record: &StockRecord) -> EnrichedStock {
        let price = self.current_price(&record.prices);
        let previous = self.previous_price(&record.prices, price);
        let (change, change_percent) = price_change(price, previous);

        EnrichedStock {
            id: record.id.clone(),
            symbol: record.symbol.clone(),
            name: record.name.clone(),
            company: record.company.clone(),
            price,
            change,
            change_percent,
            volume: 0,
            high: None,
            low: None,
            open: None,
            previous_close: Some(previous),
            source: QuoteSource::Derived,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(prices: &[(&str, Decimal)]) -> StockRecord {
        StockRecord {
            id: "1".to_string(),
            symbol: "AAPL".to_string(),
            name: Some("Apple".to_string()),
            company: Some("Apple Inc.".to_string()),
            prices: prices
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    #[test]
    fn test_change_against_previous_close() {
        let derived = FallbackPolicy::default().derive(&record(&[("c", dec!(100)), ("pc", dec!(90))]));

        assert_eq!(derived.price, dec!(100));
        assert_eq!(derived.change, dec!(10));
        assert_eq!(derived.change_percent.round_dp(2), dec!(11.11));
        assert_eq!(derived.previous_close, Some(dec!(90)));
        assert_eq!(derived.source, QuoteSource::Derived);
        assert_eq!(derived.company.as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn test_zero_previous_gives_zero_percent() {
        let derived = FallbackPolicy::default().derive(&record(&[("c", dec!(100)), ("pc", dec!(0))]));

        assert_eq!(derived.change, dec!(100));
        assert_eq!(derived.change_percent, Decimal::ZERO);
    }

    #[test]
    fn test_current_field_precedence() {
        let derived = FallbackPolicy::default()
            .derive(&record(&[("current", dec!(120)), ("c", dec!(100)), ("pc", dec!(100))]));

        assert_eq!(derived.price, dec!(120));
        assert_eq!(derived.change_percent, dec!(20));
    }

    #[test]
    fn test_baseline_used_when_no_current() {
        let derived =
            FallbackPolicy::default().derive(&record(&[("initial", dec!(50)), ("pc", dec!(40))]));

        assert_eq!(derived.price, dec!(50));
        assert_eq!(derived.change, dec!(10));
    }

    #[test]
    fn test_previous_falls_back_to_baseline_then_current() {
        let policy = FallbackPolicy::default();

        let derived = policy.derive(&record(&[("c", dec!(110)), ("baseline", dec!(100))]));
        assert_eq!(derived.change, dec!(10));
        assert_eq!(derived.change_percent, dec!(10));

        let derived = policy.derive(&record(&[("c", dec!(110))]));
        assert_eq!(derived.change, Decimal::ZERO);
        assert_eq!(derived.change_percent, Decimal::ZERO);
        assert_eq!(derived.previous_close, Some(dec!(110)));
    }

    #[test]
    fn test_no_prices_at_all() {
        let derived = FallbackPolicy::default().derive(&record(&[]));

        assert_eq!(derived.price, Decimal::ZERO);
        assert_eq!(derived.change, Decimal::ZERO);
        assert_eq!(derived.change_percent, Decimal::ZERO);
        assert_eq!(derived.volume, 0);
    }

    #[test]
    fn test_custom_policy() {
        let policy = FallbackPolicy {
            current_fields: vec!["close".to_string()],
            baseline_fields: vec![],
            previous_fields: vec!["prev".to_string()],
        };
        let derived = policy.derive(&record(&[("c", dec!(1)), ("close", dec!(30)), ("prev", dec!(20))]));

        assert_eq!(derived.price, dec!(30));
        assert_eq!(derived.change, dec!(10));
        assert_eq!(derived.change_percent, dec!(50));
    }

    #[test]
    fn test_negative_change() {
        let (change, percent) = price_change(dec!(45), dec!(50));
        assert_eq!(change, dec!(-5));
        assert_eq!(percent, dec!(-10));
    }

    #[test]
    fn test_overflowing_change_is_zero() {
        assert_eq!(
            price_change(Decimal::MAX, dec!(-1)),
            (Decimal::ZERO, Decimal::ZERO)
        );
        assert_eq!(
            price_change(Decimal::MIN, dec!(1)),
            (Decimal::ZERO, Decimal::ZERO)
        );
    }

    #[test]
    fn test_derive_with_extreme_stored_prices() {
        let derived =
            FallbackPolicy::default().derive(&record(&[("c", Decimal::MAX), ("pc", Decimal::MIN)]));

        assert_eq!(derived.price, Decimal::MAX);
        assert_eq!(derived.change, Decimal::ZERO);
        assert_eq!(derived.change_percent, Decimal::ZERO);
    }
}

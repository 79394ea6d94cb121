use super::*;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Days;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::time::Instant;

use crate::errors::FailureKind;

const INTERVAL: Duration = Duration::from_secs(1);

#[derive(Default)]
struct MockProvider {
    quote_calls: AtomicUsize,
    history_calls: Mutex<Vec<(String, u32)>>,
    unknown_symbols: HashSet<String>,
    history: Vec<HistoricalPoint>,
}

impl MockProvider {
    fn with_unknown(symbol: &str) -> Self {
        Self {
            unknown_symbols: HashSet::from([symbol.to_string()]),
            ..Default::default()
        }
    }

    fn with_history(history: Vec<HistoricalPoint>) -> Self {
        Self {
            history,
            ..Default::default()
        }
    }

    fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    fn history_calls(&self) -> Vec<(String, u32)> {
        self.history_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteProvider for MockProvider {
    fn id(&self) -> &'static str {
        "MOCK"
    }

    async fn fetch_live_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let call = self.quote_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.unknown_symbols.contains(symbol) {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }
        // Price moves with every upstream call so cache hits are observable.
        Ok(Quote::new(
            symbol,
            dec!(100) + Decimal::from(call as u64),
            dec!(1),
            dec!(1),
            1_000,
            "MOCK".into(),
        ))
    }

    async fn fetch_daily_history(
        &self,
        symbol: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPoint>, MarketDataError> {
        self.history_calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), days));
        if self.unknown_symbols.contains(symbol) {
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }
        Ok(self.history.clone())
    }
}

fn bar(days_ago: u64, close: Decimal) -> HistoricalPoint {
    let date = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(days_ago))
        .unwrap();
    HistoricalPoint {
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 10,
    }
}

fn service_with(provider: Arc<MockProvider>) -> QuoteService {
    QuoteService::new(
        provider,
        Arc::new(ExpiringCache::new(Duration::from_secs(60))),
        Arc::new(RateLimiter::with_min_interval(INTERVAL)),
        QuoteServiceSettings::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_second_quote_within_ttl_is_served_from_cache() {
    let provider = Arc::new(MockProvider::default());
    let service = service_with(provider.clone());

    let first = service.get_live_quote("AAPL", true).await.unwrap();
    let start = Instant::now();
    let second = service.get_live_quote("AAPL", true).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.quote_calls(), 1);
    // A hit never waits for a queue slot.
    assert!(start.elapsed() < INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn test_symbol_is_case_insensitive() {
    let provider = Arc::new(MockProvider::default());
    let service = service_with(provider.clone());

    let lower = service.get_live_quote(" aapl ", true).await.unwrap();
    let upper = service.get_live_quote("AAPL", true).await.unwrap();

    assert_eq!(lower.symbol, "AAPL");
    assert_eq!(lower, upper);
    assert_eq!(provider.quote_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bypassing_cache_goes_upstream_and_is_rate_limited() {
    let provider = Arc::new(MockProvider::default());
    let service = service_with(provider.clone());
    let start = Instant::now();

    let first = service.get_live_quote("MSFT", false).await.unwrap();
    let second = service.get_live_quote("MSFT", false).await.unwrap();

    assert_eq!(provider.quote_calls(), 2);
    assert_ne!(first.price, second.price);
    assert!(start.elapsed() >= INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn test_bypass_refreshes_cached_quote() {
    let provider = Arc::new(MockProvider::default());
    let service = service_with(provider.clone());

    service.get_live_quote("MSFT", true).await.unwrap();
    let refreshed = service.get_live_quote("MSFT", false).await.unwrap();
    let cached = service.get_live_quote("MSFT", true).await.unwrap();

    assert_eq!(refreshed, cached);
    assert_eq!(provider.quote_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_quote_refetched_after_ttl() {
    let provider = Arc::new(MockProvider::default());
    let service = service_with(provider.clone());

    service.get_live_quote("AAPL", true).await.unwrap();
    tokio::time::advance(Duration::from_secs(59)).await;
    service.get_live_quote("AAPL", true).await.unwrap();
    assert_eq!(provider.quote_calls(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    service.get_live_quote("AAPL", true).await.unwrap();
    assert_eq!(provider.quote_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failure_is_wrapped_with_symbol_and_not_cached() {
    let provider = Arc::new(MockProvider::with_unknown("NOPE"));
    let service = service_with(provider.clone());

    let err = service.get_live_quote("nope", true).await.unwrap_err();
    assert_eq!(err.symbol, "NOPE");
    assert!(matches!(err.cause, MarketDataError::SymbolNotFound(_)));
    assert_eq!(err.kind(), FailureKind::ProviderRejection);
    assert!(err.to_string().contains("NOPE"));

    service.get_live_quote("NOPE", true).await.unwrap_err();
    assert_eq!(provider.quote_calls(), 2);
    assert_eq!(service.cache_stats().total, 0);
}

#[tokio::test(start_paused = true)]
async fn test_blank_symbol_rejected_without_upstream_call() {
    let provider = Arc::new(MockProvider::default());
    let service = service_with(provider.clone());

    let err = service.get_live_quote("   ", true).await.unwrap_err();
    assert!(matches!(err.cause, MarketDataError::InvalidRequest(_)));

    let err = service.get_historical_data("", 30, true).await.unwrap_err();
    assert!(matches!(err.cause, MarketDataError::InvalidRequest(_)));

    assert_eq!(provider.quote_calls(), 0);
    assert!(provider.history_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_zero_days_rejected() {
    let provider = Arc::new(MockProvider::default());
    let service = service_with(provider.clone());

    let err = service.get_historical_data("AAPL", 0, true).await.unwrap_err();
    assert_eq!(err.symbol, "AAPL");
    assert!(matches!(err.cause, MarketDataError::InvalidRequest(_)));
    assert!(provider.history_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_history_keys_are_isolated_by_days() {
    let provider = Arc::new(MockProvider::with_history(vec![bar(1, dec!(10))]));
    let service = service_with(provider.clone());

    service.get_historical_data("AAPL", 30, true).await.unwrap();
    service.get_historical_data("AAPL", 90, true).await.unwrap();
    service.get_historical_data("AAPL", 30, true).await.unwrap();

    assert_eq!(
        provider.history_calls(),
        vec![("AAPL".to_string(), 30), ("AAPL".to_string(), 90)]
    );
    assert_eq!(service.cache_stats().valid, 2);
}

#[tokio::test(start_paused = true)]
async fn test_quote_and_history_do_not_share_entries() {
    let provider = Arc::new(MockProvider::with_history(vec![bar(1, dec!(10))]));
    let service = service_with(provider.clone());

    service.get_historical_data("AAPL", 30, true).await.unwrap();
    service.get_live_quote("AAPL", true).await.unwrap();

    assert_eq!(provider.quote_calls(), 1);
    assert_eq!(provider.history_calls().len(), 1);
    assert_eq!(service.cache_stats().valid, 2);
}

#[tokio::test(start_paused = true)]
async fn test_history_is_newest_first_and_trimmed_to_window() {
    let provider = Arc::new(MockProvider::with_history(vec![
        bar(40, dec!(1)),
        bar(3, dec!(3)),
        bar(10, dec!(2)),
        bar(3, dec!(99)),
        bar(1, dec!(4)),
    ]));
    let service = service_with(provider);

    let points = service.get_historical_data("AAPL", 30, true).await.unwrap();

    let closes: Vec<_> = points.iter().map(|p| p.close).collect();
    assert_eq!(closes, vec![dec!(4), dec!(3), dec!(2)]);
    assert!(points.windows(2).all(|w| w[0].date > w[1].date));
}

#[tokio::test(start_paused = true)]
async fn test_history_refetched_after_ttl() {
    let provider = Arc::new(MockProvider::with_history(vec![bar(1, dec!(10))]));
    let service = service_with(provider.clone());

    service.get_historical_data("AAPL", 30, true).await.unwrap();
    tokio::time::advance(Duration::from_secs(60 * 30)).await;
    service.get_historical_data("AAPL", 30, true).await.unwrap();
    assert_eq!(provider.history_calls().len(), 1);

    tokio::time::advance(Duration::from_secs(60 * 30)).await;
    service.get_historical_data("AAPL", 30, true).await.unwrap();
    assert_eq!(provider.history_calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_cache_forces_refetch() {
    let provider = Arc::new(MockProvider::default());
    let service = service_with(provider.clone());

    service.get_live_quote("AAPL", true).await.unwrap();
    service.clear_cache();
    assert_eq!(service.cache_stats(), CacheStats::default());

    service.get_live_quote("AAPL", true).await.unwrap();
    assert_eq!(provider.quote_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_queue_length_reflects_waiting_requests() {
    let provider = Arc::new(MockProvider::default());
    let service = Arc::new(service_with(provider.clone()));
    assert_eq!(service.queue_length(), 0);

    let callers: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|symbol| {
            let service = service.clone();
            tokio::spawn(async move { service.get_live_quote(symbol, true).await })
        })
        .collect();

    for caller in callers {
        caller.await.unwrap().unwrap();
    }
    assert_eq!(service.queue_length(), 0);
    assert_eq!(provider.quote_calls(), 3);
}

#[test]
fn test_normalize_series_handles_empty_input() {
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    assert!(normalize_series(Vec::new(), 30, today).is_empty());
}

#[test]
fn test_cache_keys() {
    assert_eq!(quote_cache_key("AAPL"), "quote:AAPL");
    assert_eq!(history_cache_key("AAPL", 30), "history:AAPL:30");
    assert_ne!(history_cache_key("AAPL", 30), history_cache_key("AAPL", 90));
}

use std::sync::Arc;

use crate::config::Config;
use quotedesk_core::{
    InMemoryStockRepository, StockRepositoryTrait, StockService, StockServiceTrait,
};
use quotedesk_market_data::{
    build_provider, spawn_sweeper, CachedPayload, ExpiringCache, QuoteProvider, QuoteService,
    QuoteServiceSettings, RateLimiter,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub stock_service: Arc<dyn StockServiceTrait>,
    pub provider_id: &'static str,
    /// Bearer token for admin routes; admin routes are refused when unset.
    pub admin_token: Option<String>,
}

pub fn init_tracing() {
    let log_format = std::env::var("QD_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let provider = build_provider(
        config.provider,
        config.api_key.clone(),
        config.provider_base_url.clone(),
    );
    tracing::info!("Market data provider: {}", config.provider);
    build_state_with_provider(config, provider).await
}

/// Wire the quote pipeline and stock service around an already-built provider.
///
/// Must run inside a tokio runtime: the rate limiter worker and the cache
/// sweeper are spawned here.
pub async fn build_state_with_provider(
    config: &Config,
    provider: Arc<dyn QuoteProvider>,
) -> anyhow::Result<Arc<AppState>> {
    let provider_id = provider.id();

    let cache = Arc::new(ExpiringCache::<CachedPayload>::new(config.cache_ttl));
    // The sweeper holds a weak reference and stops once the cache is dropped.
    spawn_sweeper(&cache, config.cache_sweep_interval);

    let limiter = Arc::new(RateLimiter::new(config.requests_per_second));
    let quote_service = Arc::new(QuoteService::new(
        provider,
        cache,
        limiter,
        QuoteServiceSettings {
            live_quote_ttl: config.quote_ttl,
            history_ttl: config.history_ttl,
        },
    ));

    let repository: Arc<dyn StockRepositoryTrait> = match &config.stocks_file {
        Some(path) => Arc::new(InMemoryStockRepository::from_file(path)?),
        None => {
            tracing::warn!("QD_STOCKS_FILE not set, starting with an empty stock list");
            Arc::new(InMemoryStockRepository::new())
        }
    };

    let stock_service = Arc::new(StockService::new(
        repository,
        quote_service,
        config.fallback.clone(),
    ));

    Ok(Arc::new(AppState {
        stock_service,
        provider_id,
        admin_token: config.admin_token.clone(),
    }))
}

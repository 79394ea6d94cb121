use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use quotedesk_core::FallbackPolicy;
use quotedesk_market_data::ProviderKind;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_API_KEY: &str = "demo";

/// Server configuration, read from `QD_*` environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub provider: ProviderKind,
    pub api_key: String,
    pub provider_base_url: Option<String>,
    pub requests_per_second: f64,
    pub quote_ttl: Duration,
    pub history_ttl: Duration,
    pub cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
    pub stocks_file: Option<PathBuf>,
    pub admin_token: Option<String>,
    /// Empty means no cross-origin access; `*` allows any origin.
    pub cors_allow_origins: Vec<String>,
    pub request_timeout: Duration,
    pub fallback: FallbackPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            provider: ProviderKind::AlphaVantage,
            api_key: DEFAULT_API_KEY.to_string(),
            provider_base_url: None,
            requests_per_second: 1.0,
            quote_ttl: Duration::from_secs(60),
            history_ttl: Duration::from_secs(3600),
            cache_ttl: Duration::from_secs(60),
            cache_sweep_interval: Duration::from_secs(300),
            stocks_file: None,
            admin_token: None,
            cors_allow_origins: Vec::new(),
            request_timeout: Duration::from_secs(60),
            fallback: FallbackPolicy::default(),
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let listen_addr = get("QD_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr
            .parse()
            .with_context(|| format!("QD_LISTEN_ADDR: invalid socket address '{}'", listen_addr))?;

        let provider = match get("QD_PROVIDER") {
            Some(raw) => raw
                .parse::<ProviderKind>()
                .map_err(|e| anyhow!("QD_PROVIDER: {}", e))?,
            None => defaults.provider,
        };

        let fallback = FallbackPolicy {
            current_fields: parse_list(get("QD_FALLBACK_CURRENT_FIELDS"))
                .unwrap_or(defaults.fallback.current_fields),
            baseline_fields: parse_list(get("QD_FALLBACK_BASELINE_FIELDS"))
                .unwrap_or(defaults.fallback.baseline_fields),
            previous_fields: parse_list(get("QD_FALLBACK_PREVIOUS_FIELDS"))
                .unwrap_or(defaults.fallback.previous_fields),
        };

        Ok(Self {
            listen_addr,
            provider,
            api_key: get("QD_API_KEY").unwrap_or(defaults.api_key),
            provider_base_url: get("QD_PROVIDER_BASE_URL"),
            requests_per_second: rate_or(
                "QD_REQUESTS_PER_SECOND",
                get("QD_REQUESTS_PER_SECOND"),
                defaults.requests_per_second,
            )?,
            quote_ttl: secs_or("QD_QUOTE_TTL_SECS", get("QD_QUOTE_TTL_SECS"), defaults.quote_ttl)?,
            history_ttl: secs_or(
                "QD_HISTORY_TTL_SECS",
                get("QD_HISTORY_TTL_SECS"),
                defaults.history_ttl,
            )?,
            cache_ttl: secs_or("QD_CACHE_TTL_SECS", get("QD_CACHE_TTL_SECS"), defaults.cache_ttl)?,
            cache_sweep_interval: secs_or(
                "QD_CACHE_SWEEP_SECS",
                get("QD_CACHE_SWEEP_SECS"),
                defaults.cache_sweep_interval,
            )?,
            stocks_file: get("QD_STOCKS_FILE").map(PathBuf::from),
            admin_token: get("QD_ADMIN_TOKEN"),
            cors_allow_origins: parse_list(get("QD_CORS_ALLOW_ORIGINS")).unwrap_or_default(),
            request_timeout: match get("QD_REQUEST_TIMEOUT_MS") {
                Some(raw) => Duration::from_millis(parse_value("QD_REQUEST_TIMEOUT_MS", &raw)?),
                None => defaults.request_timeout,
            },
            fallback,
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| anyhow!("{}: invalid value '{}': {}", key, raw, e))
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn secs_or(key: &str, raw: Option<String>, default: Duration) -> anyhow::Result<Duration> {
    match raw {
        Some(raw) => {
            let secs: u64 = parse_value(key, &raw)?;
            if secs == 0 {
                return Err(anyhow!("{}: must be at least 1 second", key));
            }
            Ok(Duration::from_secs(secs))
        }
        None => Ok(default),
    }
}

/// Requests per second whose spacing fits a `Duration`.
fn rate_or(key: &str, raw: Option<String>, default: f64) -> anyhow::Result<f64> {
    let rate: f64 = parse_or(key, raw, default)?;
    if !rate.is_finite() || rate <= 0.0 || Duration::try_from_secs_f64(1.0 / rate).is_err() {
        return Err(anyhow!("{}: must be a positive rate, got {}", key, rate));
    }
    Ok(rate)
}

/// Comma-separated list; `None` when nothing but separators was given.
fn parse_list(raw: Option<String>) -> Option<Vec<String>> {
    let items: Vec<String> = raw?
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}

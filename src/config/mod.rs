//! Configuration module for candleforge.
//!
//! Structured configuration loading from environment variables: which
//! market data backend to use, where the database and tensor cache live,
//! and the dataset parameters. Everything resolves to typed values once at
//! startup; nothing re-reads the environment at call sites.

use crate::application::ml::dataset_builder::TargetKind;
use crate::domain::dataset::normalize::NormalizationStrategy;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which remote source candles are downloaded from. CCCAGG is the
/// CryptoCompare aggregate index; additional backends register here if
/// implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketDataBackend {
    CryptoCompare,
}

impl FromStr for MarketDataBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cccagg" | "cryptocompare" => Ok(MarketDataBackend::CryptoCompare),
            _ => anyhow::bail!(
                "Unknown market data backend: {}. Must be 'cccagg'",
                s
            ),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: MarketDataBackend,
    pub database_url: String,
    pub cache_root: String,

    // Market data source
    pub cryptocompare_base_url: String,
    pub cryptocompare_api_key: Option<String>,
    pub exchange: String,
    /// Per-request retry cap at the gateway; `None` retries until success.
    pub fetch_retry_limit: Option<u32>,
    pub fetch_retry_delay: Duration,
    /// Where history starts for a pair never seen before.
    pub genesis_ts: i64,

    // Dataset shape
    pub past_length: usize,
    pub future_length: usize,
    pub normalization: NormalizationStrategy,
    pub target: TargetKind,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let backend_str = env::var("MARKET_DATA_BACKEND").unwrap_or_else(|_| "cccagg".to_string());
        let backend = MarketDataBackend::from_str(&backend_str)?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/candleforge.db".to_string());
        let cache_root = env::var("CACHE_ROOT").unwrap_or_else(|_| "cache".to_string());

        let cryptocompare_base_url = env::var("CRYPTOCOMPARE_BASE_URL")
            .unwrap_or_else(|_| "https://min-api.cryptocompare.com".to_string());
        let cryptocompare_api_key = env::var("CRYPTOCOMPARE_API_KEY").ok();
        let exchange = env::var("EXCHANGE").unwrap_or_else(|_| "CCCAGG".to_string());

        let fetch_retry_limit = parse_retry_limit(
            &env::var("FETCH_RETRY_LIMIT").unwrap_or_else(|_| "5".to_string()),
        )?;
        let fetch_retry_delay = Duration::from_millis(
            parse_env("FETCH_RETRY_DELAY_MS", 1000u64).context("Invalid FETCH_RETRY_DELAY_MS")?,
        );

        // 2017-02-01T00:00:00Z, where hourly aggregate coverage begins
        let genesis_ts = parse_env("GENESIS_TS", 1_485_907_200i64).context("Invalid GENESIS_TS")?;

        let past_length = parse_env("PAST_LENGTH", 72usize).context("Invalid PAST_LENGTH")?;
        let future_length = parse_env("FUTURE_LENGTH", 12usize).context("Invalid FUTURE_LENGTH")?;

        let normalization = NormalizationStrategy::from_str(
            &env::var("NORMALIZATION").unwrap_or_else(|_| "zscore".to_string()),
        )?;
        let target =
            TargetKind::from_str(&env::var("TARGET").unwrap_or_else(|_| "path".to_string()))?;

        Ok(Self {
            backend,
            database_url,
            cache_root,
            cryptocompare_base_url,
            cryptocompare_api_key,
            exchange,
            fetch_retry_limit,
            fetch_retry_delay,
            genesis_ts,
            past_length,
            future_length,
            normalization,
            target,
        })
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Failed to parse {}={}", key, raw)),
        Err(_) => Ok(default),
    }
}

/// A negative retry limit means "retry until it works".
fn parse_retry_limit(raw: &str) -> Result<Option<u32>> {
    let value: i64 = raw
        .parse()
        .with_context(|| format!("Failed to parse FETCH_RETRY_LIMIT={}", raw))?;
    if value < 0 {
        Ok(None)
    } else {
        Ok(Some(value as u32))
    }
}

//! Collection binary: download candles and backfill indicators.
//!
//! Brings every requested pair up to date against the configured market
//! data backend, then merges the derived indicator columns onto rows that
//! are still missing them.
//!
//! # Usage
//! ```sh
//! cargo run --bin collect -- --pairs "BTC/USDT,ETH/USDT"
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use candleforge::application::collector::Collector;
use candleforge::config::{Config, MarketDataBackend};
use candleforge::domain::ports::MarketDataGateway;
use candleforge::infrastructure::cryptocompare::CryptoCompareGateway;
use candleforge::infrastructure::persistence::{Database, SqliteCandleRepository};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pair(s) to collect, BASE/COUNTER (comma separated)
    #[arg(short, long, default_value = "BTC/USDT,ETH/USDT,ETH/BTC")]
    pairs: String,

    /// Verify the stored series has no hourly gaps after collecting
    #[arg(long)]
    check_integrity: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let database = Database::new(&config.database_url).await?;
    let repository = Arc::new(SqliteCandleRepository::new(database.pool.clone()));

    let gateway: Arc<dyn MarketDataGateway> = match config.backend {
        MarketDataBackend::CryptoCompare => Arc::new(
            CryptoCompareGateway::builder()
                .base_url(config.cryptocompare_base_url.clone())
                .api_key(config.cryptocompare_api_key.clone())
                .exchange(config.exchange.clone())
                .retry_limit(config.fetch_retry_limit)
                .retry_delay(config.fetch_retry_delay)
                .build(),
        ),
    };

    let collector = Collector::new(gateway, repository, config.genesis_ts);

    for pair in cli.pairs.split(',') {
        let pair = pair.trim();
        let Some((base, counter)) = pair.split_once('/') else {
            warn!("Skipping malformed pair '{}', expected BASE/COUNTER", pair);
            continue;
        };

        match collector.collect(base, counter).await {
            Ok(inserted) => info!("{}: {} new candles", pair, inserted),
            Err(e) => {
                warn!("{}: collection failed: {:#}", pair, e);
                continue;
            }
        }

        if cli.check_integrity {
            if collector.check_integrity(base, counter).await? {
                info!("{}: stored series is gapless", pair);
            } else {
                warn!("{}: stored series has gaps, re-run collection", pair);
            }
        }
    }

    Ok(())
}

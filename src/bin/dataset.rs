//! Dataset binary: reshape a stored series into cached training tensors.
//!
//! Reads the indicator-complete series for one pair, cuts it into
//! train/valid/test splits at the given day boundaries, and writes each
//! split's (X, Y) tensors under the cache root.
//!
//! # Usage
//! ```sh
//! cargo run --bin dataset -- --pair BTC/USDT --train-end 2018-06-01 --valid-end 2018-06-10
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::Parser;
use tracing::info;

use candleforge::application::ml::{DatasetBuilder, DatasetService, SplitBoundaries, TensorCache};
use candleforge::config::Config;
use candleforge::infrastructure::persistence::{Database, SqliteCandleRepository};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pair to build tensors for, BASE/COUNTER
    #[arg(short, long, default_value = "BTC/USDT")]
    pair: String,

    /// Last day of the training split (YYYY-MM-DD, inclusive)
    #[arg(long, default_value = "2018-06-01")]
    train_end: String,

    /// Last day of the validation split (YYYY-MM-DD, inclusive)
    #[arg(long, default_value = "2018-06-10")]
    valid_end: String,
}

/// Timestamp of the last second of the given day.
fn day_end_ts(raw: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw))?;
    Ok(Utc
        .from_utc_datetime(&date.and_hms_opt(23, 59, 59).unwrap())
        .timestamp())
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

    let (base, counter) = cli
        .pair
        .split_once('/')
        .with_context(|| format!("Invalid pair '{}', expected BASE/COUNTER", cli.pair))?;

    let boundaries = SplitBoundaries {
        train_end: day_end_ts(&cli.train_end)?,
        valid_end: day_end_ts(&cli.valid_end)?,
    };

    let database = Database::new(&config.database_url).await?;
    let repository = Arc::new(SqliteCandleRepository::new(database.pool.clone()));

    let builder = DatasetBuilder::new(
        config.past_length,
        config.future_length,
        config.normalization,
        config.target,
    );
    let cache_dir = PathBuf::from(&config.cache_root)
        .join(format!("{}_{}", base.to_uppercase(), counter.to_uppercase()));
    let cache = TensorCache::new(cache_dir);

    let service = DatasetService::new(repository, builder, cache);

    info!(
        "Building {} tensors ({} past, {} future, {:?} normalization)",
        cli.pair, config.past_length, config.future_length, config.normalization
    );
    let counts = service.prepare_splits(base, counter, &boundaries).await?;
    for (split, examples) in counts {
        info!("{}: {} examples cached", split, examples);
    }

    Ok(())
}

//! End-to-end pipeline tests: stub gateway -> SQLite store -> indicator
//! backfill -> windowed tensors on disk.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use candleforge::application::collector::Collector;
use candleforge::application::ml::{DatasetBuilder, DatasetService, SplitBoundaries, TargetKind, TensorCache};
use candleforge::domain::candlestick::{Candlestick, FEATURE_COUNT};
use candleforge::domain::dataset::NormalizationStrategy;
use candleforge::domain::ports::MarketDataGateway;
use candleforge::domain::repositories::CandleRepository;
use candleforge::infrastructure::persistence::{Database, SqliteCandleRepository};

const GENESIS: i64 = 1_485_907_200;
const HOUR: i64 = 3600;

/// Gateway serving a fixed in-memory series, honoring the start bound the
/// way the remote API would.
struct StubGateway {
    candles: Vec<Candlestick>,
}

#[async_trait]
impl MarketDataGateway for StubGateway {
    async fn fetch_candles(
        &self,
        _base: &str,
        _counter: &str,
        start_ts: i64,
        _end_ts: Option<i64>,
    ) -> Result<Vec<Candlestick>> {
        Ok(self
            .candles
            .iter()
            .filter(|c| c.timestamp >= start_ts)
            .cloned()
            .collect())
    }
}

fn synthetic_candles(count: usize, seed: u64) -> Vec<Candlestick> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let close = 4000.0 + i as f64 * 0.5 + rng.random_range(-40.0..40.0);
            Candlestick::raw(
                "btc",
                "usdt",
                GENESIS + i as i64 * HOUR,
                close - 1.0,
                close + 3.0,
                close - 3.0,
                close,
                rng.random_range(10.0..500.0),
            )
        })
        .collect()
}

async fn open_database(dir: &Path) -> Database {
    Database::new(&format!("sqlite://{}/candles.db", dir.display()))
        .await
        .expect("database should open in temp dir")
}

#[tokio::test]
async fn collect_persists_and_backfills_indicators() {
    let dir = tempfile::tempdir().unwrap();
    let database = open_database(dir.path()).await;
    let repository: Arc<dyn CandleRepository> =
        Arc::new(SqliteCandleRepository::new(database.pool.clone()));

    let gateway = Arc::new(StubGateway {
        candles: synthetic_candles(200, 7),
    });
    let collector = Collector::new(gateway, repository.clone(), GENESIS);

    let inserted = collector.collect("btc", "usdt").await.unwrap();
    assert_eq!(inserted, 200);

    let series = repository.get_series("btc", "usdt", None, None).await.unwrap();
    assert_eq!(series.len(), 200);
    assert!(series.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    // every stored row got its derived columns in the same pass
    assert!(series.iter().all(|c| c.ma1.is_some()
        && c.ma2.is_some()
        && c.ma3.is_some()
        && c.macd_diff.is_some()));

    // a second run resumes from the latest stored hour and inserts nothing
    let inserted = collector.collect("btc", "usdt").await.unwrap();
    assert_eq!(inserted, 0);
}

#[tokio::test]
async fn upsert_is_idempotent_and_skips_empty_candles() {
    let dir = tempfile::tempdir().unwrap();
    let database = open_database(dir.path()).await;
    let repository = SqliteCandleRepository::new(database.pool.clone());

    let mut candles = synthetic_candles(50, 11);
    // an all-zero placeholder hour must never enter the store
    candles.push(Candlestick::raw(
        "btc",
        "usdt",
        GENESIS + 50 * HOUR,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
    ));

    let inserted = repository.upsert_candles(&candles).await.unwrap();
    assert_eq!(inserted, 50);

    let inserted = repository.upsert_candles(&candles).await.unwrap();
    assert_eq!(inserted, 0);

    let series = repository.get_series("btc", "usdt", None, None).await.unwrap();
    assert_eq!(series.len(), 50);
}

#[tokio::test]
async fn refetch_updates_prices_and_keeps_indicators() {
    let dir = tempfile::tempdir().unwrap();
    let database = open_database(dir.path()).await;
    let repository: Arc<dyn CandleRepository> =
        Arc::new(SqliteCandleRepository::new(database.pool.clone()));

    let candles = synthetic_candles(60, 3);
    repository.upsert_candles(&candles).await.unwrap();

    let gateway = Arc::new(StubGateway { candles: Vec::new() });
    let collector = Collector::new(gateway, repository.clone(), GENESIS);
    collector.backfill_indicators("btc", "usdt").await.unwrap();

    // re-fetch the same hours with revised prices
    let mut revised = candles.clone();
    for candle in &mut revised {
        candle.close += 10.0;
    }
    let inserted = repository.upsert_candles(&revised).await.unwrap();
    assert_eq!(inserted, 0);

    let series = repository.get_series("btc", "usdt", None, None).await.unwrap();
    assert_eq!(series.len(), 60);
    assert!((series[0].close - (candles[0].close + 10.0)).abs() < 1e-9);
    // indicator columns survive the in-place price refresh
    assert!(series.iter().all(|c| c.ma1.is_some()));
}

#[tokio::test]
async fn backfill_only_touches_rows_missing_indicators() {
    let dir = tempfile::tempdir().unwrap();
    let database = open_database(dir.path()).await;
    let repository: Arc<dyn CandleRepository> =
        Arc::new(SqliteCandleRepository::new(database.pool.clone()));

    let candles = synthetic_candles(80, 5);
    repository.upsert_candles(&candles[..40]).await.unwrap();

    let gateway = Arc::new(StubGateway { candles: Vec::new() });
    let collector = Collector::new(gateway, repository.clone(), GENESIS);
    let updated = collector.backfill_indicators("btc", "usdt").await.unwrap();
    assert_eq!(updated, 40);

    // extend the series; the second pass fills only the new tail
    repository.upsert_candles(&candles[40..]).await.unwrap();
    let updated = collector.backfill_indicators("btc", "usdt").await.unwrap();
    assert_eq!(updated, 40);

    let updated = collector.backfill_indicators("btc", "usdt").await.unwrap();
    assert_eq!(updated, 0);
}

#[tokio::test]
async fn integrity_check_flags_hourly_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let database = open_database(dir.path()).await;
    let repository: Arc<dyn CandleRepository> =
        Arc::new(SqliteCandleRepository::new(database.pool.clone()));

    let mut candles = synthetic_candles(30, 13);
    let gateway = Arc::new(StubGateway { candles: Vec::new() });
    let collector = Collector::new(gateway, repository.clone(), GENESIS);

    repository.upsert_candles(&candles).await.unwrap();
    assert!(collector.check_integrity("btc", "usdt").await.unwrap());

    // drop one hour in the middle and re-store under another pair
    candles.remove(15);
    for candle in &mut candles {
        candle.counter = "BTC".to_string();
    }
    repository.upsert_candles(&candles).await.unwrap();
    assert!(!collector.check_integrity("btc", "btc").await.unwrap());
}

#[tokio::test]
async fn latest_timestamp_tracks_the_newest_row() {
    let dir = tempfile::tempdir().unwrap();
    let database = open_database(dir.path()).await;
    let repository = SqliteCandleRepository::new(database.pool.clone());

    assert_eq!(repository.latest_timestamp("btc", "usdt").await.unwrap(), None);

    let candles = synthetic_candles(25, 17);
    repository.upsert_candles(&candles).await.unwrap();
    assert_eq!(
        repository.latest_timestamp("btc", "usdt").await.unwrap(),
        Some(GENESIS + 24 * HOUR)
    );
}

#[tokio::test]
async fn prepare_splits_caches_tensor_files_per_split() {
    let dir = tempfile::tempdir().unwrap();
    let database = open_database(dir.path()).await;
    let repository: Arc<dyn CandleRepository> =
        Arc::new(SqliteCandleRepository::new(database.pool.clone()));

    let gateway = Arc::new(StubGateway {
        candles: synthetic_candles(400, 23),
    });
    let collector = Collector::new(gateway, repository.clone(), GENESIS);
    collector.collect("btc", "usdt").await.unwrap();

    let past_length = 24;
    let future_length = 6;
    let builder = DatasetBuilder::new(
        past_length,
        future_length,
        NormalizationStrategy::ZScorePair,
        TargetKind::PriceRange,
    );
    let cache_dir = dir.path().join("cache");
    let service = DatasetService::new(
        repository.clone(),
        builder,
        TensorCache::new(&cache_dir),
    );

    // 200 hours of train, 100 of valid, the remaining 100 of test
    let boundaries = SplitBoundaries {
        train_end: GENESIS + 199 * HOUR,
        valid_end: GENESIS + 299 * HOUR,
    };
    let counts = service.prepare_splits("btc", "usdt", &boundaries).await.unwrap();

    let window = past_length + future_length;
    assert_eq!(counts[0], ("train".to_string(), 200 - window + 1));
    assert_eq!(counts[1], ("valid".to_string(), 100 - window + 1));
    assert_eq!(counts[2], ("test".to_string(), 100 - window + 1));

    for split in ["train", "valid", "test"] {
        assert!(cache_dir.join(format!("x_{}.csv", split)).exists());
        assert!(cache_dir.join(format!("y_{}.csv", split)).exists());
        assert!(cache_dir.join(format!("{}_meta.json", split)).exists());
    }

    let x_train = std::fs::read_to_string(cache_dir.join("x_train.csv")).unwrap();
    let first_row = x_train.lines().next().unwrap();
    // one flattened (past_length x feature) window per line
    assert_eq!(first_row.split(',').count(), past_length * FEATURE_COUNT);
}

#[tokio::test]
async fn prepare_splits_refuses_a_split_too_short_for_one_window() {
    let dir = tempfile::tempdir().unwrap();
    let database = open_database(dir.path()).await;
    let repository: Arc<dyn CandleRepository> =
        Arc::new(SqliteCandleRepository::new(database.pool.clone()));

    let gateway = Arc::new(StubGateway {
        candles: synthetic_candles(100, 29),
    });
    let collector = Collector::new(gateway, repository.clone(), GENESIS);
    collector.collect("btc", "usdt").await.unwrap();

    let builder = DatasetBuilder::new(
        24,
        6,
        NormalizationStrategy::MinMaxHistory,
        TargetKind::FuturePath,
    );
    let service = DatasetService::new(
        repository.clone(),
        builder,
        TensorCache::new(dir.path().join("cache")),
    );

    // valid split covers only 10 hours, far below one 30-row window
    let boundaries = SplitBoundaries {
        train_end: GENESIS + 79 * HOUR,
        valid_end: GENESIS + 89 * HOUR,
    };
    let err = service
        .prepare_splits("btc", "usdt", &boundaries)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("valid"));
}

//! Repository Pattern Abstractions
//!
//! The candle repository is the single persistence seam of the pipeline:
//! whole-series reads, whole-batch writes, nothing row-at-a-time. The
//! SQLite implementation lives in `infrastructure::persistence`; tests use
//! the same trait against an in-memory database.

use crate::domain::candlestick::{Candlestick, IndicatorUpdate};
use anyhow::Result;
use async_trait::async_trait;

/// Repository for persisting and retrieving candlestick series
#[async_trait]
pub trait CandleRepository: Send + Sync {
    /// Retrieve the ordered (ascending timestamp) series for a pair,
    /// optionally bounded on either side.
    async fn get_series(
        &self,
        base: &str,
        counter: &str,
        start_ts: Option<i64>,
        end_ts: Option<i64>,
    ) -> Result<Vec<Candlestick>>;

    /// Insert-or-update a batch of candles, idempotent on
    /// (base, counter, timestamp). Empty candles are skipped. Returns the
    /// number of rows newly inserted; a repeated call with identical data
    /// returns 0.
    async fn upsert_candles(&self, candles: &[Candlestick]) -> Result<usize>;

    /// Merge computed indicator values onto existing rows by id, as one
    /// transactional batch.
    async fn update_indicator_fields(&self, updates: &[IndicatorUpdate]) -> Result<()>;

    /// Timestamp of the most recent stored candle for a pair, if any.
    async fn latest_timestamp(&self, base: &str, counter: &str) -> Result<Option<i64>>;
}

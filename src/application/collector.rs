//! Ingestion and indicator-backfill orchestration.
//!
//! The collector resumes each pair from its latest stored timestamp,
//! persists whatever the gateway returns, then recomputes the derived
//! indicator columns over the full series and merges them back in one
//! batch. Indicator values are only written where they are still missing,
//! so an interrupted pass resumes by re-scanning.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::domain::candlestick::IndicatorUpdate;
use crate::domain::indicators::{macd, sma};
use crate::domain::ports::MarketDataGateway;
use crate::domain::repositories::CandleRepository;

const MA1_PERIOD: usize = 6;
const MA2_PERIOD: usize = 12;
const MA3_PERIOD: usize = 24;

const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;

/// Expected spacing between consecutive candles.
const HOUR_SECS: i64 = 3600;

pub struct Collector {
    gateway: Arc<dyn MarketDataGateway>,
    repository: Arc<dyn CandleRepository>,
    genesis_ts: i64,
}

impl Collector {
    pub fn new(
        gateway: Arc<dyn MarketDataGateway>,
        repository: Arc<dyn CandleRepository>,
        genesis_ts: i64,
    ) -> Self {
        Self {
            gateway,
            repository,
            genesis_ts,
        }
    }

    /// Bring one pair up to date: fetch from the latest stored timestamp
    /// (or the configured genesis for a fresh pair), upsert, and backfill
    /// indicators. Returns the number of newly inserted candles.
    pub async fn collect(&self, base: &str, counter: &str) -> Result<usize> {
        let start_ts = self
            .repository
            .latest_timestamp(base, counter)
            .await?
            .unwrap_or(self.genesis_ts);

        info!(
            "Collecting {}/{} candles starting at timestamp {}",
            base, counter, start_ts
        );

        let candles = self
            .gateway
            .fetch_candles(base, counter, start_ts, None)
            .await
            .context("Failed to fetch candles from market data gateway")?;

        if candles.is_empty() {
            info!("{}/{} is already caught up", base, counter);
            return Ok(0);
        }

        let inserted = self
            .repository
            .upsert_candles(&candles)
            .await
            .context("Failed to persist fetched candles")?;
        info!(
            "Persisted {} new candles for {}/{} ({} fetched)",
            inserted,
            base,
            counter,
            candles.len()
        );

        let updated = self.backfill_indicators(base, counter).await?;
        debug!("Backfilled indicators on {} rows", updated);

        Ok(inserted)
    }

    /// Recompute the derived columns over the full stored series and merge
    /// them onto rows that do not have them yet. One series read, one
    /// transactional write. Returns the number of rows updated.
    pub async fn backfill_indicators(&self, base: &str, counter: &str) -> Result<usize> {
        let series = self.repository.get_series(base, counter, None, None).await?;
        if series.is_empty() {
            return Ok(0);
        }

        let closes: Vec<f64> = series.iter().map(|c| c.close).collect();
        let ma1 = sma(&closes, MA1_PERIOD);
        let ma2 = sma(&closes, MA2_PERIOD);
        let ma3 = sma(&closes, MA3_PERIOD);
        let (proper, signal_line, diff) = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);

        let mut updates = Vec::new();
        for (i, candle) in series.iter().enumerate() {
            if candle.ma1.is_some() {
                continue;
            }
            let Some(id) = candle.id else {
                warn!(
                    "Unpersisted candle in stored series at timestamp {}, skipping",
                    candle.timestamp
                );
                continue;
            };
            updates.push(IndicatorUpdate {
                id,
                ma1: ma1[i],
                ma2: ma2[i],
                ma3: ma3[i],
                macd_proper: proper[i],
                macd_signal: signal_line[i],
                macd_diff: diff[i],
            });
        }

        if updates.is_empty() {
            return Ok(0);
        }

        self.repository
            .update_indicator_fields(&updates)
            .await
            .context("Failed to write indicator columns back")?;
        Ok(updates.len())
    }

    /// Verify the stored series has no gaps: every consecutive candle pair
    /// must be exactly one hour apart.
    pub async fn check_integrity(&self, base: &str, counter: &str) -> Result<bool> {
        let series = self.repository.get_series(base, counter, None, None).await?;
        for window in series.windows(2) {
            let delta = window[1].timestamp - window[0].timestamp;
            if delta != HOUR_SECS {
                warn!(
                    "Gap of {}s between {} and {} in {}/{}",
                    delta, window[0].timestamp, window[1].timestamp, base, counter
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}

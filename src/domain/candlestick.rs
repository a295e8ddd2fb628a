use serde::{Deserialize, Serialize};

use crate::domain::errors::DatasetError;

/// Canonical feature column order shared by the feature matrix,
/// normalization, and target synthesis. Close sits at index 3; targets and
/// the pooled z-score statistics depend on that position.
pub const FEATURE_COUNT: usize = 11;

pub const COL_OPEN: usize = 0;
pub const COL_HIGH: usize = 1;
pub const COL_LOW: usize = 2;
pub const COL_CLOSE: usize = 3;
pub const COL_VOLUME: usize = 4;
pub const COL_MA1: usize = 5;
pub const COL_MA2: usize = 6;
pub const COL_MA3: usize = 7;
pub const COL_MACD_PROPER: usize = 8;
pub const COL_MACD_SIGNAL: usize = 9;
pub const COL_MACD_DIFF: usize = 10;

/// One hourly OHLCV observation for an ordered (base, counter) pair.
///
/// The indicator fields stay `None` until the backfill pass has seen the
/// full series for the pair; `id` stays `None` until the row is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candlestick {
    pub id: Option<i64>,
    pub base: String,
    pub counter: String,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub ma1: Option<f64>,
    pub ma2: Option<f64>,
    pub ma3: Option<f64>,
    pub macd_proper: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_diff: Option<f64>,
}

impl Candlestick {
    /// A raw candle as it arrives from the market data gateway, before
    /// persistence and indicator backfill.
    pub fn raw(
        base: &str,
        counter: &str,
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            id: None,
            base: base.to_uppercase(),
            counter: counter.to_uppercase(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            ma1: None,
            ma2: None,
            ma3: None,
            macd_proper: None,
            macd_signal: None,
            macd_diff: None,
        }
    }

    /// All-zero candles are API placeholders for hours with no trades on
    /// record; they are excluded from persistence and integrity checks.
    pub fn is_empty(&self) -> bool {
        self.open == 0.0
            && self.high == 0.0
            && self.low == 0.0
            && self.close == 0.0
            && self.volume == 0.0
    }

    /// Flatten into one feature-matrix row in the canonical column order.
    ///
    /// Fails if the indicator backfill has not reached this row yet.
    pub fn feature_row(&self) -> Result<[f64; FEATURE_COUNT], DatasetError> {
        let missing = || DatasetError::MissingIndicators {
            timestamp: self.timestamp,
        };
        Ok([
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.ma1.ok_or_else(missing)?,
            self.ma2.ok_or_else(missing)?,
            self.ma3.ok_or_else(missing)?,
            self.macd_proper.ok_or_else(missing)?,
            self.macd_signal.ok_or_else(missing)?,
            self.macd_diff.ok_or_else(missing)?,
        ])
    }
}

/// Indicator values to merge back onto a persisted candlestick row.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorUpdate {
    pub id: i64,
    pub ma1: f64,
    pub ma2: f64,
    pub ma3: f64,
    pub macd_proper: f64,
    pub macd_signal: f64,
    pub macd_diff: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_candle_uppercases_pair_symbols() {
        let c = Candlestick::raw("btc", "usdt", 1_500_000_000, 1.0, 2.0, 0.5, 1.5, 10.0);
        assert_eq!(c.base, "BTC");
        assert_eq!(c.counter, "USDT");
        assert!(c.id.is_none());
        assert!(c.ma1.is_none());
    }

    #[test]
    fn all_zero_candle_is_empty() {
        let c = Candlestick::raw("btc", "usdt", 0, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(c.is_empty());
    }

    #[test]
    fn candle_with_any_nonzero_field_is_not_empty() {
        let c = Candlestick::raw("btc", "usdt", 0, 0.0, 0.0, 0.0, 0.0, 3.0);
        assert!(!c.is_empty());
    }

    #[test]
    fn feature_row_requires_backfilled_indicators() {
        let c = Candlestick::raw("btc", "usdt", 1_500_000_000, 1.0, 2.0, 0.5, 1.5, 10.0);
        assert!(matches!(
            c.feature_row(),
            Err(DatasetError::MissingIndicators { timestamp: 1_500_000_000 })
        ));
    }

    #[test]
    fn feature_row_follows_canonical_order() {
        let mut c = Candlestick::raw("btc", "usdt", 0, 1.0, 2.0, 0.5, 1.5, 10.0);
        c.ma1 = Some(1.1);
        c.ma2 = Some(1.2);
        c.ma3 = Some(1.3);
        c.macd_proper = Some(0.2);
        c.macd_signal = Some(0.1);
        c.macd_diff = Some(0.1);
        let row = c.feature_row().unwrap();
        assert_eq!(row[COL_CLOSE], 1.5);
        assert_eq!(row[COL_VOLUME], 10.0);
        assert_eq!(row[COL_MACD_DIFF], 0.1);
    }
}

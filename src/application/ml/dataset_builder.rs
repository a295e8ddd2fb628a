//! Assembly of windowed training tensors from indicator-complete series.

use std::str::FromStr;

use ndarray::{Array2, Array3};

use crate::domain::candlestick::{Candlestick, FEATURE_COUNT};
use crate::domain::dataset::normalize::{NormalizationStrategy, normalize};
use crate::domain::dataset::windowing::history_future_split;
use crate::domain::dataset::targets;
use crate::domain::errors::DatasetError;

/// Which supervised target the Y tensor carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// The whole normalized future slice, flattened (seq2seq labels).
    FuturePath,
    /// Closing price of the last future row.
    NextClose,
    /// (peak, valley) of the future closing prices.
    PriceRange,
    /// Signed last-close delta.
    Direction,
    /// Direction sign weighted by the future range magnitude.
    Momentum,
    /// Multi-head [peak, valley, direction, momentum].
    Combined,
}

impl TargetKind {
    /// Width of one Y row for this target.
    pub fn dim(&self, future_length: usize) -> usize {
        match self {
            TargetKind::FuturePath => future_length * FEATURE_COUNT,
            TargetKind::NextClose => 1,
            TargetKind::PriceRange => 2,
            TargetKind::Direction => 1,
            TargetKind::Momentum => 1,
            TargetKind::Combined => 4,
        }
    }
}

impl FromStr for TargetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "future-path" | "future_path" | "path" => Ok(TargetKind::FuturePath),
            "next-close" | "next_close" | "close" => Ok(TargetKind::NextClose),
            "price-range" | "price_range" | "range" => Ok(TargetKind::PriceRange),
            "direction" => Ok(TargetKind::Direction),
            "momentum" => Ok(TargetKind::Momentum),
            "combined" => Ok(TargetKind::Combined),
            _ => anyhow::bail!(
                "Invalid target kind: {}. Must be one of 'path', 'close', 'range', 'direction', 'momentum', 'combined'",
                s
            ),
        }
    }
}

/// One dataset split ready for caching or training.
#[derive(Debug)]
pub struct TrainingTensors {
    /// Shape (examples, past_length, FEATURE_COUNT).
    pub x: Array3<f64>,
    /// Shape (examples, target_dim).
    pub y: Array2<f64>,
}

pub struct DatasetBuilder {
    past_length: usize,
    future_length: usize,
    strategy: NormalizationStrategy,
    target: TargetKind,
}

impl DatasetBuilder {
    pub fn new(
        past_length: usize,
        future_length: usize,
        strategy: NormalizationStrategy,
        target: TargetKind,
    ) -> Self {
        Self {
            past_length,
            future_length,
            strategy,
            target,
        }
    }

    /// Flatten an indicator-complete series into the canonical feature
    /// matrix, one row per candle.
    pub fn feature_matrix(series: &[Candlestick]) -> Result<Array2<f64>, DatasetError> {
        let mut flat = Vec::with_capacity(series.len() * FEATURE_COUNT);
        for candle in series {
            flat.extend_from_slice(&candle.feature_row()?);
        }
        Ok(Array2::from_shape_vec((series.len(), FEATURE_COUNT), flat)
            .expect("feature buffer length is rows * FEATURE_COUNT"))
    }

    /// Windows, normalization, and target synthesis in one pass over a
    /// series. Fails with [`DatasetError::InsufficientData`] when the
    /// series cannot produce a single window pair.
    pub fn build(&self, series: &[Candlestick]) -> Result<TrainingTensors, DatasetError> {
        let matrix = Self::feature_matrix(series)?;
        let pairs = history_future_split(&matrix, self.past_length, self.future_length)?;

        let mut pasts = Vec::with_capacity(pairs.len());
        let mut futures = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            let normalized = normalize(pair, self.strategy);
            pasts.push(normalized.past);
            futures.push(normalized.future);
        }

        let x = stack_windows(&pasts, self.past_length);
        let y = match self.target {
            TargetKind::FuturePath => flatten_windows(&futures, self.future_length),
            TargetKind::NextClose => {
                let closes: Vec<f64> = futures.iter().map(targets::next_close).collect();
                Array2::from_shape_vec((closes.len(), 1), closes)
                    .expect("one close per window pair")
            }
            TargetKind::PriceRange => targets::price_range_batch(&futures),
            TargetKind::Direction => targets::direction_batch(&pasts, &futures),
            TargetKind::Momentum => targets::momentum_batch(&pasts, &futures),
            TargetKind::Combined => targets::combined_batch(&pasts, &futures),
        };

        Ok(TrainingTensors { x, y })
    }
}

fn stack_windows(windows: &[Array2<f64>], rows: usize) -> Array3<f64> {
    let mut flat = Vec::with_capacity(windows.len() * rows * FEATURE_COUNT);
    for window in windows {
        flat.extend(window.iter().copied());
    }
    Array3::from_shape_vec((windows.len(), rows, FEATURE_COUNT), flat)
        .expect("window buffer length is windows * rows * FEATURE_COUNT")
}

fn flatten_windows(windows: &[Array2<f64>], rows: usize) -> Array2<f64> {
    let mut flat = Vec::with_capacity(windows.len() * rows * FEATURE_COUNT);
    for window in windows {
        flat.extend(window.iter().copied());
    }
    Array2::from_shape_vec((windows.len(), rows * FEATURE_COUNT), flat)
        .expect("window buffer length is windows * rows * FEATURE_COUNT")
}

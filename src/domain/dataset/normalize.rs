//! Window-pair normalization strategies.
//!
//! Two policies coexist behind one interface, selected by the caller:
//! pooled z-score standardization (statistics drawn from past and future
//! combined) and min-max scaling with bounds taken from the past slice
//! only. Both return the parameters needed for denormalization.

use std::str::FromStr;

use ndarray::{Array1, Array2, Axis};
use statrs::statistics::Statistics;

use super::windowing::WindowPair;
use crate::domain::candlestick::{
    COL_CLOSE, COL_HIGH, COL_LOW, COL_MA1, COL_MA2, COL_MA3, COL_MACD_DIFF, COL_MACD_PROPER,
    COL_MACD_SIGNAL, COL_OPEN, COL_VOLUME,
};

const Z_SCORE_EPS: f64 = 1e-6;
const MIN_MAX_EPS: f64 = 1e-8;

/// Columns standardized with the pooled close statistics.
const PRICE_COLS: [usize; 7] = [
    COL_OPEN, COL_HIGH, COL_LOW, COL_CLOSE, COL_MA1, COL_MA2, COL_MA3,
];

/// Caller-selected normalization policy. The two variants come from
/// different snapshots of the upstream pipeline and are deliberately kept
/// side by side rather than reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationStrategy {
    /// Standardize with mean/std pooled across past and future.
    ZScorePair,
    /// Scale into [0, 1] with bounds from the past slice only; future
    /// values may fall outside the unit interval.
    MinMaxHistory,
}

impl FromStr for NormalizationStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zscore" | "z-score" | "zscore-pair" => Ok(NormalizationStrategy::ZScorePair),
            "minmax" | "min-max" | "minmax-history" => Ok(NormalizationStrategy::MinMaxHistory),
            _ => anyhow::bail!(
                "Invalid normalization strategy: {}. Must be 'zscore' or 'minmax'",
                s
            ),
        }
    }
}

/// Pooled statistics behind the z-score policy. Price-like columns share
/// the close statistics, volume has its own, and both MACD lines share the
/// proper line's statistics.
#[derive(Debug, Clone, Copy)]
pub struct ZScoreParams {
    pub price_mean: f64,
    pub price_std: f64,
    pub volume_mean: f64,
    pub volume_std: f64,
    pub macd_mean: f64,
    pub macd_std: f64,
}

/// Per-feature bounds of the past slice, kept for denormalization.
#[derive(Debug, Clone)]
pub struct MinMaxBounds {
    pub upper: Array1<f64>,
    pub lower: Array1<f64>,
}

#[derive(Debug, Clone)]
pub enum NormParams {
    ZScore(ZScoreParams),
    MinMax(MinMaxBounds),
}

/// A window pair after normalization, with the parameters that produced it.
#[derive(Debug, Clone)]
pub struct NormalizedPair {
    pub past: Array2<f64>,
    pub future: Array2<f64>,
    pub params: NormParams,
}

/// Normalize one window pair under the given strategy.
///
/// A constant feature over the relevant slice leaves the epsilon term as
/// the only denominator, producing noise-dominated output; that is
/// accepted behavior, not an error.
pub fn normalize(pair: &WindowPair, strategy: NormalizationStrategy) -> NormalizedPair {
    match strategy {
        NormalizationStrategy::ZScorePair => zscore_pair(pair),
        NormalizationStrategy::MinMaxHistory => minmax_history(pair),
    }
}

fn pooled_mean_std(past: &Array2<f64>, future: &Array2<f64>, col: usize) -> (f64, f64) {
    let mean = past
        .column(col)
        .iter()
        .chain(future.column(col).iter())
        .mean();
    // sample standard deviation, matching the pooled-frame convention
    let std = past
        .column(col)
        .iter()
        .chain(future.column(col).iter())
        .std_dev();
    (mean, std)
}

fn zscore_pair(pair: &WindowPair) -> NormalizedPair {
    let (price_mean, price_std) = pooled_mean_std(&pair.past, &pair.future, COL_CLOSE);
    let (volume_mean, volume_std) = pooled_mean_std(&pair.past, &pair.future, COL_VOLUME);
    let (macd_mean, macd_std) = pooled_mean_std(&pair.past, &pair.future, COL_MACD_PROPER);

    let params = ZScoreParams {
        price_mean,
        price_std,
        volume_mean,
        volume_std,
        macd_mean,
        macd_std,
    };

    let past = apply_zscore(&pair.past, &params);
    let future = apply_zscore(&pair.future, &params);

    NormalizedPair {
        past,
        future,
        params: NormParams::ZScore(params),
    }
}

fn apply_zscore(matrix: &Array2<f64>, params: &ZScoreParams) -> Array2<f64> {
    let mut out = matrix.clone();

    for &col in &PRICE_COLS {
        out.column_mut(col)
            .mapv_inplace(|x| (x - params.price_mean) / (params.price_std + Z_SCORE_EPS));
    }

    out.column_mut(COL_VOLUME)
        .mapv_inplace(|x| (x - params.volume_mean) / (params.volume_std + Z_SCORE_EPS));

    for &col in &[COL_MACD_PROPER, COL_MACD_SIGNAL] {
        out.column_mut(col)
            .mapv_inplace(|x| (x - params.macd_mean) / (params.macd_std + Z_SCORE_EPS));
    }

    // Recompute the histogram from the standardized lines instead of
    // standardizing it independently, preserving diff = proper - signal.
    let diff = &out.column(COL_MACD_PROPER).to_owned() - &out.column(COL_MACD_SIGNAL).to_owned();
    out.column_mut(COL_MACD_DIFF).assign(&diff);

    out
}

fn minmax_history(pair: &WindowPair) -> NormalizedPair {
    let lower = pair
        .past
        .map_axis(Axis(0), |col| col.iter().fold(f64::INFINITY, |a, &b| a.min(b)));
    let upper = pair.past.map_axis(Axis(0), |col| {
        col.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))
    });

    let bounds = MinMaxBounds { upper, lower };
    let past = apply_minmax(&pair.past, &bounds);
    let future = apply_minmax(&pair.future, &bounds);

    NormalizedPair {
        past,
        future,
        params: NormParams::MinMax(bounds),
    }
}

fn apply_minmax(matrix: &Array2<f64>, bounds: &MinMaxBounds) -> Array2<f64> {
    let mut out = matrix.clone();
    for (col, mut lane) in out.axis_iter_mut(Axis(1)).enumerate() {
        let lower = bounds.lower[col];
        let span = bounds.upper[col] - lower + MIN_MAX_EPS;
        lane.mapv_inplace(|x| (x - lower) / span);
    }
    out
}

/// Reconstruct original values from a normalized slice.
///
/// The z-score inverse recovers the MACD histogram by scale alone, since
/// the forward pass rebuilt it as a difference of mean-shifted lines.
pub fn denormalize(matrix: &Array2<f64>, params: &NormParams) -> Array2<f64> {
    match params {
        NormParams::ZScore(p) => {
            let mut out = matrix.clone();
            for &col in &PRICE_COLS {
                out.column_mut(col)
                    .mapv_inplace(|x| x * (p.price_std + Z_SCORE_EPS) + p.price_mean);
            }
            out.column_mut(COL_VOLUME)
                .mapv_inplace(|x| x * (p.volume_std + Z_SCORE_EPS) + p.volume_mean);
            for &col in &[COL_MACD_PROPER, COL_MACD_SIGNAL] {
                out.column_mut(col)
                    .mapv_inplace(|x| x * (p.macd_std + Z_SCORE_EPS) + p.macd_mean);
            }
            out.column_mut(COL_MACD_DIFF)
                .mapv_inplace(|x| x * (p.macd_std + Z_SCORE_EPS));
            out
        }
        NormParams::MinMax(b) => {
            let mut out = matrix.clone();
            for (col, mut lane) in out.axis_iter_mut(Axis(1)).enumerate() {
                let lower = b.lower[col];
                let span = b.upper[col] - lower + MIN_MAX_EPS;
                lane.mapv_inplace(|x| x * span + lower);
            }
            out
        }
    }
}

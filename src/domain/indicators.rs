//! Pure indicator computations over ordered price series.
//!
//! Every function here is a deterministic transform of a `&[f64]` slice into
//! vectors of the same length, with no retained state between calls. Early
//! indices where a full window is not yet available use a shortened, causal
//! window rather than being dropped, so output length always equals input
//! length. Division-by-zero is handled with fixed epsilon additives, never
//! by returning errors.

use statrs::statistics::Statistics;

/// Epsilon guarding the %b denominator when band width collapses to zero.
const PERCENT_B_EPS: f64 = 1e-10;

/// Simple moving average with a causal, variable-length warmup window.
///
/// For each index `i` the value is the mean of
/// `series[max(0, i - period + 1) ..= i]`, so `sma(s, p)[0] == s[0]` for any
/// period.
pub fn sma(series: &[f64], period: usize) -> Vec<f64> {
    series
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(period);
            series[start..=i].mean()
        })
        .collect()
}

/// Exponential moving average, `v_t = beta * v_{t-1} + (1 - beta) * a_t`
/// with `beta = 1 - 2 / (period + 1)`.
///
/// Seeded with the first observation and left uncorrected for the seed bias
/// (the simpler, biased variant). A period of 1 makes `beta = 0` and the
/// series passes through unchanged.
pub fn ema(series: &[f64], period: usize) -> Vec<f64> {
    let beta = 1.0 - 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(series.len());
    for (i, &val) in series.iter().enumerate() {
        if i == 0 {
            out.push(val);
            continue;
        }
        let previous = out[i - 1];
        out.push(beta * previous + (1.0 - beta) * val);
    }
    out
}

/// Moving average convergence/divergence.
///
/// Returns `(proper, signal_line, diff)` where `proper` is the fast/slow EMA
/// spread, `signal_line` is the EMA of `proper`, and `diff` is computed as
/// the exact element-wise difference of the two.
pub fn macd(
    series: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast_ema = ema(series, fast);
    let slow_ema = ema(series, slow);
    let proper: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&proper, signal);
    let diff: Vec<f64> = proper
        .iter()
        .zip(signal_line.iter())
        .map(|(p, s)| p - s)
        .collect();
    (proper, signal_line, diff)
}

/// Causal rolling population standard deviation, same warmup-window policy
/// as [`sma`]. A single-observation window yields 0.
pub fn moving_std(series: &[f64], period: usize) -> Vec<f64> {
    series
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(period);
            series[start..=i].population_std_dev()
        })
        .collect()
}

/// Bollinger bands and their derived indicators.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    pub percent_b: Vec<f64>,
    pub bandwidth: Vec<f64>,
}

/// Bollinger bands around a `period`-SMA midline at `k` standard deviations.
///
/// `percent_b` locates the price inside the band, `(price - lower) /
/// (upper - lower + eps)`; `bandwidth` is the band width relative to the
/// midline.
pub fn bbands(series: &[f64], period: usize, k: f64) -> BollingerBands {
    let mid = sma(series, period);
    let dev = moving_std(series, period);

    let upper: Vec<f64> = mid.iter().zip(dev.iter()).map(|(m, d)| m + k * d).collect();
    let lower: Vec<f64> = mid.iter().zip(dev.iter()).map(|(m, d)| m - k * d).collect();

    let percent_b: Vec<f64> = series
        .iter()
        .zip(upper.iter().zip(lower.iter()))
        .map(|(price, (u, l))| (price - l) / (u - l + PERCENT_B_EPS))
        .collect();

    let bandwidth: Vec<f64> = upper
        .iter()
        .zip(lower.iter().zip(mid.iter()))
        .map(|(u, (l, m))| (u - l) / m)
        .collect();

    BollingerBands {
        upper,
        lower,
        percent_b,
        bandwidth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_preserves_length_and_first_value() {
        let series = vec![4.0, 8.0, 15.0, 16.0, 23.0, 42.0];
        for period in 1..=8 {
            let ma = sma(&series, period);
            assert_eq!(ma.len(), series.len());
            assert_eq!(ma[0], series[0]);
        }
    }

    #[test]
    fn sma_uses_causal_windows() {
        let series = vec![1.0, 2.0, 3.0, 4.0];
        let ma = sma(&series, 3);
        assert_eq!(ma, vec![1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn ema_period_one_is_passthrough() {
        let series = vec![3.0, -1.0, 4.0, 1.0, 5.0];
        let out = ema(&series, 1);
        for (a, b) in out.iter().zip(series.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn ema_seeds_with_first_observation() {
        let series = vec![10.0, 12.0];
        let out = ema(&series, 5);
        // beta = 1 - 2/6 = 2/3
        assert_eq!(out[0], 10.0);
        assert!((out[1] - (2.0 / 3.0 * 10.0 + 1.0 / 3.0 * 12.0)).abs() < 1e-12);
    }

    #[test]
    fn macd_diff_is_exact_identity() {
        let series: Vec<f64> = (0..120).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let (proper, signal_line, diff) = macd(&series, 12, 26, 9);
        assert_eq!(proper.len(), series.len());
        for i in 0..series.len() {
            assert_eq!(diff[i], proper[i] - signal_line[i]);
        }
    }

    #[test]
    fn moving_std_single_observation_is_zero() {
        let series = vec![7.0];
        assert_eq!(moving_std(&series, 20), vec![0.0]);
    }

    #[test]
    fn moving_std_is_population_flavor() {
        // window [2, 4]: population variance = 1, std = 1
        let series = vec![2.0, 4.0];
        let out = moving_std(&series, 2);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bbands_upper_never_below_lower() {
        let series: Vec<f64> = (0..80).map(|i| 50.0 + (i as f64 * 1.3).cos() * 9.0).collect();
        let bands = bbands(&series, 20, 2.0);
        for (u, l) in bands.upper.iter().zip(bands.lower.iter()) {
            assert!(u >= l);
        }
    }

    #[test]
    fn bbands_flat_series_has_no_division_blowup() {
        let series = vec![5.0; 30];
        let bands = bbands(&series, 20, 2.0);
        for pb in &bands.percent_b {
            assert!(pb.is_finite());
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let series: Vec<f64> = Vec::new();
        assert!(sma(&series, 5).is_empty());
        assert!(ema(&series, 5).is_empty());
        assert!(moving_std(&series, 5).is_empty());
        let (p, s, d) = macd(&series, 12, 26, 9);
        assert!(p.is_empty() && s.is_empty() && d.is_empty());
    }

    #[test]
    fn single_element_input_degenerates() {
        let series = vec![42.0];
        assert_eq!(sma(&series, 5), vec![42.0]);
        assert_eq!(ema(&series, 5), vec![42.0]);
        assert_eq!(moving_std(&series, 5), vec![0.0]);
    }
}

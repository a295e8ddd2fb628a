//! Supervised-learning targets derived from normalized window pairs.
//!
//! Single-pair functions are the reference semantics; the batch variants
//! fill one output row per pair and must stay element-wise equivalent to
//! looping over the singles. Shape mismatches across a batch are
//! programmer errors and fail via assertions, not recoverable results.

use ndarray::Array2;

use crate::domain::candlestick::COL_CLOSE;

/// Peak and valley of the closing price over the future slice.
pub fn price_range(future: &Array2<f64>) -> (f64, f64) {
    let closes = future.column(COL_CLOSE);
    let peak = closes.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let valley = closes.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    (peak, valley)
}

/// Signed move from the last past close to the last future close.
/// Consumers threshold at zero for a binary up/down label.
pub fn direction(past: &Array2<f64>, future: &Array2<f64>) -> f64 {
    let base = past[[past.nrows() - 1, COL_CLOSE]];
    let last = future[[future.nrows() - 1, COL_CLOSE]];
    last - base
}

/// Direction sign weighted by the magnitude of the future price range.
pub fn momentum(past: &Array2<f64>, future: &Array2<f64>) -> f64 {
    let (peak, valley) = price_range(future);
    direction(past, future).signum() * (peak - valley)
}

/// Closing price of the last future row, the single-scalar prediction
/// task.
pub fn next_close(future: &Array2<f64>) -> f64 {
    future[[future.nrows() - 1, COL_CLOSE]]
}

fn assert_uniform_batch(pasts: &[Array2<f64>], futures: &[Array2<f64>]) {
    assert_eq!(
        pasts.len(),
        futures.len(),
        "target batch: {} past slices vs {} future slices",
        pasts.len(),
        futures.len()
    );
    if let Some(first) = pasts.first() {
        assert!(
            pasts.iter().all(|p| p.dim() == first.dim()),
            "target batch: past slices have mixed shapes"
        );
    }
    if let Some(first) = futures.first() {
        assert!(
            futures.iter().all(|f| f.dim() == first.dim()),
            "target batch: future slices have mixed shapes"
        );
    }
}

/// Batch [`price_range`]: one `(peak, valley)` row per pair, shape (m, 2).
pub fn price_range_batch(futures: &[Array2<f64>]) -> Array2<f64> {
    let mut out = Array2::zeros((futures.len(), 2));
    for (i, future) in futures.iter().enumerate() {
        let (peak, valley) = price_range(future);
        out[[i, 0]] = peak;
        out[[i, 1]] = valley;
    }
    out
}

/// Batch [`direction`], shape (m, 1).
pub fn direction_batch(pasts: &[Array2<f64>], futures: &[Array2<f64>]) -> Array2<f64> {
    assert_uniform_batch(pasts, futures);
    let mut out = Array2::zeros((pasts.len(), 1));
    for (i, (past, future)) in pasts.iter().zip(futures.iter()).enumerate() {
        out[[i, 0]] = direction(past, future);
    }
    out
}

/// Batch [`momentum`], shape (m, 1).
pub fn momentum_batch(pasts: &[Array2<f64>], futures: &[Array2<f64>]) -> Array2<f64> {
    assert_uniform_batch(pasts, futures);
    let mut out = Array2::zeros((pasts.len(), 1));
    for (i, (past, future)) in pasts.iter().zip(futures.iter()).enumerate() {
        out[[i, 0]] = momentum(past, future);
    }
    out
}

/// Batch multi-head target `[peak, valley, direction, momentum]`,
/// shape (m, 4).
pub fn combined_batch(pasts: &[Array2<f64>], futures: &[Array2<f64>]) -> Array2<f64> {
    assert_uniform_batch(pasts, futures);
    let mut out = Array2::zeros((pasts.len(), 4));
    for (i, (past, future)) in pasts.iter().zip(futures.iter()).enumerate() {
        let (peak, valley) = price_range(future);
        out[[i, 0]] = peak;
        out[[i, 1]] = valley;
        out[[i, 2]] = direction(past, future);
        out[[i, 3]] = momentum(past, future);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candlestick::FEATURE_COUNT;

    fn matrix_with_closes(closes: &[f64]) -> Array2<f64> {
        let mut m = Array2::<f64>::zeros((closes.len(), FEATURE_COUNT));
        for (i, &c) in closes.iter().enumerate() {
            m[[i, COL_CLOSE]] = c;
        }
        m
    }

    #[test]
    fn price_range_picks_peak_and_valley() {
        let future = matrix_with_closes(&[10.0, 7.0, 9.0]);
        assert_eq!(price_range(&future), (10.0, 7.0));
    }

    #[test]
    fn direction_is_last_close_delta() {
        let past = matrix_with_closes(&[1.0, 2.0, 3.0]);
        let up = matrix_with_closes(&[2.5, 4.0]);
        let down = matrix_with_closes(&[2.5, 2.0]);
        assert_eq!(direction(&past, &up), 1.0);
        assert_eq!(direction(&past, &down), -1.0);
    }

    #[test]
    fn momentum_signs_the_range_magnitude() {
        let past = matrix_with_closes(&[1.0, 2.0, 3.0]);
        let future = matrix_with_closes(&[10.0, 7.0, 2.0]);
        // downward move, range width 8
        assert_eq!(momentum(&past, &future), -8.0);
    }

    #[test]
    fn batch_targets_match_singles() {
        let pasts: Vec<Array2<f64>> = (0..5)
            .map(|k| matrix_with_closes(&[k as f64, k as f64 + 1.0, k as f64 + 2.0]))
            .collect();
        let futures: Vec<Array2<f64>> = (0..5)
            .map(|k| matrix_with_closes(&[k as f64 + 3.0, k as f64 * 2.0]))
            .collect();

        let ranges = price_range_batch(&futures);
        let dirs = direction_batch(&pasts, &futures);
        let moms = momentum_batch(&pasts, &futures);
        let combined = combined_batch(&pasts, &futures);

        for i in 0..5 {
            let (peak, valley) = price_range(&futures[i]);
            assert_eq!(ranges[[i, 0]], peak);
            assert_eq!(ranges[[i, 1]], valley);
            assert_eq!(dirs[[i, 0]], direction(&pasts[i], &futures[i]));
            assert_eq!(moms[[i, 0]], momentum(&pasts[i], &futures[i]));
            assert_eq!(combined[[i, 2]], dirs[[i, 0]]);
            assert_eq!(combined[[i, 3]], moms[[i, 0]]);
        }
    }

    #[test]
    #[should_panic(expected = "past slices vs")]
    fn mismatched_batch_lengths_panic() {
        let pasts = vec![matrix_with_closes(&[1.0, 2.0])];
        let futures = vec![
            matrix_with_closes(&[3.0]),
            matrix_with_closes(&[4.0]),
        ];
        direction_batch(&pasts, &futures);
    }

    #[test]
    #[should_panic(expected = "mixed shapes")]
    fn mixed_future_shapes_panic() {
        let pasts = vec![
            matrix_with_closes(&[1.0, 2.0]),
            matrix_with_closes(&[1.0, 2.0]),
        ];
        let futures = vec![matrix_with_closes(&[3.0]), matrix_with_closes(&[4.0, 5.0])];
        momentum_batch(&pasts, &futures);
    }
}

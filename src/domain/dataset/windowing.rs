use ndarray::{Array2, s};

use crate::domain::errors::DatasetError;

/// Adjacent, non-overlapping past/future slices cut from one ordered
/// feature matrix. Rows are timestamps, columns follow the canonical
/// feature layout.
#[derive(Debug, Clone)]
pub struct WindowPair {
    pub past: Array2<f64>,
    pub future: Array2<f64>,
}

/// Slice a feature matrix into every stride-1 window pair of
/// `history_size` past rows immediately followed by `future_size` future
/// rows.
///
/// Window index increases with the start row, so pairs come out in time
/// order. A series too short for even one pair is an explicit
/// [`DatasetError::InsufficientData`] rather than an empty result; silent
/// emptiness would mask upstream data gaps.
pub fn history_future_split(
    matrix: &Array2<f64>,
    history_size: usize,
    future_size: usize,
) -> Result<Vec<WindowPair>, DatasetError> {
    let window_size = history_size + future_size;
    let rows = matrix.nrows();
    if rows < window_size {
        return Err(DatasetError::InsufficientData {
            required: window_size,
            actual: rows,
        });
    }

    let mut pairs = Vec::with_capacity(rows - window_size + 1);
    for i in 0..=(rows - window_size) {
        let past = matrix.slice(s![i..i + history_size, ..]).to_owned();
        let future = matrix
            .slice(s![i + history_size..i + window_size, ..])
            .to_owned();
        pairs.push(WindowPair { past, future });
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn splits_six_rows_into_two_pairs() {
        let matrix = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let pairs = history_future_split(&matrix, 3, 2).unwrap();
        assert_eq!(pairs.len(), 2);

        assert_eq!(pairs[0].past, array![[0.0], [1.0], [2.0]]);
        assert_eq!(pairs[0].future, array![[3.0], [4.0]]);
        assert_eq!(pairs[1].past, array![[1.0], [2.0], [3.0]]);
        assert_eq!(pairs[1].future, array![[4.0], [5.0]]);
    }

    #[test]
    fn exact_fit_yields_single_pair() {
        let matrix = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let pairs = history_future_split(&matrix, 3, 2).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].future, array![[3.0], [4.0]]);
    }

    #[test]
    fn too_short_series_is_an_explicit_error() {
        let matrix = array![[0.0], [1.0], [2.0], [3.0]];
        let err = history_future_split(&matrix, 3, 2).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::InsufficientData {
                required: 5,
                actual: 4
            }
        ));
    }

    #[test]
    fn slices_are_adjacent_per_pair() {
        let matrix = array![
            [0.0, 10.0],
            [1.0, 11.0],
            [2.0, 12.0],
            [3.0, 13.0],
            [4.0, 14.0],
            [5.0, 15.0],
            [6.0, 16.0]
        ];
        let pairs = history_future_split(&matrix, 4, 2).unwrap();
        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.past.nrows(), 4);
            assert_eq!(pair.future.nrows(), 2);
            // the future slice starts exactly where the past slice ends
            assert_eq!(pair.past[[3, 0]] + 1.0, pair.future[[0, 0]]);
            assert_eq!(pair.past[[0, 0]], i as f64);
        }
    }
}

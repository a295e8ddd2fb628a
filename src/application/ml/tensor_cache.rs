//! On-disk cache for training tensors.
//!
//! Each split lands as three files under the cache root: `x_<split>.csv`
//! with one flattened past window per row, `y_<split>.csv` with one target
//! row per example, and `<split>_meta.json` carrying the shapes a consumer
//! needs to rebuild the tensors.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::dataset_builder::TrainingTensors;

#[derive(Debug, Serialize, Deserialize)]
pub struct SplitMeta {
    pub split: String,
    pub examples: usize,
    pub past_length: usize,
    pub feature_count: usize,
    pub target_dim: usize,
}

pub struct TensorCache {
    root: PathBuf,
}

impl TensorCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn store_split(&self, split: &str, tensors: &TrainingTensors) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create tensor cache directory")?;

        let (examples, past_length, feature_count) = tensors.x.dim();
        let target_dim = tensors.y.ncols();

        self.write_matrix_rows(
            &self.root.join(format!("x_{}.csv", split)),
            tensors.x.axis_iter(Axis(0)).map(|w| w.iter().copied().collect()),
        )?;
        self.write_matrix_rows(
            &self.root.join(format!("y_{}.csv", split)),
            tensors.y.axis_iter(Axis(0)).map(|r| r.iter().copied().collect()),
        )?;

        let meta = SplitMeta {
            split: split.to_string(),
            examples,
            past_length,
            feature_count,
            target_dim,
        };
        let meta_path = self.root.join(format!("{}_meta.json", split));
        let meta_file =
            fs::File::create(&meta_path).context("Failed to create split metadata file")?;
        serde_json::to_writer_pretty(meta_file, &meta)
            .context("Failed to serialize split metadata")?;

        info!(
            "Cached split '{}': {} examples ({}x{} inputs, {} target dims)",
            split, examples, past_length, feature_count, target_dim
        );
        Ok(())
    }

    fn write_matrix_rows(
        &self,
        path: &Path,
        rows: impl Iterator<Item = Vec<f64>>,
    ) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("Failed to open {:?} for writing", path))?;
        for row in rows {
            wtr.serialize(row).context("Failed to serialize tensor row")?;
        }
        wtr.flush().context("Failed to flush tensor rows")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn stores_all_three_files_per_split() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TensorCache::new(dir.path());

        let tensors = TrainingTensors {
            x: Array3::from_shape_fn((4, 3, 2), |(i, j, k)| (i + j + k) as f64),
            y: Array2::from_shape_fn((4, 2), |(i, j)| (i * 10 + j) as f64),
        };
        cache.store_split("train", &tensors).unwrap();

        assert!(dir.path().join("x_train.csv").exists());
        assert!(dir.path().join("y_train.csv").exists());

        let meta: SplitMeta = serde_json::from_reader(
            std::fs::File::open(dir.path().join("train_meta.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(meta.examples, 4);
        assert_eq!(meta.past_length, 3);
        assert_eq!(meta.feature_count, 2);
        assert_eq!(meta.target_dim, 2);

        let x_rows = std::fs::read_to_string(dir.path().join("x_train.csv")).unwrap();
        assert_eq!(x_rows.lines().count(), 4);
        // each row carries the flattened 3x2 window
        assert_eq!(x_rows.lines().next().unwrap().split(',').count(), 6);
    }
}

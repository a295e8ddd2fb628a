//! Train/valid/test split preparation.
//!
//! Splits are cut by timestamp boundaries, not by example index, so no
//! window pair ever straddles two splits. Each split is read from the
//! repository as one ordered series, built into tensors, and cached.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::dataset_builder::DatasetBuilder;
use super::tensor_cache::TensorCache;
use crate::domain::repositories::CandleRepository;

/// Inclusive end timestamps for the train and valid splits. The test
/// split runs from just past `valid_end` to the end of the stored series.
#[derive(Debug, Clone, Copy)]
pub struct SplitBoundaries {
    pub train_end: i64,
    pub valid_end: i64,
}

pub struct DatasetService {
    repository: Arc<dyn CandleRepository>,
    builder: DatasetBuilder,
    cache: TensorCache,
}

impl DatasetService {
    pub fn new(
        repository: Arc<dyn CandleRepository>,
        builder: DatasetBuilder,
        cache: TensorCache,
    ) -> Self {
        Self {
            repository,
            builder,
            cache,
        }
    }

    /// Build and cache tensors for the train, valid, and test splits of
    /// one pair. Returns the number of examples per split, in split
    /// order. A split too short for a single window pair is a hard error,
    /// never a silently empty file.
    pub async fn prepare_splits(
        &self,
        base: &str,
        counter: &str,
        boundaries: &SplitBoundaries,
    ) -> Result<Vec<(String, usize)>> {
        let splits: [(&str, Option<i64>, Option<i64>); 3] = [
            ("train", None, Some(boundaries.train_end)),
            ("valid", Some(boundaries.train_end + 1), Some(boundaries.valid_end)),
            ("test", Some(boundaries.valid_end + 1), None),
        ];

        let mut counts = Vec::with_capacity(splits.len());
        for (name, start_ts, end_ts) in splits {
            let series = self
                .repository
                .get_series(base, counter, start_ts, end_ts)
                .await?;
            let tensors = self.builder.build(&series).with_context(|| {
                format!("Failed to build '{}' split for {}/{}", name, base, counter)
            })?;
            let examples = tensors.x.dim().0;
            self.cache.store_split(name, &tensors)?;
            info!(
                "Split '{}' for {}/{}: {} rows -> {} examples",
                name,
                base,
                counter,
                series.len(),
                examples
            );
            counts.push((name.to_string(), examples));
        }
        Ok(counts)
    }
}

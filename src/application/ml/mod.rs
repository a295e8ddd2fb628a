pub mod dataset_builder;
pub mod dataset_service;
pub mod tensor_cache;

pub use dataset_builder::{DatasetBuilder, TargetKind, TrainingTensors};
pub use dataset_service::{DatasetService, SplitBoundaries};
pub use tensor_cache::TensorCache;

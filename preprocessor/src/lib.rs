//! Audio feature preprocessor library
//!
//! Exposes the pipeline stages for the binary and for integration testing:
//! - [`services`]: dataset enumeration and loading
//! - [`features`]: cepstral and mel-spectrogram extraction
//! - [`persist`]: `.npy` output
//! - [`pipeline`]: memoized orchestration

pub mod features;
pub mod persist;
pub mod pipeline;
pub mod services;
pub mod types;
pub mod utils;

pub use features::FeatureExtractor;
pub use persist::{load_feature, Persister, SaveReport};
pub use pipeline::{Pipeline, PipelineState, RunReport};
pub use services::{AudioLoader, LoadedDataset};
pub use types::{FeatureKind, FeatureMatrix, SkipReason, SkippedFile, Waveform};

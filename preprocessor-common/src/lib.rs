//! # Preprocessor Common Library
//!
//! Shared code for the audio feature preprocessor:
//! - Error taxonomy
//! - Configuration loading (TOML + compiled defaults)
//! - Logging initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ExtractionParams, PadMode, PipelineConfig};
pub use error::{Error, Result};

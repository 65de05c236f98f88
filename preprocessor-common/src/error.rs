//! Common error types for the preprocessor

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for preprocessor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error conditions shared by the loader, extractors, persister and pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Dataset or output directory does not exist or cannot be enumerated
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// File extension is not the supported waveform container
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(PathBuf),

    /// Audio decoding failed
    #[error("Audio decode error in {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Sample rate conversion failed
    #[error("Resampling error: {0}")]
    Resample(String),

    /// Feature array could not be encoded or parsed
    #[error("Feature file format error: {0}")]
    Format(String),

    /// Writing a feature file failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

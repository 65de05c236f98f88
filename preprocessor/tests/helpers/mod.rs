//! Test Helper Utilities
//!
//! Shared utilities for preprocessor integration tests

pub mod audio_generator;

pub use audio_generator::{generate_test_library, generate_test_wav, read_wav_mono, AudioConfig};

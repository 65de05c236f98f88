//! Spectral feature extraction
//!
//! - [`stft`]: windowed power spectrogram (centred or not)
//! - [`mel`]: Slaney mel filterbank
//! - [`mfcc`]: dB compression and DCT-II basis
//! - [`extractor`]: the two end-to-end algorithms

pub mod extractor;
pub mod mel;
pub mod mfcc;
pub mod stft;

pub use extractor::FeatureExtractor;

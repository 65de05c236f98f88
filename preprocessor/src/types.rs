//! Core data types flowing through the pipeline

use ndarray::Array2;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Feature representation produced by an extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// Mel-frequency cepstral coefficients
    Mfccs,
    /// Mel-scaled power spectrogram
    MelSpectrograms,
}

impl FeatureKind {
    /// Literal tag used on the command line and in output file names
    pub fn tag(&self) -> &'static str {
        match self {
            FeatureKind::Mfccs => "mfccs",
            FeatureKind::MelSpectrograms => "melspectrograms",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for FeatureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mfccs" => Ok(FeatureKind::Mfccs),
            "melspectrograms" => Ok(FeatureKind::MelSpectrograms),
            other => Err(format!(
                "unknown feature kind '{}' (expected 'mfccs' or 'melspectrograms')",
                other
            )),
        }
    }
}

/// Mono recording resampled to the configured rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// File the samples were decoded from
    pub path: PathBuf,
    /// File name without extension; keys the output file
    pub name: String,
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(path: &Path, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            name: file_stem(path),
            samples,
            sample_rate,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Extracted features of one recording, shaped (bands or coefficients × frames)
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Stem of the originating file
    pub source: String,
    pub kind: FeatureKind,
    pub data: Array2<f32>,
}

impl FeatureMatrix {
    pub fn new(source: impl Into<String>, kind: FeatureKind, data: Array2<f32>) -> Self {
        Self {
            source: source.into(),
            kind,
            data,
        }
    }

    /// Length of the band/coefficient axis
    pub fn bands(&self) -> usize {
        self.data.nrows()
    }

    /// Length of the time axis
    pub fn frames(&self) -> usize {
        self.data.ncols()
    }

    /// Output file name, `<stem>_<kind>.npy`
    pub fn file_name(&self) -> String {
        format!("{}_{}.{}", self.source, self.kind.tag(), crate::persist::EXTENSION)
    }
}

/// Why an entry in the dataset directory produced no waveform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Extension is not `.wav`
    UnsupportedFileType,
    /// `.wav` extension but no RIFF/WAVE header
    NotWaveContainer,
    /// Header looked valid but decoding or resampling failed
    DecodeFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedFileType => f.write_str("unsupported file type"),
            SkipReason::NotWaveContainer => f.write_str("not a RIFF/WAVE container"),
            SkipReason::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
        }
    }
}

/// Dataset entry excluded from the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

//! Configuration loading and validation
//!
//! Resolution priority (highest first):
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! Tiers 1 and 2 are handled by the binary's argument parser and arrive here
//! as [`ParamOverrides`]; this module owns tiers 3 and 4.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default target sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;
/// Default mel-band count for mel-spectrogram extraction
pub const DEFAULT_MEL_BANDS: usize = 10;
/// Default number of cepstral coefficients kept
pub const DEFAULT_N_MFCC: usize = 13;
/// Default transform window size in samples
pub const DEFAULT_N_FFT: usize = 2048;
/// Default hop size in samples
pub const DEFAULT_HOP_LENGTH: usize = 512;
/// Default mel-band count used inside cepstral extraction
pub const DEFAULT_CEPSTRAL_MEL_BANDS: usize = 128;

/// Edge padding applied by the centred STFT of the cepstral path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadMode {
    /// Mirror the signal around its first and last sample
    #[default]
    Reflect,
    /// Pad with zeros
    Constant,
}

/// Numeric parameters of the feature extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionParams {
    pub sample_rate: u32,
    pub mel_bands: usize,
    pub n_mfcc: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub cepstral_mel_bands: usize,
    pub center_pad_mode: PadMode,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            mel_bands: DEFAULT_MEL_BANDS,
            n_mfcc: DEFAULT_N_MFCC,
            n_fft: DEFAULT_N_FFT,
            hop_length: DEFAULT_HOP_LENGTH,
            cepstral_mel_bands: DEFAULT_CEPSTRAL_MEL_BANDS,
            center_pad_mode: PadMode::default(),
        }
    }
}

impl ExtractionParams {
    /// Reject parameter combinations the transforms cannot honour
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("sample_rate", self.sample_rate as usize),
            ("mel_bands", self.mel_bands),
            ("n_mfcc", self.n_mfcc),
            ("n_fft", self.n_fft),
            ("hop_length", self.hop_length),
            ("cepstral_mel_bands", self.cepstral_mel_bands),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }

        if self.n_fft < 2 {
            return Err(Error::Config("n_fft must be at least 2".to_string()));
        }

        if self.hop_length > self.n_fft {
            return Err(Error::Config(format!(
                "hop_length ({}) must not exceed n_fft ({})",
                self.hop_length, self.n_fft
            )));
        }

        if self.n_mfcc > self.cepstral_mel_bands {
            return Err(Error::Config(format!(
                "n_mfcc ({}) must not exceed cepstral_mel_bands ({})",
                self.n_mfcc, self.cepstral_mel_bands
            )));
        }

        Ok(())
    }

    /// Apply command-line / environment overrides on top of these values
    pub fn with_overrides(mut self, overrides: &ParamOverrides) -> Self {
        if let Some(v) = overrides.sample_rate {
            self.sample_rate = v;
        }
        if let Some(v) = overrides.mel_bands {
            self.mel_bands = v;
        }
        if let Some(v) = overrides.n_mfcc {
            self.n_mfcc = v;
        }
        if let Some(v) = overrides.n_fft {
            self.n_fft = v;
        }
        if let Some(v) = overrides.hop_length {
            self.hop_length = v;
        }
        self
    }
}

/// Values supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ParamOverrides {
    pub sample_rate: Option<u32>,
    pub mel_bands: Option<usize>,
    pub n_mfcc: Option<usize>,
    pub n_fft: Option<usize>,
    pub hop_length: Option<usize>,
}

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub extraction: ExtractionParams,
    pub logging: LoggingConfig,
}

/// Platform config file location (`<config dir>/preprocessor/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("preprocessor").join("config.toml"))
}

/// Parse a TOML config file. Missing or malformed files are errors.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Where the TOML tier came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No file at the platform location; compiled defaults
    Defaults(Option<PathBuf>),
}

/// TOML tier plus the file it was read from.
///
/// Resolution happens before the subscriber is installed, so the caller
/// logs `source` once logging is up.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub toml: TomlConfig,
    pub source: ConfigSource,
}

/// Resolve the TOML tier.
///
/// An explicitly requested file must exist and parse. The platform default
/// file is optional: when absent, compiled defaults are used.
pub fn resolve_toml_config(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    if let Some(path) = explicit {
        return Ok(ResolvedConfig {
            toml: load_toml_config(path)?,
            source: ConfigSource::File(path.to_path_buf()),
        });
    }

    match default_config_path() {
        Some(path) if path.exists() => Ok(ResolvedConfig {
            toml: load_toml_config(&path)?,
            source: ConfigSource::File(path),
        }),
        searched => Ok(ResolvedConfig {
            toml: TomlConfig::default(),
            source: ConfigSource::Defaults(searched),
        }),
    }
}

/// Immutable run configuration
///
/// Built once at startup and never mutated; read through accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    dataset_path: PathBuf,
    output_path: PathBuf,
    params: ExtractionParams,
}

impl PipelineConfig {
    /// Create a validated configuration
    pub fn new(
        dataset_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        params: ExtractionParams,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            dataset_path: dataset_path.into(),
            output_path: output_path.into(),
            params,
        })
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn params(&self) -> &ExtractionParams {
        &self.params
    }

    pub fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    pub fn mel_bands(&self) -> usize {
        self.params.mel_bands
    }

    pub fn n_mfcc(&self) -> usize {
        self.params.n_mfcc
    }

    pub fn n_fft(&self) -> usize {
        self.params.n_fft
    }

    pub fn hop_length(&self) -> usize {
        self.params.hop_length
    }
}

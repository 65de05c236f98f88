//! Dataset loader
//!
//! Turns a dataset directory into mono waveforms at the target sample rate.
//! Directory enumeration and filtering are delegated to [`FileScanner`],
//! decoding to symphonia and rate conversion to rubato.

use crate::services::file_scanner::{FileScanner, WAVE_EXTENSION};
use crate::types::{SkipReason, SkippedFile, Waveform};
use crate::utils::{decode_audio_file, resample_mono};
use preprocessor_common::{Error, PipelineConfig, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Waveforms of every eligible file plus the entries that were excluded
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    /// In enumeration (file name) order
    pub waveforms: Vec<Waveform>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadedDataset {
    pub fn is_empty(&self) -> bool {
        self.waveforms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waveforms.len()
    }
}

/// Loads every WAV file of one directory
pub struct AudioLoader {
    dataset_path: PathBuf,
    target_sample_rate: u32,
    scanner: FileScanner,
}

impl AudioLoader {
    /// Create new loader for `dataset_path` producing `target_sample_rate` audio
    pub fn new(dataset_path: impl Into<PathBuf>, target_sample_rate: u32) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            target_sample_rate,
            scanner: FileScanner::new(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.dataset_path(), config.sample_rate())
    }

    /// Decode the whole dataset into memory.
    ///
    /// # Errors
    /// * `DirectoryNotFound` / `NotADirectory` / `Io` when the directory
    ///   cannot be enumerated. Per-file problems are reported in
    ///   [`LoadedDataset::skipped`] instead.
    pub fn load(&self) -> Result<LoadedDataset> {
        let mut stream = self.stream()?;
        let mut waveforms = Vec::with_capacity(stream.len());
        let mut skipped = std::mem::take(&mut stream.skipped);

        for item in stream {
            match item {
                Ok(waveform) => waveforms.push(waveform),
                Err(file) => skipped.push(file),
            }
        }

        info!(
            "Loaded {} recordings from {} ({} skipped)",
            waveforms.len(),
            self.dataset_path.display(),
            skipped.len()
        );

        Ok(LoadedDataset { waveforms, skipped })
    }

    /// Enumerate the dataset now and decode lazily, one file per `next()`.
    pub fn stream(&self) -> Result<WaveformStream> {
        let scan = self.scanner.scan(&self.dataset_path)?;
        Ok(WaveformStream {
            files: scan.files,
            position: 0,
            skipped: scan.skipped,
            target_sample_rate: self.target_sample_rate,
        })
    }

    /// Decode and resample a single `.wav` file
    pub fn load_file(&self, path: &Path) -> Result<Waveform> {
        let is_wave = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(WAVE_EXTENSION))
            .unwrap_or(false);
        if !is_wave {
            return Err(Error::UnsupportedFileType(path.to_path_buf()));
        }

        load_waveform(path, self.target_sample_rate)
    }
}

/// Finite, restartable sequence of decoded waveforms
///
/// Yields `Ok(waveform)` for each decodable file and `Err(skipped)` for a
/// file that passed the scan but failed to decode.
#[derive(Debug, Clone)]
pub struct WaveformStream {
    files: Vec<PathBuf>,
    position: usize,
    skipped: Vec<SkippedFile>,
    target_sample_rate: u32,
}

impl WaveformStream {
    /// Files rejected during enumeration
    pub fn scan_skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Rewind to the first file. Files are re-read from disk.
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl Iterator for WaveformStream {
    type Item = std::result::Result<Waveform, SkippedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.files.get(self.position)?.clone();
        self.position += 1;

        Some(load_waveform(&path, self.target_sample_rate).map_err(|e| {
            warn!(path = %path.display(), "Skipping file: {}", e);
            SkippedFile {
                path,
                reason: SkipReason::DecodeFailed(e.to_string()),
            }
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.files.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WaveformStream {}

fn load_waveform(path: &Path, target_sample_rate: u32) -> Result<Waveform> {
    let decoded = decode_audio_file(path)?;
    let samples = resample_mono(&decoded.samples, decoded.sample_rate, target_sample_rate)?;

    debug!(
        path = %path.display(),
        native_rate = decoded.sample_rate,
        channels = decoded.channels,
        samples = samples.len(),
        "Loaded waveform"
    );

    Ok(Waveform::new(path, samples, target_sample_rate))
}

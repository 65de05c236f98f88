//! Pipeline orchestration
//!
//! Drives load → extract → save for one feature kind. The loaded dataset is
//! cached on the pipeline and reused by later runs until [`Pipeline::invalidate`].
//!
//! State progression: Idle → Loaded → Extracted → Saved

use crate::features::FeatureExtractor;
use crate::persist::{Persister, SaveReport, WriteFailure};
use crate::services::file_scanner::ensure_directory;
use crate::services::{AudioLoader, LoadedDataset};
use crate::types::{FeatureKind, FeatureMatrix, SkippedFile};
use preprocessor_common::{PipelineConfig, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Pipeline progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Nothing loaded, or the cache was invalidated
    #[default]
    Idle,
    /// Dataset decoded (possibly empty)
    Loaded,
    /// Feature matrices computed
    Extracted,
    /// Feature files written
    Saved,
}

/// Outcome of one run
#[derive(Debug)]
pub struct RunReport {
    pub kind: FeatureKind,
    /// State the pipeline stopped in
    pub state: PipelineState,
    /// Recordings that went through extraction
    pub processed: usize,
    pub skipped: Vec<SkippedFile>,
    pub written: Vec<PathBuf>,
    pub failed: Vec<WriteFailure>,
}

impl RunReport {
    fn halted(kind: FeatureKind, state: PipelineState, skipped: Vec<SkippedFile>) -> Self {
        Self {
            kind,
            state,
            processed: 0,
            skipped,
            written: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Memoizing feature-extraction pipeline
pub struct Pipeline {
    config: PipelineConfig,
    loader: AudioLoader,
    extractor: FeatureExtractor,
    persister: Persister,
    cache: Option<LoadedDataset>,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            loader: AudioLoader::from_config(&config),
            extractor: FeatureExtractor::new(config.params()),
            persister: Persister::from_config(&config),
            cache: None,
            state: PipelineState::Idle,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Whether a loaded dataset is held
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Load the dataset, or return the cached one without touching the disk
    pub fn load(&mut self) -> Result<&LoadedDataset> {
        let dataset = load_cached(&mut self.cache, &self.loader)?;
        if self.state == PipelineState::Idle {
            self.state = PipelineState::Loaded;
        }
        Ok(dataset)
    }

    /// Files excluded by the cached load; empty before the first load
    pub fn skipped(&self) -> &[SkippedFile] {
        self.cache.as_ref().map(|d| d.skipped.as_slice()).unwrap_or(&[])
    }

    /// Drop the cached dataset so the next load re-reads the directory
    pub fn invalidate(&mut self) {
        if self.cache.take().is_some() {
            debug!("Dataset cache invalidated");
        }
        self.state = PipelineState::Idle;
    }

    /// Extract `kind` features for every cached waveform
    pub fn extract(&mut self, kind: FeatureKind) -> Result<Vec<FeatureMatrix>> {
        let dataset = load_cached(&mut self.cache, &self.loader)?;
        let matrices = self.extractor.extract_all(kind, &dataset.waveforms)?;
        self.state = if matrices.is_empty() {
            PipelineState::Loaded
        } else {
            PipelineState::Extracted
        };
        Ok(matrices)
    }

    /// Write `matrices` to the output directory
    pub fn save(&mut self, matrices: &[FeatureMatrix], kind: FeatureKind) -> SaveReport {
        let report = self.persister.save(matrices, kind);
        self.state = PipelineState::Saved;
        report
    }

    /// Load (memoized), extract and save every recording.
    ///
    /// Both directories are checked first; a missing one fails before any
    /// extraction. An empty dataset stops in `Loaded` without writing.
    pub fn run(&mut self, kind: FeatureKind) -> Result<RunReport> {
        self.verify_directories()?;

        info!(
            "Extracting {} from {} into {}",
            kind,
            self.config.dataset_path().display(),
            self.config.output_path().display()
        );

        let dataset = load_cached(&mut self.cache, &self.loader)?;
        self.state = PipelineState::Loaded;

        if dataset.is_empty() {
            info!("No eligible recordings found, nothing to extract");
            return Ok(RunReport::halted(kind, self.state, dataset.skipped.clone()));
        }

        let matrices = self.extractor.extract_all(kind, &dataset.waveforms)?;
        self.state = PipelineState::Extracted;

        let save = self.persister.save(&matrices, kind);
        self.state = PipelineState::Saved;

        Ok(RunReport {
            kind,
            state: self.state,
            processed: matrices.len(),
            skipped: dataset.skipped.clone(),
            written: save.written,
            failed: save.failed,
        })
    }

    /// Load, extract and save one recording at a time.
    ///
    /// Holds at most one waveform in memory and leaves the cache untouched.
    pub fn run_streaming(&mut self, kind: FeatureKind) -> Result<RunReport> {
        self.verify_directories()?;

        info!(
            "Streaming {} from {} into {}",
            kind,
            self.config.dataset_path().display(),
            self.config.output_path().display()
        );

        let stream = self.loader.stream()?;
        let mut skipped = stream.scan_skipped().to_vec();
        self.state = PipelineState::Loaded;

        if stream.len() == 0 {
            info!("No eligible recordings found, nothing to extract");
            return Ok(RunReport::halted(kind, self.state, skipped));
        }

        let mut session = self.persister.session(kind);
        let mut processed = 0;

        for item in stream {
            match item {
                Ok(waveform) => {
                    let matrix = self.extractor.extract(kind, &waveform)?;
                    session.write(&matrix);
                    processed += 1;
                }
                Err(file) => skipped.push(file),
            }
        }

        let save = session.finish();
        self.state = if processed == 0 {
            PipelineState::Loaded
        } else {
            PipelineState::Saved
        };

        Ok(RunReport {
            kind,
            state: self.state,
            processed,
            skipped,
            written: save.written,
            failed: save.failed,
        })
    }

    fn verify_directories(&self) -> Result<()> {
        if self.cache.is_none() {
            ensure_directory(self.config.dataset_path())?;
        }
        self.persister.ensure_output_dir()
    }
}

fn load_cached<'a>(
    cache: &'a mut Option<LoadedDataset>,
    loader: &AudioLoader,
) -> Result<&'a LoadedDataset> {
    let dataset = match cache.take() {
        Some(dataset) => {
            debug!("Using cached dataset ({} recordings)", dataset.len());
            dataset
        }
        None => loader.load()?,
    };
    Ok(cache.insert(dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use preprocessor_common::{Error, ExtractionParams};
    use tempfile::TempDir;

    fn pipeline(dataset: &std::path::Path, output: &std::path::Path) -> Pipeline {
        let config = PipelineConfig::new(dataset, output, ExtractionParams::default()).unwrap();
        Pipeline::new(config)
    }

    #[test]
    fn test_new_pipeline_is_idle() {
        let temp_dir = TempDir::new().unwrap();
        let p = pipeline(temp_dir.path(), temp_dir.path());
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(!p.is_cached());
        assert!(p.skipped().is_empty());
    }

    #[test]
    fn test_empty_dataset_halts_in_loaded() {
        let dataset = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let mut p = pipeline(dataset.path(), output.path());

        let report = p.run(FeatureKind::Mfccs).unwrap();
        assert_eq!(report.state, PipelineState::Loaded);
        assert_eq!(report.processed, 0);
        assert!(report.written.is_empty());
        assert!(p.is_cached());
    }

    #[test]
    fn test_missing_output_fails_before_loading() {
        let dataset = TempDir::new().unwrap();
        let mut p = pipeline(dataset.path(), &dataset.path().join("out"));

        assert!(matches!(p.run(FeatureKind::Mfccs), Err(Error::DirectoryNotFound(_))));
        assert!(!p.is_cached());
        assert_eq!(p.state(), PipelineState::Idle);
    }

    #[test]
    fn test_invalidate_returns_to_idle() {
        let temp_dir = TempDir::new().unwrap();
        let mut p = pipeline(temp_dir.path(), temp_dir.path());

        p.load().unwrap();
        assert_eq!(p.state(), PipelineState::Loaded);
        assert!(p.is_cached());

        p.invalidate();
        assert_eq!(p.state(), PipelineState::Idle);
        assert!(!p.is_cached());
    }

    #[test]
    fn test_streaming_leaves_cache_empty() {
        let dataset = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let mut p = pipeline(dataset.path(), output.path());

        p.run_streaming(FeatureKind::MelSpectrograms).unwrap();
        assert!(!p.is_cached());
    }
}

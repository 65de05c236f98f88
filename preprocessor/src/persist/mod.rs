//! Feature persistence
//!
//! One `.npy` file per feature matrix, named `<stem>_<kind>.npy` after the
//! source recording carried by the matrix itself.

use crate::services::file_scanner::ensure_directory;
use crate::types::{FeatureKind, FeatureMatrix};
use ndarray::Array2;
use ndarray_npy::{ReadNpyError, ReadNpyExt, WriteNpyError, WriteNpyExt};
use preprocessor_common::{Error, PipelineConfig, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// File extension of saved feature arrays
pub const EXTENSION: &str = "npy";

/// A matrix that could not be written
#[derive(Debug)]
pub struct WriteFailure {
    /// Source stem of the matrix
    pub source: String,
    /// Intended output file
    pub path: PathBuf,
    pub error: Error,
}

/// Outcome of [`Persister::save`]
#[derive(Debug)]
pub struct SaveReport {
    pub kind: FeatureKind,
    /// Files written, in input order
    pub written: Vec<PathBuf>,
    pub failed: Vec<WriteFailure>,
}

impl SaveReport {
    fn new(kind: FeatureKind) -> Self {
        Self {
            kind,
            written: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Writes feature matrices into one output directory
pub struct Persister {
    output_path: PathBuf,
}

impl Persister {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.output_path())
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Fail unless the output directory exists
    pub fn ensure_output_dir(&self) -> Result<()> {
        ensure_directory(&self.output_path)
    }

    /// Destination of `matrix`
    pub fn path_for(&self, matrix: &FeatureMatrix) -> PathBuf {
        self.output_path.join(matrix.file_name())
    }

    /// Write one matrix, replacing any existing file.
    ///
    /// Data goes to a temporary sibling first and is renamed into place, so
    /// an interrupted write never leaves a truncated feature file behind.
    pub fn save_one(&self, matrix: &FeatureMatrix) -> Result<PathBuf> {
        let path = self.path_for(matrix);
        let tmp_path = path.with_extension(format!("{}.tmp", EXTENSION));

        let write = || -> io::Result<()> {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            matrix.data.write_npy(&mut writer).map_err(npy_write_error)?;
            writer.flush()?;
            fs::rename(&tmp_path, &path)
        };

        if let Err(source) = write() {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::Write { path, source });
        }

        tracing::debug!(path = %path.display(), shape = ?matrix.data.dim(), "Saved feature file");
        Ok(path)
    }

    /// Write every matrix tagged `kind`.
    ///
    /// Each failure is recorded per file; a failure never stops the
    /// remaining writes.
    pub fn save(&self, matrices: &[FeatureMatrix], kind: FeatureKind) -> SaveReport {
        let mut session = self.session(kind);
        for matrix in matrices {
            session.write(matrix);
        }
        session.finish()
    }

    /// Start an incremental save of `kind` matrices
    pub fn session(&self, kind: FeatureKind) -> SaveSession<'_> {
        SaveSession {
            persister: self,
            seen: HashSet::new(),
            report: SaveReport::new(kind),
        }
    }
}

/// Incremental writer shared by batch and streaming runs
///
/// Matrices of another kind and repeated source names are rejected rather
/// than written under a misleading name.
pub struct SaveSession<'a> {
    persister: &'a Persister,
    seen: HashSet<String>,
    report: SaveReport,
}

impl SaveSession<'_> {
    /// Write one matrix; returns whether it was saved
    pub fn write(&mut self, matrix: &FeatureMatrix) -> bool {
        let kind = self.report.kind;
        let path = self.persister.path_for(matrix);

        let outcome = if matrix.kind != kind {
            Err(Error::Format(format!(
                "{} holds {} features, expected {}",
                matrix.source, matrix.kind, kind
            )))
        } else if !self.seen.insert(matrix.source.clone()) {
            Err(Error::Format(format!(
                "duplicate source name '{}' would overwrite {}",
                matrix.source,
                path.display()
            )))
        } else {
            self.persister.save_one(matrix)
        };

        match outcome {
            Ok(path) => {
                self.report.written.push(path);
                true
            }
            Err(e) => {
                error!(path = %path.display(), "Failed to save features: {}", e);
                self.report.failed.push(WriteFailure {
                    source: matrix.source.clone(),
                    path,
                    error: e,
                });
                false
            }
        }
    }

    /// Log the summary line and hand back the report
    pub fn finish(self) -> SaveReport {
        info!(
            "Saved {} {} file(s) to {} ({} failed)",
            self.report.written.len(),
            self.report.kind,
            self.persister.output_path.display(),
            self.report.failed.len()
        );
        self.report
    }
}

/// Read a saved feature file back
///
/// Accepts any 2-D little-endian float32 `.npy` file in C or Fortran order.
pub fn load_feature(path: &Path) -> Result<Array2<f32>> {
    let file = File::open(path)?;
    Array2::<f32>::read_npy(BufReader::new(file)).map_err(|e| match e {
        ReadNpyError::Io(err) => Error::Io(err),
        other => Error::Format(format!("{}: {}", path.display(), other)),
    })
}

fn npy_write_error(e: WriteNpyError) -> io::Error {
    match e {
        WriteNpyError::Io(err) => err,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    fn matrix(source: &str, kind: FeatureKind) -> FeatureMatrix {
        FeatureMatrix::new(source, kind, array![[0.5f32, -1.25], [3.0, 4.5]])
    }

    #[test]
    fn test_missing_output_dir() {
        let persister = Persister::new("/nonexistent/output");
        assert!(matches!(
            persister.ensure_output_dir(),
            Err(Error::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_save_names_files_by_source() {
        let temp_dir = TempDir::new().unwrap();
        let persister = Persister::new(temp_dir.path());

        let report = persister.save(&[matrix("song", FeatureKind::Mfccs)], FeatureKind::Mfccs);
        assert!(report.is_success());
        assert_eq!(report.written, vec![temp_dir.path().join("song_mfccs.npy")]);
        assert!(!temp_dir.path().join("song_mfccs.npy.tmp").exists());
    }

    #[test]
    fn test_kind_mismatch_is_reported_per_file() {
        let temp_dir = TempDir::new().unwrap();
        let persister = Persister::new(temp_dir.path());

        let report = persister.save(
            &[
                matrix("a", FeatureKind::Mfccs),
                matrix("b", FeatureKind::MelSpectrograms),
            ],
            FeatureKind::Mfccs,
        );

        assert_eq!(report.written.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].source, "b");
        assert!(!temp_dir.path().join("b_melspectrograms.npy").exists());
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let persister = Persister::new(temp_dir.path());

        let report = persister.save(
            &[matrix("dup", FeatureKind::Mfccs), matrix("dup", FeatureKind::Mfccs)],
            FeatureKind::Mfccs,
        );
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.failed.len(), 1);
    }

    #[test]
    fn test_write_into_missing_dir_is_write_failure() {
        let temp_dir = TempDir::new().unwrap();
        let persister = Persister::new(temp_dir.path().join("gone"));

        let report = persister.save(&[matrix("x", FeatureKind::Mfccs)], FeatureKind::Mfccs);
        assert!(!report.is_success());
        assert!(matches!(report.failed[0].error, Error::Write { .. }));
    }
}

//! Dataset directory scanner
//!
//! Enumerates the top level of a dataset directory in file-name order and
//! splits entries into accepted WAV files and skipped files.

use crate::types::{SkipReason, SkippedFile};
use preprocessor_common::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Extension of the only accepted waveform container
pub const WAVE_EXTENSION: &str = "wav";

/// Scan result
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Accepted files, sorted by file name
    pub files: Vec<PathBuf>,
    /// Files excluded from the run, in enumeration order
    pub skipped: Vec<SkippedFile>,
}

/// Dataset file scanner
pub struct FileScanner {
    ignore_patterns: Vec<String>,
}

impl FileScanner {
    /// Create new file scanner with default ignore patterns
    ///
    /// Only the listed system files are ignored silently. Other dot-files are
    /// classified like any entry.
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![".DS_Store".to_string(), "Thumbs.db".to_string()],
        }
    }

    /// Scan `root_path` for WAV files.
    ///
    /// Fails when the directory itself is missing or unreadable. Individual
    /// unreadable or unsupported entries are skipped with a warning.
    pub fn scan(&self, root_path: &Path) -> Result<ScanResult> {
        ensure_directory(root_path)?;

        let walker = WalkDir::new(root_path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        let mut result = ScanResult::default();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    // The root itself could not be listed
                    return Err(Error::Io(e.into()));
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || self.is_ignored(&entry) {
                continue;
            }

            let path = entry.into_path();
            match self.classify(&path) {
                Ok(()) => result.files.push(path),
                Err(reason) => {
                    tracing::warn!(path = %path.display(), "Skipping file: {}", reason);
                    result.skipped.push(SkippedFile { path, reason });
                }
            }
        }

        tracing::debug!(
            "Scan complete: {} accepted, {} skipped in {}",
            result.files.len(),
            result.skipped.len(),
            root_path.display()
        );

        Ok(result)
    }

    /// Check if entry is a known system file
    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        self.ignore_patterns.iter().any(|p| file_name == p.as_str())
    }

    /// Accept a file or name the reason it is skipped
    fn classify(&self, path: &Path) -> std::result::Result<(), SkipReason> {
        let is_wave_extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(WAVE_EXTENSION))
            .unwrap_or(false);

        if !is_wave_extension {
            return Err(SkipReason::UnsupportedFileType);
        }

        match verify_magic_bytes(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(SkipReason::NotWaveContainer),
            Err(e) => Err(SkipReason::DecodeFailed(e.to_string())),
        }
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail with `DirectoryNotFound` or `NotADirectory` unless `path` is a directory
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::DirectoryNotFound(path.to_path_buf()));
    }

    if !path.is_dir() {
        return Err(Error::NotADirectory(path.to_path_buf()));
    }

    Ok(())
}

/// Verify the RIFF/WAVE header
fn verify_magic_bytes(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;

    let mut buffer = [0u8; 12];
    let mut filled = 0;
    while filled < buffer.len() {
        let n = file.read(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    Ok(filled == buffer.len() && &buffer[0..4] == b"RIFF" && &buffer[8..12] == b"WAVE")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fake_wav(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut bytes = b"RIFF\x24\x00\x00\x00WAVE".to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_scan_nonexistent_path() {
        let scanner = FileScanner::new();
        match scanner.scan(Path::new("/nonexistent/path")) {
            Err(Error::DirectoryNotFound(p)) => assert_eq!(p, PathBuf::from("/nonexistent/path")),
            other => panic!("Expected DirectoryNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_file_as_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = fake_wav(temp_dir.path(), "a.wav");

        let result = FileScanner::new().scan(&file);
        assert!(matches!(result, Err(Error::NotADirectory(_))));
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new().scan(temp_dir.path()).unwrap();
        assert!(result.files.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_files_sorted_by_name() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["c.wav", "a.wav", "b.WAV"] {
            fake_wav(temp_dir.path(), name);
        }

        let result = FileScanner::new().scan(temp_dir.path()).unwrap();
        let names: Vec<_> = result
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.wav", "b.WAV", "c.wav"]);
    }

    #[test]
    fn test_unsupported_and_fake_files_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fake_wav(temp_dir.path(), "good.wav");
        fs::write(temp_dir.path().join("notes.txt"), b"hello").unwrap();
        fs::write(temp_dir.path().join("fake.wav"), b"ID3\x03 not a wave file").unwrap();
        fs::write(temp_dir.path().join(".DS_Store"), b"junk").unwrap();
        fs::create_dir(temp_dir.path().join("nested.wav")).unwrap();

        let result = FileScanner::new().scan(temp_dir.path()).unwrap();

        assert_eq!(result.files.len(), 1);
        assert!(result.files[0].ends_with("good.wav"));

        assert_eq!(result.skipped.len(), 2);
        assert!(result.skipped[0].path.ends_with("fake.wav"));
        assert_eq!(result.skipped[0].reason, SkipReason::NotWaveContainer);
        assert!(result.skipped[1].path.ends_with("notes.txt"));
        assert_eq!(result.skipped[1].reason, SkipReason::UnsupportedFileType);
    }

    #[test]
    fn test_subdirectories_not_descended() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("more");
        fs::create_dir(&nested).unwrap();
        fake_wav(&nested, "deep.wav");

        let result = FileScanner::new().scan(temp_dir.path()).unwrap();
        assert!(result.files.is_empty());
    }

    #[test]
    fn test_dot_named_files_are_classified() {
        let temp_dir = TempDir::new().unwrap();
        fake_wav(temp_dir.path(), ".take1.wav");
        fake_wav(temp_dir.path(), "take2.wav");
        fs::write(temp_dir.path().join("._take2.wav"), b"\x00\x05\x16\x07 resource fork").unwrap();

        let result = FileScanner::new().scan(temp_dir.path()).unwrap();

        assert_eq!(result.files.len(), 2);
        assert!(result.files[0].ends_with(".take1.wav"));
        assert!(result.files[1].ends_with("take2.wav"));

        assert_eq!(result.skipped.len(), 1);
        assert!(result.skipped[0].path.ends_with("._take2.wav"));
        assert_eq!(result.skipped[0].reason, SkipReason::NotWaveContainer);
    }
}

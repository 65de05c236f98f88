//! Dataset enumeration and loading

pub mod audio_loader;
pub mod file_scanner;

pub use audio_loader::{AudioLoader, LoadedDataset, WaveformStream};
pub use file_scanner::{FileScanner, ScanResult};

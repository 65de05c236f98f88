//! Audio Test Fixture Generator
//!
//! Writes 16-bit PCM WAV recordings with hound for loader and pipeline tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Tone frequency in Hz
    pub frequency: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.0,
            sample_rate: 22050,
            channels: 1,
            frequency: 440.0,
        }
    }
}

/// Generate a sine-tone WAV file at 30% amplitude
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_samples = (config.duration_seconds * config.sample_rate as f64) as usize;

    for i in 0..total_samples {
        let t = i as f32 / config.sample_rate as f32;
        let sample =
            (0.3 * (2.0 * std::f32::consts::PI * config.frequency * t).sin() * i16::MAX as f32) as i16;

        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Generate `count` recordings named `recording_001.wav`, `recording_002.wav`, ...
///
/// Each file gets a different tone so outputs are distinguishable.
pub fn generate_test_library(
    dir: &Path,
    count: usize,
    config: &AudioConfig,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for i in 0..count {
        let file_path = dir.join(format!("recording_{:03}.wav", i + 1));
        let config = AudioConfig {
            frequency: config.frequency * (i + 1) as f32,
            ..config.clone()
        };
        generate_test_wav(&file_path, &config)?;
        files.push(file_path);
    }

    Ok(files)
}

/// Read a 16-bit WAV with hound, averaging channels, scaled to [-1.0, 1.0)
pub fn read_wav_mono(path: &Path) -> anyhow::Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)?;
    let channels = reader.spec().channels as usize;

    let samples: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / 32768.0))
        .collect::<Result<_, _>>()?;

    Ok(samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect())
}

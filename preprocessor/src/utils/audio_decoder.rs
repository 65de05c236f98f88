//! Audio Decoding Utilities
//!
//! Decode a WAV file to mono f32 PCM at its native sample rate.
//! Uses symphonia for container parsing and sample conversion.

use preprocessor_common::{Error, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
}

/// Decode audio file to mono f32 PCM samples
///
/// **Algorithm:**
/// 1. Open file and detect the container format using symphonia
/// 2. Find default audio track
/// 3. Decode all packets to PCM samples
/// 4. Convert multi-channel to mono (average channels)
///
/// # Errors
/// * `Error::Decode` for I/O, format detection or codec failures, tagged with the path
pub fn decode_audio_file(file_path: &Path) -> Result<DecodedAudio> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let decode_err = |message: String| Error::Decode {
        path: file_path.to_path_buf(),
        message,
    };

    let file = std::fs::File::open(file_path)
        .map_err(|e| decode_err(format!("Failed to open audio file: {}", e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let detected = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_err(format!("Failed to detect audio format: {}", e)))?;

    let mut format = detected.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_err("No audio track found in file".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_err("Sample rate unknown".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .ok_or_else(|| decode_err("Channels unknown".to_string()))?;

    tracing::debug!(
        path = %file_path.display(),
        sample_rate = sample_rate,
        channels = channels,
        "Audio file info"
    );

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(format!("Failed to create decoder: {}", e)))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_err(format!("Error reading packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => all_samples.extend(convert_to_mono_f32(decoded)),
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packet: drop it and keep going
                tracing::warn!(path = %file_path.display(), "Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(decode_err(format!("Failed to decode packet: {}", e))),
        }
    }

    tracing::debug!(
        path = %file_path.display(),
        total_samples = all_samples.len(),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples: all_samples,
        sample_rate,
        channels,
    })
}

/// Convert audio buffer to mono f32 samples by averaging channels
fn convert_to_mono_f32(decoded: AudioBufferRef<'_>) -> Vec<f32> {
    match decoded {
        AudioBufferRef::U8(buf) => mix_to_mono(&buf),
        AudioBufferRef::U16(buf) => mix_to_mono(&buf),
        AudioBufferRef::U24(buf) => mix_to_mono(&buf),
        AudioBufferRef::U32(buf) => mix_to_mono(&buf),
        AudioBufferRef::S8(buf) => mix_to_mono(&buf),
        AudioBufferRef::S16(buf) => mix_to_mono(&buf),
        AudioBufferRef::S24(buf) => mix_to_mono(&buf),
        AudioBufferRef::S32(buf) => mix_to_mono(&buf),
        AudioBufferRef::F32(buf) => mix_to_mono(&buf),
        AudioBufferRef::F64(buf) => mix_to_mono(&buf),
    }
}

fn mix_to_mono<S: Sample>(buf: &AudioBuffer<S>) -> Vec<f32>
where
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();

    if num_channels == 1 {
        return buf.chan(0).iter().map(|&s| f32::from_sample(s)).collect();
    }

    let mut mono = vec![0.0f32; num_frames];
    for ch in 0..num_channels {
        for (acc, &s) in mono.iter_mut().zip(buf.chan(ch)) {
            *acc += f32::from_sample(s);
        }
    }
    let scale = 1.0 / num_channels as f32;
    mono.iter_mut().for_each(|s| *s *= scale);
    mono
}

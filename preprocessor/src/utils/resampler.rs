//! Mono sample rate conversion using rubato
//!
//! Every waveform entering feature extraction is brought to the configured
//! sample rate so frame counts depend only on duration.

use preprocessor_common::{Error, Result};
use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};
use tracing::debug;

/// Number of output samples produced for `input_len` samples at the given rates
pub fn resampled_len(input_len: usize, input_rate: u32, output_rate: u32) -> usize {
    (input_len as f64 * output_rate as f64 / input_rate as f64).ceil() as usize
}

/// Resample mono samples from `input_rate` to `output_rate`.
///
/// Returns a copy when the rates already match. The output length is
/// always [`resampled_len`], and output sample `j` is aligned with input
/// time `j * input_rate / output_rate`.
///
/// # Algorithm
/// - Sinc interpolation with BlackmanHarris2 window
/// - 256-tap filter, 0.95 cutoff to prevent aliasing
/// - Whole signal processed as a single chunk, then the filter tail is flushed
pub fn resample_mono(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == output_rate {
        debug!("Sample rate already at {}Hz, skipping resample", output_rate);
        return Ok(input.to_vec());
    }

    if input.is_empty() {
        return Ok(Vec::new());
    }

    if input_rate == 0 || output_rate == 0 {
        return Err(Error::Resample(format!(
            "Invalid sample rates: {}Hz -> {}Hz",
            input_rate, output_rate
        )));
    }

    debug!("Resampling from {}Hz to {}Hz", input_rate, output_rate);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = output_rate as f64 / input_rate as f64;
    let expected_len = resampled_len(input.len(), input_rate, output_rate);

    // SincFixedIn emits its k-th sample at input time (k + 1) / ratio. Leading
    // silence spanning a whole number of output periods moves sample 0 onto
    // input time 0; the extra leading outputs are dropped below.
    let divisor = gcd(input_rate, output_rate);
    let lead_in = (input_rate / divisor) as usize;
    let skip = (output_rate / divisor) as usize - 1;

    let mut padded = vec![0.0f32; lead_in];
    padded.extend_from_slice(input);

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, padded.len(), 1)
        .map_err(|e| Error::Resample(format!("Failed to create resampler: {}", e)))?;

    // rubato expects planar input, one Vec per channel
    let input_channels = vec![padded];

    let mut output = resampler
        .process(&input_channels, None)
        .map_err(|e| Error::Resample(format!("Resampling failed: {}", e)))?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Samples still inside the filter window come out when zeros are fed in
    while output.len() < skip + expected_len {
        let tail = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| Error::Resample(format!("Resampler flush failed: {}", e)))?
            .into_iter()
            .next()
            .unwrap_or_default();
        if tail.is_empty() {
            break;
        }
        output.extend(tail);
    }

    output.drain(..skip.min(output.len()));
    output.truncate(expected_len);
    output.resize(expected_len, 0.0);

    debug!(
        "Resampled {} frames ({}Hz) to {} frames ({}Hz)",
        input.len(),
        input_rate,
        output.len(),
        output_rate
    );

    Ok(output)
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

//! Mel filterbank construction (Slaney mel scale, area-normalised)

use ndarray::Array2;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Hz to mel: linear below 1 kHz, logarithmic above
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Inverse of [`hz_to_mel`]
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// `n` frequencies evenly spaced on the mel scale between `fmin` and `fmax`
fn mel_frequencies(n: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let denom = n.saturating_sub(1).max(1) as f64;
    (0..n)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / denom))
        .collect()
}

/// Triangular mel filterbank, shaped (`n_mels` × `n_fft / 2 + 1`).
///
/// Filters span `fmin..fmax` Hz; each triangle is scaled by
/// `2 / (upper_edge - lower_edge)` so every band has equal area.
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Array2<f32> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;

    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| nyquist * k as f64 / (n_bins - 1).max(1) as f64)
        .collect();

    let mel_f = mel_frequencies(n_mels + 2, fmin, fmax);
    let fdiff: Vec<f64> = mel_f.windows(2).map(|w| w[1] - w[0]).collect();

    let mut weights = Array2::<f32>::zeros((n_mels, n_bins));

    for m in 0..n_mels {
        let enorm = 2.0 / (mel_f[m + 2] - mel_f[m]);

        for (k, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - mel_f[m]) / fdiff[m];
            let upper = (mel_f[m + 2] - freq) / fdiff[m + 1];
            let w = lower.min(upper).max(0.0);
            weights[[m, k]] = (w * enorm) as f32;
        }
    }

    weights
}

//! Short-time Fourier transform

use ndarray::Array2;
use preprocessor_common::PadMode;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Edge handling of the analysis frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Centering {
    /// Frames start at sample 0; trailing samples that do not fill a window are dropped
    Disabled,
    /// Signal padded by `n_fft / 2` on both sides so frame `t` is centred on `t * hop`
    Centered(PadMode),
}

/// Power STFT with a periodic Hann window of length `n_fft`
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);

        Self {
            n_fft,
            hop_length,
            window: hann_window(n_fft),
            fft,
        }
    }

    /// Number of frequency bins per frame (`n_fft / 2 + 1`)
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frames produced for a signal of `len` samples
    pub fn frame_count(&self, len: usize, centering: Centering) -> usize {
        if len == 0 {
            return 0;
        }

        let padded_len = match centering {
            Centering::Disabled => len,
            Centering::Centered(_) => len + 2 * (self.n_fft / 2),
        };

        if padded_len < self.n_fft {
            0
        } else {
            1 + (padded_len - self.n_fft) / self.hop_length
        }
    }

    /// `|STFT|²`, shaped (`n_bins` × frames)
    pub fn power_spectrogram(&self, samples: &[f32], centering: Centering) -> Array2<f32> {
        let n_frames = self.frame_count(samples.len(), centering);
        let mut spectrogram = Array2::<f32>::zeros((self.n_bins(), n_frames));

        if n_frames == 0 {
            return spectrogram;
        }

        let padded;
        let signal: &[f32] = match centering {
            Centering::Disabled => samples,
            Centering::Centered(mode) => {
                padded = pad_both_sides(samples, self.n_fft / 2, mode);
                &padded
            }
        };

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for t in 0..n_frames {
            let start = t * self.hop_length;
            let frame = &signal[start..start + self.n_fft];

            for ((slot, &sample), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(sample * w, 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (k, bin) in buffer.iter().take(self.n_bins()).enumerate() {
                spectrogram[[k, t]] = bin.norm_sqr();
            }
        }

        spectrogram
    }
}

/// Periodic Hann window (suitable for spectral analysis)
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / size as f32).cos())
        .collect()
}

fn pad_both_sides(samples: &[f32], pad: usize, mode: PadMode) -> Vec<f32> {
    let len = samples.len();
    let mut padded = Vec::with_capacity(len + 2 * pad);

    match mode {
        PadMode::Constant => {
            padded.resize(pad, 0.0);
            padded.extend_from_slice(samples);
            padded.resize(len + 2 * pad, 0.0);
        }
        PadMode::Reflect => {
            let pad = pad as isize;
            let total = len as isize;
            padded.extend((-pad..total + pad).map(|i| samples[reflect_index(i, len)]));
        }
    }

    padded
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge sample
fn reflect_index(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }

    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}

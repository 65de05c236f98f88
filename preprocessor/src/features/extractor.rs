//! Feature extractor
//!
//! Maps one waveform to one feature matrix. Filterbanks and the DCT basis
//! depend only on configuration and are built once per extractor.

use crate::features::mel::mel_filterbank;
use crate::features::mfcc::{dct_ii_basis, power_to_db};
use crate::features::stft::{Centering, Stft};
use crate::types::{FeatureKind, FeatureMatrix, Waveform};
use ndarray::Array2;
use preprocessor_common::{Error, ExtractionParams, Result};
use tracing::debug;

/// Cepstral and mel-spectrogram extraction for one parameter set
pub struct FeatureExtractor {
    params: ExtractionParams,
    stft: Stft,
    /// (`mel_bands` × bins)
    mel_basis: Array2<f32>,
    /// (`cepstral_mel_bands` × bins)
    cepstral_mel_basis: Array2<f32>,
    /// (`n_mfcc` × `cepstral_mel_bands`)
    dct_basis: Array2<f32>,
}

impl FeatureExtractor {
    /// Build an extractor; parameters must already be validated
    pub fn new(params: &ExtractionParams) -> Self {
        let nyquist = params.sample_rate as f64 / 2.0;

        Self {
            params: params.clone(),
            stft: Stft::new(params.n_fft, params.hop_length),
            mel_basis: mel_filterbank(params.sample_rate, params.n_fft, params.mel_bands, 0.0, nyquist),
            cepstral_mel_basis: mel_filterbank(
                params.sample_rate,
                params.n_fft,
                params.cepstral_mel_bands,
                0.0,
                nyquist,
            ),
            dct_basis: dct_ii_basis(params.n_mfcc, params.cepstral_mel_bands),
        }
    }

    /// Cepstral coefficients, shaped (`n_mfcc` × `1 + len / hop`)
    ///
    /// Centred power STFT → mel filterbank → dB → orthonormal DCT-II.
    pub fn extract_cepstral(&self, waveform: &Waveform) -> Result<FeatureMatrix> {
        self.check_rate(waveform)?;

        let power = self.stft.power_spectrogram(
            &waveform.samples,
            Centering::Centered(self.params.center_pad_mode),
        );
        let log_mel = power_to_db(&self.cepstral_mel_basis.dot(&power));
        let coefficients = self.dct_basis.dot(&log_mel);

        debug!(
            file = %waveform.name,
            shape = ?coefficients.dim(),
            "Extracted cepstral coefficients"
        );

        Ok(FeatureMatrix::new(&waveform.name, FeatureKind::Mfccs, coefficients))
    }

    /// Mel power spectrogram, shaped (`mel_bands` × `1 + (len - n_fft) / hop`)
    ///
    /// Frames are not centred: edge frames that would need padding are dropped.
    pub fn extract_melspectrogram(&self, waveform: &Waveform) -> Result<FeatureMatrix> {
        self.check_rate(waveform)?;

        let power = self.stft.power_spectrogram(&waveform.samples, Centering::Disabled);
        let mel = self.mel_basis.dot(&power);

        debug!(
            file = %waveform.name,
            shape = ?mel.dim(),
            "Extracted mel spectrogram"
        );

        Ok(FeatureMatrix::new(&waveform.name, FeatureKind::MelSpectrograms, mel))
    }

    /// Dispatch on `kind`
    pub fn extract(&self, kind: FeatureKind, waveform: &Waveform) -> Result<FeatureMatrix> {
        match kind {
            FeatureKind::Mfccs => self.extract_cepstral(waveform),
            FeatureKind::MelSpectrograms => self.extract_melspectrogram(waveform),
        }
    }

    /// Extract every waveform, preserving order
    pub fn extract_all(&self, kind: FeatureKind, waveforms: &[Waveform]) -> Result<Vec<FeatureMatrix>> {
        waveforms.iter().map(|w| self.extract(kind, w)).collect()
    }

    fn check_rate(&self, waveform: &Waveform) -> Result<()> {
        if waveform.sample_rate != self.params.sample_rate {
            return Err(Error::Config(format!(
                "{} is sampled at {}Hz but the extractor expects {}Hz",
                waveform.name, waveform.sample_rate, self.params.sample_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use std::path::Path;

    fn tone(seconds: f32, sample_rate: u32) -> Waveform {
        let n = (seconds * sample_rate as f32) as usize;
        let samples = (0..n)
            .map(|i| 0.3 * (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin())
            .collect();
        Waveform::new(Path::new("tone.wav"), samples, sample_rate)
    }

    #[test]
    fn test_cepstral_shape() {
        let extractor = FeatureExtractor::new(&ExtractionParams::default());
        let wf = tone(1.0, 22050);

        let m = extractor.extract_cepstral(&wf).unwrap();
        assert_eq!(m.kind, FeatureKind::Mfccs);
        assert_eq!(m.source, "tone");
        assert_eq!(m.data.dim(), (13, 1 + 22050 / 512));
        assert!(m.data.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_melspectrogram_shape() {
        let extractor = FeatureExtractor::new(&ExtractionParams::default());
        let wf = tone(1.0, 22050);

        let m = extractor.extract_melspectrogram(&wf).unwrap();
        assert_eq!(m.kind, FeatureKind::MelSpectrograms);
        assert_eq!(m.data.dim(), (10, 1 + (22050 - 2048) / 512));
        assert!(m.data.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_uncentred_has_fewer_frames_than_centred() {
        let extractor = FeatureExtractor::new(&ExtractionParams::default());
        let wf = tone(0.5, 22050);

        let cepstral = extractor.extract_cepstral(&wf).unwrap();
        let mel = extractor.extract_melspectrogram(&wf).unwrap();
        assert!(mel.frames() < cepstral.frames());
    }

    #[test]
    fn test_short_waveform_keeps_band_axis() {
        let extractor = FeatureExtractor::new(&ExtractionParams::default());
        let wf = Waveform::new(Path::new("blip.wav"), vec![0.1; 100], 22050);

        let mel = extractor.extract_melspectrogram(&wf).unwrap();
        assert_eq!(mel.data.dim(), (10, 0));

        let cepstral = extractor.extract_cepstral(&wf).unwrap();
        assert_eq!(cepstral.data.dim(), (13, 1));
    }

    #[test]
    fn test_tone_energy_lands_in_low_mel_band() {
        let extractor = FeatureExtractor::new(&ExtractionParams::default());
        let m = extractor.extract_melspectrogram(&tone(1.0, 22050)).unwrap();

        // 440 Hz with 10 bands up to 11025 Hz sits in the first or second band
        let column = m.data.column(0);
        let peak = column
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(k, _)| k)
            .unwrap();
        assert!(peak <= 1, "peak band {}", peak);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::new(&ExtractionParams::default());
        let wf = tone(0.3, 22050);
        assert_eq!(
            extractor.extract_cepstral(&wf).unwrap(),
            extractor.extract_cepstral(&wf).unwrap()
        );
    }

    #[test]
    fn test_sample_rate_mismatch_rejected() {
        let extractor = FeatureExtractor::new(&ExtractionParams::default());
        let wf = tone(0.1, 16000);
        assert!(matches!(extractor.extract_cepstral(&wf), Err(Error::Config(_))));
    }

    // Reference values follow librosa's defaults (Slaney mel, periodic Hann,
    // power 2.0, no normalisation of the STFT).

    #[test]
    fn test_melspectrogram_matches_reference_for_bin_centred_cosine() {
        // 0.5 * cos at exactly FFT bin 93 (1001.29 Hz): |X| is N/8 at bin 93
        // and N/16 at bins 92 and 94, zero elsewhere.
        let n_fft = 2048;
        let samples = (0..n_fft)
            .map(|i| (0.5 * (2.0 * std::f64::consts::PI * 93.0 * i as f64 / n_fft as f64).cos()) as f32)
            .collect();
        let wf = Waveform::new(Path::new("cosine.wav"), samples, 22050);

        let extractor = FeatureExtractor::new(&ExtractionParams::default());
        let m = extractor.extract_melspectrogram(&wf).unwrap();
        assert_eq!(m.data.dim(), (10, 1));

        let expected = [0.0, 0.0, 222.093_59, 69.954_71, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        for (band, (&got, &want)) in m.data.column(0).iter().zip(&expected).enumerate() {
            let tolerance = if want == 0.0 { 1e-3 } else { want * 1e-3 };
            assert!(
                (got - want).abs() < tolerance,
                "band {}: got {}, expected {}",
                band,
                got,
                want
            );
        }
    }

    #[test]
    fn test_cepstral_of_silence_matches_reference() {
        // Silence floors at 10 * log10(1e-10) = -100 dB in all 128 bands, so
        // only c0 = -100 * sqrt(128) survives the orthonormal DCT.
        let wf = Waveform::new(Path::new("silence.wav"), vec![0.0; 22050], 22050);

        let extractor = FeatureExtractor::new(&ExtractionParams::default());
        let m = extractor.extract_cepstral(&wf).unwrap();
        assert_eq!(m.data.dim(), (13, 44));

        for column in m.data.columns() {
            assert!((column[0] + 1131.370_8).abs() < 1e-2, "c0 = {}", column[0]);
            for &c in column.iter().skip(1) {
                assert!(c.abs() < 1e-2, "higher coefficient {}", c);
            }
        }
    }
}

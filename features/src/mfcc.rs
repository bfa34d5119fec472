//! Cepstral coefficients from mono PCM.

use crate::fft::PowerSpectrum;
use crate::mel::{dct_matrix, hamming_window, mel_filter_bank};
use crate::FeatureConfig;

/// Log-energy floor applied before the dB conversion.
const ENERGY_FLOOR: f64 = 1e-10;

/// Precomputed MFCC analysis state: window, filterbank and DCT basis.
///
/// Built once per configuration and shared read-only across threads.
#[derive(Debug, Clone)]
pub struct Mfcc {
    frame_length: usize,
    frame_shift: usize,
    fft_size: usize,
    pre_emphasis: f64,
    window: Vec<f64>,
    filterbank: Vec<Vec<f64>>,
    dct: Vec<Vec<f64>>,
}

impl Mfcc {
    pub fn new(cfg: &FeatureConfig) -> Self {
        Self {
            frame_length: cfg.frame_length,
            frame_shift: cfg.frame_shift,
            fft_size: cfg.fft_size,
            pre_emphasis: cfg.pre_emphasis,
            window: hamming_window(cfg.frame_length),
            filterbank: mel_filter_bank(
                cfg.num_mels,
                cfg.fft_size,
                cfg.sample_rate,
                cfg.low_freq,
                cfg.high_freq,
            ),
            dct: dct_matrix(cfg.num_coefficients, cfg.num_mels),
        }
    }

    /// Number of whole frames that fit in `num_samples`.
    pub fn num_frames(&self, num_samples: usize) -> usize {
        if num_samples < self.frame_length {
            0
        } else {
            (num_samples - self.frame_length) / self.frame_shift + 1
        }
    }

    pub fn num_coefficients(&self) -> usize {
        self.dct.len()
    }

    /// Power spectra of the windowed, pre-emphasized frames,
    /// `[frames][fft_size / 2 + 1]`.
    pub fn power_frames(&self, samples: &[f32]) -> Vec<Vec<f64>> {
        let num_frames = self.num_frames(samples.len());
        let mut ps = PowerSpectrum::new(self.fft_size);
        let mut frame = vec![0.0f64; self.frame_length];

        (0..num_frames)
            .map(|f| {
                let offset = f * self.frame_shift;
                let raw = &samples[offset..offset + self.frame_length];

                // Pre-emphasis uses the preceding sample of the signal so
                // overlapping frames see the same filtered values.
                for (i, v) in frame.iter_mut().enumerate() {
                    let prev = if offset + i == 0 {
                        0.0
                    } else {
                        samples[offset + i - 1] as f64
                    };
                    *v = (raw[i] as f64 - self.pre_emphasis * prev) * self.window[i];
                }

                let mut power = vec![0.0f64; ps.bins()];
                ps.compute(&frame, &mut power);
                power
            })
            .collect()
    }

    /// Cepstral coefficients of one power spectrum.
    pub fn mfcc_from_power(&self, power: &[f64]) -> Vec<f32> {
        let log_mel: Vec<f64> = self
            .filterbank
            .iter()
            .map(|filter| {
                let energy: f64 = filter.iter().zip(power).map(|(w, p)| w * p).sum();
                10.0 * energy.max(ENERGY_FLOOR).log10()
            })
            .collect();

        self.dct
            .iter()
            .map(|row| row.iter().zip(&log_mel).map(|(d, e)| d * e).sum::<f64>() as f32)
            .collect()
    }

    /// Computes `[frames][num_coefficients]` MFCCs.
    pub fn compute(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.power_frames(samples)
            .iter()
            .map(|p| self.mfcc_from_power(p))
            .collect()
    }
}

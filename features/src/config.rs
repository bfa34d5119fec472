use serde::{Deserialize, Serialize};

use crate::FeatureError;

/// Configures feature extraction.
///
/// Defaults: 16 kHz working rate, 20 dB trim threshold, 25 ms Hamming frames
/// every 10 ms, 512-point FFT, 40 mel bands over 20-7600 Hz, 20 cepstral
/// coefficients, delta regression half-width 4.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Working sample rate in Hz (default: 16000).
    pub sample_rate: u32,
    /// Silence trim threshold below the loudest frame, in dB (default: 20).
    pub top_db: f32,
    /// Minimum voiced samples after trimming (default: 1024).
    pub min_samples: usize,
    /// Minimum feature frames (default: 4).
    pub min_frames: usize,
    /// Cepstral coefficients kept per frame (default: 20).
    pub num_coefficients: usize,
    /// Mel filterbank channels (default: 40).
    pub num_mels: usize,
    /// Analysis frame length in samples (default: 400 = 25ms @ 16kHz).
    pub frame_length: usize,
    /// Frame shift in samples (default: 160 = 10ms @ 16kHz).
    pub frame_shift: usize,
    /// FFT size, a power of two not smaller than the frame (default: 512).
    pub fft_size: usize,
    /// Pre-emphasis coefficient, 0 disables (default: 0.97).
    pub pre_emphasis: f64,
    /// Lowest mel filter edge in Hz (default: 20).
    pub low_freq: f64,
    /// Highest mel filter edge in Hz (default: 7600).
    pub high_freq: f64,
    /// Delta regression half-width in frames (default: 4).
    pub delta_width: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            top_db: 20.0,
            min_samples: 1024,
            min_frames: 4,
            num_coefficients: 20,
            num_mels: 40,
            frame_length: 400,
            frame_shift: 160,
            fft_size: 512,
            pre_emphasis: 0.97,
            low_freq: 20.0,
            high_freq: 7600.0,
            delta_width: 4,
        }
    }
}

impl FeatureConfig {
    /// Width of one stacked feature frame: coefficients, deltas and
    /// delta-deltas.
    pub fn dim(&self) -> usize {
        3 * self.num_coefficients
    }

    /// Checks that the configuration describes a computable pipeline.
    pub fn validate(&self) -> Result<(), FeatureError> {
        let fail = |msg: String| Err(FeatureError::Config(msg));
        if self.sample_rate == 0 {
            return fail("sample_rate must be positive".into());
        }
        if self.frame_length == 0 || self.frame_shift == 0 {
            return fail("frame_length and frame_shift must be positive".into());
        }
        if !self.fft_size.is_power_of_two() || self.fft_size < self.frame_length {
            return fail(format!(
                "fft_size {} must be a power of two >= frame_length {}",
                self.fft_size, self.frame_length
            ));
        }
        if self.num_mels == 0 {
            return fail("num_mels must be positive".into());
        }
        if self.num_coefficients == 0 || self.num_coefficients > self.num_mels {
            return fail(format!(
                "num_coefficients {} must be in 1..={}",
                self.num_coefficients, self.num_mels
            ));
        }
        let nyquist = self.sample_rate as f64 / 2.0;
        if !(self.low_freq >= 0.0 && self.low_freq < self.high_freq && self.high_freq <= nyquist)
        {
            return fail(format!(
                "mel range {}..{} Hz must lie within 0..{nyquist} Hz",
                self.low_freq, self.high_freq
            ));
        }
        if self.delta_width == 0 {
            return fail("delta_width must be positive".into());
        }
        if !(0.0..1.0).contains(&self.pre_emphasis) {
            return fail(format!("pre_emphasis {} must be in [0, 1)", self.pre_emphasis));
        }
        if self.min_frames == 0 {
            return fail("min_frames must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = FeatureConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.dim(), 60);
    }

    #[test]
    fn test_thirteen_coefficients() {
        let cfg = FeatureConfig {
            num_coefficients: 13,
            ..Default::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.dim(), 39);
    }

    #[test]
    fn test_rejects_bad_fft_size() {
        let cfg = FeatureConfig {
            fft_size: 300,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(FeatureError::Config(_))));
    }

    #[test]
    fn test_rejects_mel_range_above_nyquist() {
        let cfg = FeatureConfig {
            high_freq: 9000.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}

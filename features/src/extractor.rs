use std::path::Path;

use tracing::debug;
use voxgate_audio::{decode_file, trim_silence, TrimConfig, Waveform};

use crate::delta::deltas;
use crate::mfcc::Mfcc;
use crate::{FeatureConfig, FeatureError, FeatureSequence};

/// Turns waveforms into channel-mean-normalized MFCC + Δ + ΔΔ sequences.
///
/// Pipeline: resample to the working rate, trim leading/trailing silence,
/// check the voiced length, compute MFCCs, append regression deltas and
/// delta-deltas, then subtract the per-channel mean over the sequence.
///
/// An `Extractor` owns all precomputed analysis tables and is `Send + Sync`.
#[derive(Debug, Clone)]
pub struct Extractor {
    cfg: FeatureConfig,
    trim: TrimConfig,
    mfcc: Mfcc,
}

impl Extractor {
    /// Creates an extractor after validating `cfg`.
    pub fn new(cfg: FeatureConfig) -> Result<Self, FeatureError> {
        cfg.validate()?;
        let trim = TrimConfig {
            top_db: cfg.top_db,
            ..TrimConfig::default()
        };
        let mfcc = Mfcc::new(&cfg);
        Ok(Self { cfg, trim, mfcc })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    pub(crate) fn mfcc(&self) -> &Mfcc {
        &self.mfcc
    }

    /// Width of each output frame.
    pub fn dim(&self) -> usize {
        self.cfg.dim()
    }

    /// Decodes and extracts an audio file.
    pub fn extract_file(&self, path: &Path) -> Result<FeatureSequence, FeatureError> {
        let wave = decode_file(path)?;
        let seq = self.extract(wave)?;
        debug!(path = %path.display(), frames = seq.len(), "extracted features");
        Ok(seq)
    }

    /// Extracts features from a waveform at any sample rate.
    pub fn extract(&self, wave: Waveform) -> Result<FeatureSequence, FeatureError> {
        let wave = wave.resample(self.cfg.sample_rate)?;
        let voiced = trim_silence(wave.samples(), &self.trim);
        if voiced.len() < self.cfg.min_samples {
            return Err(FeatureError::TooShortOrSilent {
                samples: voiced.len(),
                min: self.cfg.min_samples,
            });
        }
        self.extract_voiced(voiced)
    }

    /// Extracts features from already-trimmed samples at the working rate.
    pub fn extract_voiced(&self, samples: &[f32]) -> Result<FeatureSequence, FeatureError> {
        let coeffs = self.mfcc.compute(samples);
        if coeffs.len() < self.cfg.min_frames {
            return Err(FeatureError::TooFewFrames {
                frames: coeffs.len(),
                min: self.cfg.min_frames,
            });
        }

        let d1 = deltas(&coeffs, self.cfg.delta_width);
        let d2 = deltas(&d1, self.cfg.delta_width);

        let dim = self.dim();
        let mut data = Vec::with_capacity(coeffs.len() * dim);
        for ((c, a), b) in coeffs.iter().zip(&d1).zip(&d2) {
            data.extend_from_slice(c);
            data.extend_from_slice(a);
            data.extend_from_slice(b);
        }

        let mut seq = FeatureSequence::new(dim, data)?;
        seq.subtract_column_means();
        if !seq.is_finite() {
            return Err(FeatureError::NumericDegenerate);
        }
        Ok(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn voiced(n: usize, rate: u32) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f64 / rate as f64;
                let s = (2.0 * PI * 180.0 * t).sin() + 0.5 * (2.0 * PI * 900.0 * t).sin();
                (s * 0.3) as f32
            })
            .collect()
    }

    fn extractor() -> Extractor {
        Extractor::new(FeatureConfig::default()).unwrap()
    }

    #[test]
    fn test_output_shape_and_normalization() {
        let seq = extractor()
            .extract(Waveform::new(voiced(16000, 16000), 16000))
            .unwrap();
        assert_eq!(seq.dim(), 60);
        assert!(seq.len() >= 90);
        for m in seq.column_means() {
            assert!(m.abs() < 1e-3, "column mean {m}");
        }
    }

    #[test]
    fn test_silence_is_rejected() {
        let err = extractor()
            .extract(Waveform::new(vec![0.0; 32000], 16000))
            .unwrap_err();
        assert!(matches!(err, FeatureError::TooShortOrSilent { samples: 0, .. }));
    }

    #[test]
    fn test_short_signal_is_rejected() {
        let err = extractor()
            .extract(Waveform::new(voiced(800, 16000), 16000))
            .unwrap_err();
        assert!(matches!(err, FeatureError::TooShortOrSilent { .. }));
    }

    #[test]
    fn test_empty_signal_is_rejected() {
        let err = extractor().extract(Waveform::new(vec![], 16000)).unwrap_err();
        assert!(matches!(err, FeatureError::TooShortOrSilent { .. }));
    }

    #[test]
    fn test_too_few_frames() {
        let cfg = FeatureConfig {
            min_frames: 50,
            ..Default::default()
        };
        let err = Extractor::new(cfg)
            .unwrap()
            .extract_voiced(&voiced(2000, 16000))
            .unwrap_err();
        assert!(matches!(err, FeatureError::TooFewFrames { min: 50, .. }));
    }

    #[test]
    fn test_resamples_foreign_rate() {
        let ex = extractor();
        let native = ex.extract(Waveform::new(voiced(16000, 16000), 16000)).unwrap();
        let foreign = ex.extract(Waveform::new(voiced(44100, 44100), 44100)).unwrap();
        assert_eq!(native.dim(), foreign.dim());
        let diff = (native.len() as i64 - foreign.len() as i64).abs();
        assert!(diff <= 2, "{} vs {}", native.len(), foreign.len());
    }

    #[test]
    fn test_thirteen_coefficients() {
        let cfg = FeatureConfig {
            num_coefficients: 13,
            ..Default::default()
        };
        let seq = Extractor::new(cfg)
            .unwrap()
            .extract(Waveform::new(voiced(8000, 16000), 16000))
            .unwrap();
        assert_eq!(seq.dim(), 39);
    }

    #[test]
    fn test_invalid_config() {
        let cfg = FeatureConfig {
            frame_shift: 0,
            ..Default::default()
        };
        assert!(matches!(Extractor::new(cfg), Err(FeatureError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = extractor()
            .extract_file(Path::new("/no/such/file.wav"))
            .unwrap_err();
        assert!(matches!(
            err,
            FeatureError::Audio(voxgate_audio::AudioError::FileNotFound(_))
        ));
    }
}

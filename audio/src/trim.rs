//! Leading/trailing silence removal.
//!
//! Frame RMS is computed on frames centered every `hop_length` samples
//! (zero-padded at the edges). A frame is voiced when its power is within
//! `top_db` decibels of the loudest frame. The returned region spans from the
//! first voiced frame to the end of the last voiced frame.

use std::ops::Range;

/// Power floor below which a signal counts as digital silence.
const AMIN: f64 = 1e-10;

/// Configures silence trimming.
#[derive(Debug, Clone)]
pub struct TrimConfig {
    /// Threshold in decibels below the peak frame (default: 20).
    pub top_db: f32,
    /// Analysis frame length in samples (default: 2048).
    pub frame_length: usize,
    /// Hop between analysis frames in samples (default: 512).
    pub hop_length: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            top_db: 20.0,
            frame_length: 2048,
            hop_length: 512,
        }
    }
}

/// Returns the voiced sub-slice of `samples`. Empty when the whole signal is
/// silent.
pub fn trim_silence<'a>(samples: &'a [f32], cfg: &TrimConfig) -> &'a [f32] {
    &samples[voiced_range(samples, cfg)]
}

/// Returns the sample range kept by [`trim_silence`].
pub fn voiced_range(samples: &[f32], cfg: &TrimConfig) -> Range<usize> {
    let n = samples.len();
    if n == 0 || cfg.hop_length == 0 || cfg.frame_length == 0 {
        return 0..0;
    }

    // Prefix sums of squared samples give O(1) frame energy.
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for &s in samples {
        acc += (s as f64) * (s as f64);
        prefix.push(acc);
    }

    let half = cfg.frame_length / 2;
    let num_frames = 1 + n / cfg.hop_length;
    let power: Vec<f64> = (0..num_frames)
        .map(|f| {
            let center = f * cfg.hop_length;
            let lo = center.saturating_sub(half).min(n);
            let hi = (center + cfg.frame_length - half).min(n);
            (prefix[hi] - prefix[lo]) / cfg.frame_length as f64
        })
        .collect();

    let peak = power.iter().copied().fold(0.0f64, f64::max);
    if peak <= AMIN {
        return 0..0;
    }

    let ref_db = 10.0 * peak.log10();
    let threshold = -(cfg.top_db as f64);
    let voiced = |p: f64| 10.0 * p.max(AMIN).log10() - ref_db > threshold;

    let first = power.iter().position(|&p| voiced(p));
    let last = power.iter().rposition(|&p| voiced(p));
    match (first, last) {
        (Some(first), Some(last)) => {
            let start = (first * cfg.hop_length).min(n);
            let end = ((last + 1) * cfg.hop_length).min(n);
            start..end
        }
        _ => 0..0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * 440.0 * i as f64 / 16000.0).sin() as f32 * amp)
            .collect()
    }

    #[test]
    fn test_empty() {
        assert!(trim_silence(&[], &TrimConfig::default()).is_empty());
    }

    #[test]
    fn test_digital_silence_trims_to_empty() {
        let silence = vec![0.0f32; 16000];
        assert!(trim_silence(&silence, &TrimConfig::default()).is_empty());
    }

    #[test]
    fn test_removes_leading_and_trailing_silence() {
        let mut signal = vec![0.0f32; 8000];
        signal.extend(tone(16000, 0.5));
        signal.extend(vec![0.0f32; 8000]);

        let range = voiced_range(&signal, &TrimConfig::default());
        // Voiced region is 8000..24000; frame granularity allows one frame
        // of slack on either side.
        assert!(range.start >= 8000 - 2048 && range.start <= 8000, "{range:?}");
        assert!(range.end >= 24000 && range.end <= 24000 + 2048, "{range:?}");
    }

    #[test]
    fn test_quiet_tail_below_top_db_is_trimmed() {
        let mut signal = tone(16000, 0.5);
        // 40 dB quieter than the main tone.
        signal.extend(tone(16000, 0.005));
        let trimmed = trim_silence(&signal, &TrimConfig::default());
        assert!(trimmed.len() < 16000 + 2048, "len {}", trimmed.len());
    }

    #[test]
    fn test_fully_voiced_signal_is_kept() {
        let signal = tone(16000, 0.5);
        let range = voiced_range(&signal, &TrimConfig::default());
        assert_eq!(range, 0..16000);
    }
}

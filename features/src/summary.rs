//! Per-file summary statistics and speaker discriminability ranking.
//!
//! [`summarize`] reduces a recording to a fixed-length row of statistics
//! (mean and standard deviation of each raw MFCC, of all deltas, of all
//! delta-deltas, of frame-level spectral descriptors, of octave-band
//! spectral contrast and of the 12-bin chroma). [`rank`] scores
//! each column by how well it separates speakers:
//!
//! ```text
//! discriminability = var(speaker means) / (mean(speaker variances) + 1e-6)
//! ```

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;
use voxgate_audio::Waveform;

use crate::delta::deltas;
use crate::{Extractor, FeatureError};

/// Cumulative magnitude fraction that defines spectral roll-off.
const ROLLOFF_FRACTION: f64 = 0.85;
const POWER_FLOOR: f64 = 1e-10;
const RANK_EPSILON: f64 = 1e-6;

/// Lower edge of the first spectral contrast octave above the DC band.
const CONTRAST_FMIN: f64 = 200.0;
const CONTRAST_BANDS: usize = 6;
/// Fraction of a band's bins averaged for its peak and its valley.
const CONTRAST_QUANTILE: f64 = 0.02;
/// Lowest frequency folded into the chroma (A0).
const CHROMA_FMIN: f64 = 27.5;

/// Frame-level descriptors summarized after the MFCC columns.
const SPECTRAL: [&str; 8] = [
    "spec_centroid",
    "spec_bandwidth",
    "spec_rolloff",
    "spec_contrast",
    "spec_flatness",
    "zcr",
    "rms",
    "chroma",
];

/// One summarized recording.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    /// Speaker label, usually the parent directory name.
    pub speaker: String,
    /// File name.
    pub file: String,
    /// Values in [`column_names`] order.
    pub values: Vec<f64>,
}

/// A column's discriminability score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub feature: String,
    pub score: f64,
}

/// Statistic column names for `num_coefficients` MFCCs.
pub fn column_names(num_coefficients: usize) -> Vec<String> {
    let mut cols = Vec::with_capacity(2 * (num_coefficients + 2 + SPECTRAL.len()));
    let mut push = |name: &str| {
        cols.push(format!("{name}_mean"));
        cols.push(format!("{name}_std"));
    };
    for i in 1..=num_coefficients {
        push(&format!("mfcc_{i}"));
    }
    push("mfcc_delta");
    push("mfcc_delta2");
    for name in SPECTRAL {
        push(name);
    }
    cols
}

/// Computes the summary statistics of one recording.
///
/// The waveform is resampled to the working rate but not trimmed, and the
/// MFCCs are not mean-normalized. Spectral descriptors are taken from the
/// same windowed, pre-emphasized power spectra as the MFCCs.
pub fn summarize(extractor: &Extractor, wave: Waveform) -> Result<Vec<f64>, FeatureError> {
    let cfg = extractor.config();
    let wave = wave.resample(cfg.sample_rate)?;
    let samples = wave.samples();
    let mfcc = extractor.mfcc();
    if mfcc.num_frames(samples.len()) == 0 {
        return Err(FeatureError::TooShortOrSilent {
            samples: samples.len(),
            min: cfg.frame_length,
        });
    }

    let power = mfcc.power_frames(samples);
    let coeffs: Vec<Vec<f32>> = power.iter().map(|p| mfcc.mfcc_from_power(p)).collect();
    let d1 = deltas(&coeffs, cfg.delta_width);
    let d2 = deltas(&d1, cfg.delta_width);

    let mut row = Vec::with_capacity(column_names(cfg.num_coefficients).len());
    let mut push = |(mean, std): (f64, f64)| {
        row.push(mean);
        row.push(std);
    };

    for c in 0..cfg.num_coefficients {
        push(mean_std(coeffs.iter().map(|f| f[c] as f64)));
    }
    push(mean_std(d1.iter().flatten().map(|&v| v as f64)));
    push(mean_std(d2.iter().flatten().map(|&v| v as f64)));

    let bin_hz = cfg.sample_rate as f64 / cfg.fft_size as f64;
    let spectral: Vec<[f64; 4]> = power.iter().map(|p| spectral_shape(p, bin_hz)).collect();
    for k in 0..3 {
        push(mean_std(spectral.iter().map(|s| s[k])));
    }
    let contrast: Vec<f64> = power
        .iter()
        .flat_map(|p| spectral_contrast(p, bin_hz))
        .collect();
    push(mean_std(contrast.into_iter()));
    push(mean_std(spectral.iter().map(|s| s[3])));

    let frames = (0..power.len()).map(|f| {
        let offset = f * cfg.frame_shift;
        &samples[offset..offset + cfg.frame_length]
    });
    let (zcr_frames, rms_frames): (Vec<f64>, Vec<f64>) =
        frames.map(|fr| (zero_crossing_rate(fr), rms(fr))).unzip();
    push(mean_std(zcr_frames.into_iter()));
    push(mean_std(rms_frames.into_iter()));
    push(mean_std(power.iter().flat_map(|p| chroma(p, bin_hz))));

    if row.iter().any(|v| !v.is_finite()) {
        return Err(FeatureError::NumericDegenerate);
    }
    Ok(row)
}

/// Ranks columns by speaker discriminability, best first. Columns whose
/// score is undefined (fewer than two speakers, or no speaker with two
/// recordings) sort last.
pub fn rank(columns: &[String], rows: &[SummaryRow]) -> Vec<Ranking> {
    let mut by_speaker: BTreeMap<&str, Vec<&SummaryRow>> = BTreeMap::new();
    for row in rows {
        by_speaker.entry(row.speaker.as_str()).or_default().push(row);
    }

    let mut ranking: Vec<Ranking> = columns
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let mut speaker_means = Vec::with_capacity(by_speaker.len());
            let mut speaker_vars = Vec::with_capacity(by_speaker.len());
            for group in by_speaker.values() {
                let values: Vec<f64> = group
                    .iter()
                    .filter_map(|r| r.values.get(j).copied())
                    .collect();
                if values.is_empty() {
                    continue;
                }
                speaker_means.push(mean(&values));
                if let Some(v) = sample_variance(&values) {
                    speaker_vars.push(v);
                }
            }
            let score = match sample_variance(&speaker_means) {
                Some(inter) if !speaker_vars.is_empty() => {
                    inter / (mean(&speaker_vars) + RANK_EPSILON)
                }
                _ => f64::NAN,
            };
            Ranking {
                feature: name.clone(),
                score,
            }
        })
        .collect();

    ranking.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.total_cmp(&a.score),
        (x, y) => x.cmp(&y),
    });
    ranking
}

/// Writes rows as CSV with `speaker,file,<columns...>` headers.
pub fn write_csv<W: Write>(mut w: W, columns: &[String], rows: &[SummaryRow]) -> io::Result<()> {
    write!(w, "speaker,file")?;
    for c in columns {
        write!(w, ",{}", csv_field(c))?;
    }
    writeln!(w)?;
    for row in rows {
        write!(w, "{},{}", csv_field(&row.speaker), csv_field(&row.file))?;
        for v in &row.values {
            write!(w, ",{v}")?;
        }
        writeln!(w)?;
    }
    w.flush()
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Centroid, bandwidth, roll-off (Hz) and flatness of one power spectrum.
fn spectral_shape(power: &[f64], bin_hz: f64) -> [f64; 4] {
    let mag: Vec<f64> = power.iter().map(|p| p.sqrt()).collect();
    let total: f64 = mag.iter().sum();

    let (centroid, bandwidth, rolloff) = if total > 0.0 {
        let centroid = mag
            .iter()
            .enumerate()
            .map(|(k, m)| k as f64 * bin_hz * m)
            .sum::<f64>()
            / total;
        let spread = mag
            .iter()
            .enumerate()
            .map(|(k, m)| m * (k as f64 * bin_hz - centroid).powi(2))
            .sum::<f64>()
            / total;
        let target = ROLLOFF_FRACTION * total;
        let mut acc = 0.0;
        let bin = mag
            .iter()
            .position(|m| {
                acc += m;
                acc >= target
            })
            .unwrap_or(mag.len() - 1);
        (centroid, spread.sqrt(), bin as f64 * bin_hz)
    } else {
        (0.0, 0.0, 0.0)
    };

    let floored = power.iter().map(|p| p.max(POWER_FLOOR));
    let n = power.len().max(1) as f64;
    let log_mean = floored.clone().map(f64::ln).sum::<f64>() / n;
    let arith_mean = floored.sum::<f64>() / n;
    let flatness = log_mean.exp() / arith_mean;

    [centroid, bandwidth, rolloff, flatness]
}

/// Peak-to-valley ratio in dB of each octave band of one power spectrum.
///
/// Bands are `[0, 200)`, then octaves from 200 Hz, with the last band
/// extended to Nyquist. Bands that start above Nyquist are dropped.
fn spectral_contrast(power: &[f64], bin_hz: f64) -> Vec<f64> {
    let nyquist = (power.len().saturating_sub(1)) as f64 * bin_hz;
    let mut edges = vec![0.0];
    edges.extend((0..=CONTRAST_BANDS).map(|i| CONTRAST_FMIN * 2f64.powi(i as i32)));

    let mut out = Vec::with_capacity(CONTRAST_BANDS + 1);
    for (b, pair) in edges.windows(2).enumerate() {
        let (lo, hi) = (pair[0], pair[1]);
        if lo > nyquist {
            break;
        }
        let last = b == CONTRAST_BANDS || hi >= nyquist;
        let mut band: Vec<f64> = power
            .iter()
            .enumerate()
            .filter(|(k, _)| {
                let f = *k as f64 * bin_hz;
                f >= lo && (f < hi || last)
            })
            .map(|(_, p)| p.sqrt())
            .collect();
        if band.is_empty() {
            continue;
        }
        band.sort_by(f64::total_cmp);
        let q = ((CONTRAST_QUANTILE * band.len() as f64).round() as usize).clamp(1, band.len());
        let valley = band[..q].iter().sum::<f64>() / q as f64;
        let peak = band[band.len() - q..].iter().sum::<f64>() / q as f64;
        out.push(10.0 * peak.max(POWER_FLOOR).log10() - 10.0 * valley.max(POWER_FLOOR).log10());
        if last {
            break;
        }
    }
    out
}

/// Energy per pitch class (C = 0) of one power spectrum, scaled so the
/// strongest class is 1. A silent spectrum yields all zeros.
fn chroma(power: &[f64], bin_hz: f64) -> [f64; 12] {
    let mut classes = [0.0f64; 12];
    for (k, &p) in power.iter().enumerate() {
        let f = k as f64 * bin_hz;
        if f < CHROMA_FMIN {
            continue;
        }
        let midi = 69.0 + 12.0 * (f / 440.0).log2();
        let class = (midi.round() as i64).rem_euclid(12) as usize;
        classes[class] += p;
    }
    let max = classes.iter().copied().fold(0.0f64, f64::max);
    if max > 0.0 {
        classes.iter_mut().for_each(|c| *c /= max);
    }
    classes
}

fn zero_crossing_rate(frame: &[f32]) -> f64 {
    if frame.len() < 2 {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f64 / frame.len() as f64
}

fn rms(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / frame.len() as f64).sqrt()
}

/// Population mean and standard deviation.
fn mean_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut n, mut sum, mut sum_sq) = (0usize, 0.0f64, 0.0f64);
    for v in values {
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    (mean, var.sqrt())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

/// Unbiased variance; `None` for fewer than two values.
fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeatureConfig;
    use std::f64::consts::PI;

    fn row(speaker: &str, values: Vec<f64>) -> SummaryRow {
        SummaryRow {
            speaker: speaker.into(),
            file: format!("{speaker}.wav"),
            values,
        }
    }

    #[test]
    fn test_column_names() {
        let cols = column_names(20);
        assert_eq!(cols.len(), 2 * (20 + 2 + 8));
        assert_eq!(cols[0], "mfcc_1_mean");
        assert_eq!(cols[1], "mfcc_1_std");
        assert!(cols.contains(&"mfcc_delta2_std".to_string()));
        assert!(cols.contains(&"spec_contrast_mean".to_string()));
        assert_eq!(cols.last().map(String::as_str), Some("chroma_std"));
    }

    #[test]
    fn test_summarize_row_width() {
        let ex = Extractor::new(FeatureConfig::default()).unwrap();
        let samples: Vec<f32> = (0..16000)
            .map(|i| (2.0 * PI * 500.0 * i as f64 / 16000.0).sin() as f32 * 0.5)
            .collect();
        let values = summarize(&ex, Waveform::new(samples, 16000)).unwrap();
        let cols = column_names(20);
        assert_eq!(values.len(), cols.len());

        let rms_mean = values[cols.iter().position(|c| c == "rms_mean").unwrap()];
        assert!((rms_mean - 0.5 / 2f64.sqrt()).abs() < 0.01, "rms {rms_mean}");

        let centroid = values[cols.iter().position(|c| c == "spec_centroid_mean").unwrap()];
        assert!(centroid > 300.0 && centroid < 1500.0, "centroid {centroid}");

        // A pure tone stands far above the floor of its band.
        let contrast = values[cols.iter().position(|c| c == "spec_contrast_mean").unwrap()];
        assert!(contrast > 5.0, "contrast {contrast}");

        let chroma_mean = values[cols.iter().position(|c| c == "chroma_mean").unwrap()];
        assert!(chroma_mean > 0.0 && chroma_mean <= 1.0, "chroma {chroma_mean}");
    }

    #[test]
    fn test_spectral_contrast_of_flat_spectrum_is_zero() {
        // 512-point FFT at 16 kHz: 257 bins, 31.25 Hz apart.
        let c = spectral_contrast(&[1.0; 257], 31.25);
        assert_eq!(c.len(), CONTRAST_BANDS + 1);
        assert!(c.iter().all(|v| v.abs() < 1e-9), "{c:?}");
    }

    #[test]
    fn test_spectral_contrast_sees_a_peak() {
        let mut power = vec![1e-4; 257];
        // 1000 Hz falls in the 800-1600 Hz band.
        power[32] = 1.0;
        let c = spectral_contrast(&power, 31.25);
        assert!(c[3] > 10.0, "{c:?}");
        assert!(c[0].abs() < 1e-9);
    }

    #[test]
    fn test_chroma_folds_octaves_onto_one_class() {
        let mut power = vec![0.0; 257];
        // 437.5 Hz and 875 Hz are both closest to an A.
        power[14] = 1.0;
        power[28] = 0.5;
        let c = chroma(&power, 31.25);
        assert_eq!(c[9], 1.0);
        assert!(c.iter().enumerate().all(|(i, &v)| i == 9 || v == 0.0));

        assert_eq!(chroma(&[0.0; 257], 31.25), [0.0; 12]);
    }

    #[test]
    fn test_summarize_too_short() {
        let ex = Extractor::new(FeatureConfig::default()).unwrap();
        assert!(summarize(&ex, Waveform::new(vec![0.1; 100], 16000)).is_err());
    }

    #[test]
    fn test_rank_prefers_separating_column() {
        let cols = vec!["noise".to_string(), "signal".to_string()];
        let rows = vec![
            row("a", vec![1.0, 10.0]),
            row("a", vec![5.0, 10.1]),
            row("b", vec![2.0, 20.0]),
            row("b", vec![4.0, 20.1]),
        ];
        let ranked = rank(&cols, &rows);
        assert_eq!(ranked[0].feature, "signal");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn test_rank_undefined_sorts_last() {
        let cols = vec!["x".to_string()];
        let rows = vec![row("a", vec![1.0]), row("a", vec![2.0])];
        let ranked = rank(&cols, &rows);
        assert!(ranked[0].score.is_nan());
    }

    #[test]
    fn test_write_csv() {
        let cols = vec!["x".to_string()];
        let rows = vec![row("a,b", vec![1.5])];
        let mut out = Vec::new();
        write_csv(&mut out, &cols, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "speaker,file,x\n\"a,b\",\"a,b.wav\",1.5\n");
    }

    #[test]
    fn test_spectral_shape_of_silence() {
        let s = spectral_shape(&[0.0; 257], 31.25);
        assert_eq!(&s[..3], &[0.0, 0.0, 0.0]);
        assert!((s[3] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_crossing_rate() {
        assert_eq!(zero_crossing_rate(&[1.0, -1.0, 1.0, -1.0]), 0.75);
        assert_eq!(zero_crossing_rate(&[1.0, 1.0]), 0.0);
    }
}

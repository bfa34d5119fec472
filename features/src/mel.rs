//! Window, mel filterbank and DCT matrices.

use std::f64::consts::PI;

/// Generates a symmetric Hamming window of the given length.
pub fn hamming_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Creates the triangular mel filterbank matrix.
///
/// Returns `[num_mels][fft_size / 2 + 1]`. Every filter spans at least one
/// FFT bin on each side of its center.
pub fn mel_filter_bank(
    num_mels: usize,
    fft_size: usize,
    sample_rate: u32,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<f64>> {
    let half_fft = fft_size / 2 + 1;
    let low_mel = hz_to_mel(low_freq);
    let high_mel = hz_to_mel(high_freq);

    let step = (high_mel - low_mel) / (num_mels + 1) as f64;
    let mut bins: Vec<usize> = (0..num_mels + 2)
        .map(|i| {
            let hz = mel_to_hz(low_mel + i as f64 * step);
            let bin = (hz * fft_size as f64 / sample_rate as f64).round() as usize;
            bin.min(half_fft - 1)
        })
        .collect();

    for i in 1..bins.len() {
        if bins[i] <= bins[i - 1] {
            bins[i] = bins[i - 1] + 1;
        }
    }

    (0..num_mels)
        .map(|m| {
            let mut filter = vec![0.0f64; half_fft];
            let (left, center, right) = (bins[m], bins[m + 1], bins[m + 2]);
            for k in left..center.min(half_fft) {
                filter[k] = (k - left) as f64 / (center - left) as f64;
            }
            for k in center..=right.min(half_fft - 1) {
                filter[k] = (right - k) as f64 / (right - center) as f64;
            }
            filter
        })
        .collect()
}

/// Orthonormal DCT-II basis, `[num_coefficients][num_inputs]`.
pub fn dct_matrix(num_coefficients: usize, num_inputs: usize) -> Vec<Vec<f64>> {
    let n = num_inputs as f64;
    (0..num_coefficients)
        .map(|k| {
            let scale = if k == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };
            (0..num_inputs)
                .map(|i| scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_window() {
        let w = hamming_window(400);
        assert_eq!(w.len(), 400);
        for i in 0..200 {
            assert!((w[i] - w[399 - i]).abs() < 1e-10);
        }
        assert!((w[0] - 0.08).abs() < 0.01);
        assert!((w[199] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_hz_mel_roundtrip() {
        for &hz in &[0.0, 100.0, 440.0, 1000.0, 4000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-6, "roundtrip failed for {hz} Hz");
        }
    }

    #[test]
    fn test_mel_filter_bank_shape() {
        let bank = mel_filter_bank(40, 512, 16000, 20.0, 7600.0);
        assert_eq!(bank.len(), 40);
        assert_eq!(bank[0].len(), 257);
        for filter in &bank {
            assert!(filter.iter().all(|&v| v >= 0.0));
            assert!(filter.iter().any(|&v| v > 0.0), "every filter covers a bin");
        }
    }

    #[test]
    fn test_dct_is_orthonormal() {
        let d = dct_matrix(40, 40);
        for a in 0..40 {
            for b in 0..40 {
                let dot: f64 = d[a].iter().zip(&d[b]).map(|(x, y)| x * y).sum();
                let want = if a == b { 1.0 } else { 0.0 };
                assert!((dot - want).abs() < 1e-9, "rows {a},{b}: {dot}");
            }
        }
    }

    #[test]
    fn test_dct_of_constant_is_dc_only() {
        let d = dct_matrix(5, 8);
        let x = [3.0; 8];
        let c: Vec<f64> = d
            .iter()
            .map(|row| row.iter().zip(&x).map(|(a, b)| a * b).sum())
            .collect();
        assert!((c[0] - 3.0 * 8f64.sqrt()).abs() < 1e-9);
        assert!(c[1..].iter().all(|v| v.abs() < 1e-9));
    }
}

//! In-place radix-2 FFT and power spectrum.

use std::f64::consts::PI;

/// Performs an in-place radix-2 Cooley-Tukey FFT.
/// `real` and `imag` must have the same power-of-2 length.
pub fn fft(real: &mut [f64], imag: &mut [f64]) {
    let n = real.len();
    debug_assert_eq!(n, imag.len());
    if n <= 1 {
        return;
    }

    // Bit-reversal permutation
    let mut j = 0usize;
    for i in 0..n - 1 {
        if i < j {
            real.swap(i, j);
            imag.swap(i, j);
        }
        let mut k = n >> 1;
        while k <= j {
            j -= k;
            k >>= 1;
        }
        j += k;
    }

    let mut size = 2;
    while size <= n {
        let half = size >> 1;
        let angle = -2.0 * PI / size as f64;
        let (w_r, w_i) = (angle.cos(), angle.sin());

        for start in (0..n).step_by(size) {
            let (mut t_r, mut t_i) = (1.0, 0.0);
            for k in 0..half {
                let u = start + k;
                let v = u + half;

                let tmp_r = t_r * real[v] - t_i * imag[v];
                let tmp_i = t_r * imag[v] + t_i * real[v];

                real[v] = real[u] - tmp_r;
                imag[v] = imag[u] - tmp_i;
                real[u] += tmp_r;
                imag[u] += tmp_i;

                let next_r = t_r * w_r - t_i * w_i;
                t_i = t_r * w_i + t_i * w_r;
                t_r = next_r;
            }
        }
        size <<= 1;
    }
}

/// Reusable scratch buffers for the power spectrum of real frames.
pub struct PowerSpectrum {
    real: Vec<f64>,
    imag: Vec<f64>,
}

impl PowerSpectrum {
    /// Creates buffers for a power-of-two `fft_size`.
    pub fn new(fft_size: usize) -> Self {
        Self {
            real: vec![0.0; fft_size],
            imag: vec![0.0; fft_size],
        }
    }

    /// Number of non-redundant bins: `fft_size / 2 + 1`.
    pub fn bins(&self) -> usize {
        self.real.len() / 2 + 1
    }

    /// Writes `|X[k]|^2` for the zero-padded `frame` into `out`
    /// (length [`bins`](Self::bins)).
    pub fn compute(&mut self, frame: &[f64], out: &mut [f64]) {
        self.real.fill(0.0);
        self.imag.fill(0.0);
        let n = frame.len().min(self.real.len());
        self.real[..n].copy_from_slice(&frame[..n]);

        fft(&mut self.real, &mut self.imag);

        for (k, o) in out.iter_mut().enumerate().take(self.bins()) {
            *o = self.real[k] * self.real[k] + self.imag[k] * self.imag[k];
        }
    }
}

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;
use voxgate_features::FeatureSequence;

use crate::{AuthError, GmmConfig};

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Lloyd iterations used to seed each EM run.
const KMEANS_ITERS: usize = 10;

/// A diagonal-covariance Gaussian mixture model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "GmmParams", try_from = "GmmParams")]
pub struct DiagGmm {
    dim: usize,
    weights: Vec<f64>,
    /// `components × dim`, row-major.
    means: Vec<f64>,
    /// `components × dim`, row-major.
    variances: Vec<f64>,
    /// `ln w_k − ½(d·ln 2π + Σ ln σ²_kd)` per component.
    log_norm: Vec<f64>,
}

/// Serialized form of [`DiagGmm`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GmmParams {
    dim: usize,
    weights: Vec<f64>,
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl From<DiagGmm> for GmmParams {
    fn from(g: DiagGmm) -> Self {
        Self {
            dim: g.dim,
            weights: g.weights,
            means: g.means,
            variances: g.variances,
        }
    }
}

impl TryFrom<GmmParams> for DiagGmm {
    type Error = String;

    fn try_from(p: GmmParams) -> Result<Self, Self::Error> {
        DiagGmm::from_params(p.dim, p.weights, p.means, p.variances)
            .map_err(|e| e.to_string())
    }
}

impl DiagGmm {
    /// Builds a model from explicit parameters.
    pub fn from_params(
        dim: usize,
        weights: Vec<f64>,
        means: Vec<f64>,
        variances: Vec<f64>,
    ) -> Result<Self, AuthError> {
        let k = weights.len();
        if dim == 0 || k == 0 || means.len() != k * dim || variances.len() != k * dim {
            return Err(AuthError::NumericDegenerate(format!(
                "inconsistent mixture shape: {k} weights, {} means, {} variances, dim {dim}",
                means.len(),
                variances.len()
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0)
            || variances.iter().any(|v| !v.is_finite() || *v <= 0.0)
            || means.iter().any(|m| !m.is_finite())
        {
            return Err(AuthError::NumericDegenerate(
                "mixture parameters must be finite with positive weights and variances".into(),
            ));
        }
        let mut gmm = Self {
            dim,
            weights,
            means,
            variances,
            log_norm: Vec::new(),
        };
        gmm.refresh();
        Ok(gmm)
    }

    /// Fits a mixture with `components` components to the frames of `data`.
    ///
    /// Runs `cfg.n_init` EM fits from different k-means seeds and keeps the
    /// one with the highest mean log-likelihood. `components` is capped at
    /// the number of frames.
    pub fn fit(data: &FeatureSequence, components: usize, cfg: &GmmConfig) -> Result<Self, AuthError> {
        let n = data.len();
        if n == 0 || components == 0 {
            return Err(AuthError::NumericDegenerate(
                "cannot fit a mixture to zero frames".into(),
            ));
        }
        let k = components.min(n);
        let x: Vec<f64> = data.as_slice().iter().map(|&v| v as f64).collect();
        let fitter = Fitter::new(&x, data.dim(), cfg);

        let mut best: Option<(f64, DiagGmm)> = None;
        for run in 0..cfg.n_init.max(1) {
            let seed = cfg.seed.wrapping_add(run as u64);
            match fitter.run(k, seed) {
                Ok((ll, gmm)) => {
                    debug!(run, components = k, frames = n, mean_log_likelihood = ll, "em run finished");
                    if best.as_ref().is_none_or(|(b, _)| ll > *b) {
                        best = Some((ll, gmm));
                    }
                }
                Err(e) => debug!(run, error = %e, "em run discarded"),
            }
        }
        best.map(|(_, g)| g).ok_or_else(|| {
            AuthError::NumericDegenerate("no mixture fit produced a finite likelihood".into())
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn components(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Mean per-frame log-likelihood of `seq`.
    pub fn score(&self, seq: &FeatureSequence) -> Result<f64, AuthError> {
        if seq.dim() != self.dim {
            return Err(AuthError::NumericDegenerate(format!(
                "feature dimension {} does not match model dimension {}",
                seq.dim(),
                self.dim
            )));
        }
        if seq.is_empty() {
            return Err(AuthError::NumericDegenerate("empty feature sequence".into()));
        }
        let mut buf = vec![0.0f64; self.components()];
        let mut total = 0.0;
        for frame in seq.frames() {
            total += self.frame_log_likelihood(frame.iter().map(|&v| v as f64), &mut buf);
        }
        let mean = total / seq.len() as f64;
        if !mean.is_finite() {
            return Err(AuthError::NumericDegenerate("non-finite log-likelihood".into()));
        }
        Ok(mean)
    }

    /// Fills `out[k]` with the joint log density of component k and returns
    /// the frame log-likelihood.
    fn frame_log_likelihood<I>(&self, frame: I, out: &mut [f64]) -> f64
    where
        I: Iterator<Item = f64> + Clone,
    {
        for (c, o) in out.iter_mut().enumerate() {
            let mu = &self.means[c * self.dim..(c + 1) * self.dim];
            let var = &self.variances[c * self.dim..(c + 1) * self.dim];
            let maha: f64 = frame
                .clone()
                .zip(mu.iter().zip(var))
                .map(|(x, (m, v))| (x - m) * (x - m) / v)
                .sum();
            *o = self.log_norm[c] - 0.5 * maha;
        }
        log_sum_exp(out)
    }

    fn refresh(&mut self) {
        let d = self.dim;
        self.log_norm = (0..self.components())
            .map(|c| {
                let log_det: f64 = self.variances[c * d..(c + 1) * d].iter().map(|v| v.ln()).sum();
                self.weights[c].ln() - 0.5 * (d as f64 * LN_2PI + log_det)
            })
            .collect();
    }
}

fn log_sum_exp(v: &[f64]) -> f64 {
    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + v.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

/// EM state shared by the initializations of one fit.
struct Fitter<'a> {
    x: &'a [f64],
    n: usize,
    d: usize,
    cfg: &'a GmmConfig,
    global_var: Vec<f64>,
}

impl<'a> Fitter<'a> {
    fn new(x: &'a [f64], d: usize, cfg: &'a GmmConfig) -> Self {
        let n = x.len() / d;
        let mut mean = vec![0.0; d];
        for row in x.chunks_exact(d) {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n as f64);
        let mut global_var = vec![0.0; d];
        for row in x.chunks_exact(d) {
            for ((g, v), m) in global_var.iter_mut().zip(row).zip(&mean) {
                *g += (v - m) * (v - m);
            }
        }
        global_var
            .iter_mut()
            .for_each(|g| *g = *g / n as f64 + cfg.reg_covar);
        Self {
            x,
            n,
            d,
            cfg,
            global_var,
        }
    }

    fn row(&self, i: usize) -> &[f64] {
        &self.x[i * self.d..(i + 1) * self.d]
    }

    /// One initialization: k-means seeding followed by EM. Returns the final
    /// mean log-likelihood and the model.
    fn run(&self, k: usize, seed: u64) -> Result<(f64, DiagGmm), AuthError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let labels = self.kmeans(k, &mut rng);

        // Hard responsibilities from k-means.
        let mut resp = vec![0.0f64; self.n * k];
        for (i, &l) in labels.iter().enumerate() {
            resp[i * k + l] = 1.0;
        }
        let mut gmm = self.m_step(&resp, k, &mut rng)?;

        let mut prev = f64::NEG_INFINITY;
        for iter in 0..self.cfg.max_iter {
            let ll = self.checked_e_step(&gmm, &mut resp, k)?;
            if (ll - prev).abs() < self.cfg.tol {
                debug!(iter, "em converged");
                return Ok((ll, gmm));
            }
            prev = ll;
            gmm = self.m_step(&resp, k, &mut rng)?;
        }
        let ll = self.checked_e_step(&gmm, &mut resp, k)?;
        Ok((ll, gmm))
    }

    fn kmeans(&self, k: usize, rng: &mut StdRng) -> Vec<usize> {
        let d = self.d;
        let mut centers: Vec<f64> = index::sample(rng, self.n, k.min(self.n))
            .into_iter()
            .flat_map(|i| self.row(i).to_vec())
            .collect();
        let mut labels = vec![0usize; self.n];

        for _ in 0..KMEANS_ITERS {
            let mut changed = false;
            for (i, label) in labels.iter_mut().enumerate() {
                let row = self.row(i);
                let nearest = (0..k)
                    .map(|c| {
                        let center = &centers[c * d..(c + 1) * d];
                        let dist: f64 = row.iter().zip(center).map(|(a, b)| (a - b) * (a - b)).sum();
                        (c, dist)
                    })
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map_or(0, |(c, _)| c);
                if *label != nearest {
                    *label = nearest;
                    changed = true;
                }
            }

            let mut sums = vec![0.0f64; k * d];
            let mut counts = vec![0usize; k];
            for (i, &l) in labels.iter().enumerate() {
                counts[l] += 1;
                for (s, v) in sums[l * d..(l + 1) * d].iter_mut().zip(self.row(i)) {
                    *s += v;
                }
            }
            for c in 0..k {
                if counts[c] > 0 {
                    for j in 0..d {
                        centers[c * d + j] = sums[c * d + j] / counts[c] as f64;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        labels
    }

    fn checked_e_step(&self, gmm: &DiagGmm, resp: &mut [f64], k: usize) -> Result<f64, AuthError> {
        let ll = self.e_step(gmm, resp, k);
        if ll.is_finite() {
            Ok(ll)
        } else {
            Err(AuthError::NumericDegenerate(
                "non-finite log-likelihood during EM".into(),
            ))
        }
    }

    /// Computes responsibilities in place and returns the mean
    /// log-likelihood.
    fn e_step(&self, gmm: &DiagGmm, resp: &mut [f64], k: usize) -> f64 {
        let mut total = 0.0;
        for i in 0..self.n {
            let r = &mut resp[i * k..(i + 1) * k];
            let lse = gmm.frame_log_likelihood(self.row(i).iter().copied(), r);
            for v in r.iter_mut() {
                *v = (*v - lse).exp();
            }
            total += lse;
        }
        total / self.n as f64
    }

    /// Re-estimates weights, means and floored variances. Components that
    /// lost all responsibility are re-seeded on a random frame.
    fn m_step(&self, resp: &[f64], k: usize, rng: &mut StdRng) -> Result<DiagGmm, AuthError> {
        let (n, d) = (self.n, self.d);
        let mut nk = vec![0.0f64; k];
        let mut means = vec![0.0f64; k * d];
        for i in 0..n {
            let row = self.row(i);
            for c in 0..k {
                let r = resp[i * k + c];
                if r == 0.0 {
                    continue;
                }
                nk[c] += r;
                for (m, v) in means[c * d..(c + 1) * d].iter_mut().zip(row) {
                    *m += r * v;
                }
            }
        }

        let floor = 10.0 * f64::EPSILON;
        let mut variances = vec![0.0f64; k * d];
        let mut empty = Vec::new();
        for c in 0..k {
            if nk[c] < floor {
                empty.push(c);
                continue;
            }
            for m in &mut means[c * d..(c + 1) * d] {
                *m /= nk[c];
            }
        }
        for i in 0..n {
            let row = self.row(i);
            for c in 0..k {
                let r = resp[i * k + c];
                if r == 0.0 || nk[c] < floor {
                    continue;
                }
                let mu = &means[c * d..(c + 1) * d];
                for ((s, v), m) in variances[c * d..(c + 1) * d].iter_mut().zip(row).zip(mu) {
                    *s += r * (v - m) * (v - m);
                }
            }
        }
        for c in 0..k {
            if nk[c] < floor {
                continue;
            }
            for s in &mut variances[c * d..(c + 1) * d] {
                *s = *s / nk[c] + self.cfg.reg_covar;
            }
        }

        for &c in &empty {
            let i = rng.gen_range(0..n);
            means[c * d..(c + 1) * d].copy_from_slice(self.row(i));
            variances[c * d..(c + 1) * d].copy_from_slice(&self.global_var);
            nk[c] = 1.0;
        }
        if !empty.is_empty() {
            debug!(count = empty.len(), "re-seeded empty mixture components");
        }

        let total: f64 = nk.iter().sum();
        let weights = nk.iter().map(|w| w / total).collect();
        DiagGmm::from_params(d, weights, means, variances)
    }
}

use voxgate_features::FeatureSequence;

use crate::AuthError;

/// Result of aligning two sequences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Alignment {
    /// Sum of per-cell Euclidean distances along the optimal path.
    pub cost: f64,
    /// Number of cells on the optimal path.
    pub path_len: usize,
}

impl Alignment {
    /// Path-length-normalized cost.
    pub fn normalized(&self) -> f64 {
        self.cost / self.path_len as f64
    }
}

/// Aligns `a` and `b` with steps (i-1, j), (i, j-1) and (i-1, j-1) and a
/// Euclidean frame distance.
///
/// With `band = Some(w)`, cells farther than `max(w, |len(a) - len(b)|)`
/// from the diagonal are excluded.
pub fn align(
    a: &FeatureSequence,
    b: &FeatureSequence,
    band: Option<usize>,
) -> Result<Alignment, AuthError> {
    if a.is_empty() || b.is_empty() {
        return Err(AuthError::NumericDegenerate(
            "cannot align an empty sequence".into(),
        ));
    }
    if a.dim() != b.dim() {
        return Err(AuthError::NumericDegenerate(format!(
            "cannot align sequences of dimension {} and {}",
            a.dim(),
            b.dim()
        )));
    }

    let (n, m) = (a.len(), b.len());
    let window = band.map(|w| w.max(n.abs_diff(m)));
    let cols = m + 1;
    let mut acc = vec![f64::INFINITY; (n + 1) * cols];
    acc[0] = 0.0;

    for i in 1..=n {
        let (lo, hi) = match window {
            Some(w) => (i.saturating_sub(w).max(1), (i + w).min(m)),
            None => (1, m),
        };
        let fa = a.frame(i - 1);
        for j in lo..=hi {
            let cost = euclidean(fa, b.frame(j - 1));
            let best = acc[(i - 1) * cols + j]
                .min(acc[i * cols + j - 1])
                .min(acc[(i - 1) * cols + j - 1]);
            acc[i * cols + j] = cost + best;
        }
    }

    let cost = acc[n * cols + m];
    if !cost.is_finite() {
        return Err(AuthError::NumericDegenerate(
            "no finite alignment path".into(),
        ));
    }

    // Walk back from the end, preferring the diagonal on ties.
    let (mut i, mut j, mut path_len) = (n, m, 1usize);
    while i > 1 || j > 1 {
        let diag = if i > 1 && j > 1 {
            acc[(i - 1) * cols + j - 1]
        } else {
            f64::INFINITY
        };
        let up = if i > 1 { acc[(i - 1) * cols + j] } else { f64::INFINITY };
        let left = if j > 1 { acc[i * cols + j - 1] } else { f64::INFINITY };

        if diag <= up && diag <= left {
            i -= 1;
            j -= 1;
        } else if up <= left {
            i -= 1;
        } else {
            j -= 1;
        }
        path_len += 1;
    }

    Ok(Alignment { cost, path_len })
}

fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

use serde::{Deserialize, Serialize};

use crate::FeatureError;

/// A `frames × dim` matrix of feature vectors, stored row-major.
///
/// Produced by [`Extractor`](crate::Extractor) and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSequence")]
pub struct FeatureSequence {
    dim: usize,
    data: Vec<f32>,
}

#[derive(Deserialize)]
struct RawSequence {
    dim: usize,
    data: Vec<f32>,
}

impl TryFrom<RawSequence> for FeatureSequence {
    type Error = FeatureError;

    fn try_from(raw: RawSequence) -> Result<Self, Self::Error> {
        Self::new(raw.dim, raw.data)
    }
}

impl FeatureSequence {
    /// Builds a sequence from row-major data. `data.len()` must be a multiple
    /// of `dim`.
    pub fn new(dim: usize, data: Vec<f32>) -> Result<Self, FeatureError> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(FeatureError::DimensionMismatch {
                expected: dim,
                got: data.len(),
            });
        }
        Ok(Self { dim, data })
    }

    /// Builds a sequence from individual frames of equal width.
    pub fn from_frames<F: AsRef<[f32]>>(frames: &[F]) -> Result<Self, FeatureError> {
        let dim = frames.first().map_or(0, |f| f.as_ref().len());
        let mut data = Vec::with_capacity(dim * frames.len());
        for f in frames {
            let f = f.as_ref();
            if f.len() != dim {
                return Err(FeatureError::DimensionMismatch {
                    expected: dim,
                    got: f.len(),
                });
            }
            data.extend_from_slice(f);
        }
        Self::new(dim, data)
    }

    /// Stacks the frames of several sequences of equal width.
    pub fn concat<'a, I>(seqs: I) -> Result<Self, FeatureError>
    where
        I: IntoIterator<Item = &'a FeatureSequence>,
    {
        let mut dim = None;
        let mut data = Vec::new();
        for s in seqs {
            match dim {
                None => dim = Some(s.dim),
                Some(d) if d != s.dim => {
                    return Err(FeatureError::DimensionMismatch {
                        expected: d,
                        got: s.dim,
                    });
                }
                Some(_) => {}
            }
            data.extend_from_slice(&s.data);
        }
        Self::new(dim.unwrap_or(0), data)
    }

    /// Width of one frame.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns frame `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    pub fn frame(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Iterates over frames in time order.
    pub fn frames(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.dim)
    }

    /// Raw row-major values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns true if every value is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Per-column mean across all frames.
    pub fn column_means(&self) -> Vec<f64> {
        let mut sums = vec![0.0f64; self.dim];
        for frame in self.frames() {
            for (s, &v) in sums.iter_mut().zip(frame) {
                *s += v as f64;
            }
        }
        let n = self.len().max(1) as f64;
        sums.iter_mut().for_each(|s| *s /= n);
        sums
    }

    /// Subtracts the per-column mean from every frame.
    pub(crate) fn subtract_column_means(&mut self) {
        let means = self.column_means();
        for frame in self.data.chunks_exact_mut(self.dim) {
            for (v, &m) in frame.iter_mut().zip(&means) {
                *v = (*v as f64 - m) as f32;
            }
        }
    }
}

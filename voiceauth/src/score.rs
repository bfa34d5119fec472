use serde::{Deserialize, Serialize};

/// Which direction of a score means a better match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Log-likelihoods and margins: larger is better.
    Higher,
    /// Distances: smaller is better.
    Lower,
}

/// A verification score tagged with its polarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub value: f64,
    pub polarity: Polarity,
}

impl Score {
    pub fn higher(value: f64) -> Self {
        Self {
            value,
            polarity: Polarity::Higher,
        }
    }

    pub fn lower(value: f64) -> Self {
        Self {
            value,
            polarity: Polarity::Lower,
        }
    }

    /// Strict threshold test in the score's own direction. Non-finite
    /// scores never pass.
    pub fn passes(&self, threshold: f64) -> bool {
        if !self.value.is_finite() {
            return false;
        }
        match self.polarity {
            Polarity::Higher => self.value > threshold,
            Polarity::Lower => self.value < threshold,
        }
    }
}

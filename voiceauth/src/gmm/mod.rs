//! Background-margin speaker identification.
//!
//! Every identity gets a diagonal-covariance GMM trained on the pooled frames
//! of its enrollment utterances. One identity is the background model,
//! trained on many non-target speakers with more components. A sequence is
//! scored by the mean per-frame log-likelihood under each model, and an
//! identity's evidence is its margin over the background score.

mod model;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use voxgate_features::FeatureSequence;

pub use model::DiagGmm;

use crate::engine::{EnrollOutcome, Identification, Identifier, Verifier};
use crate::{AuthError, GmmConfig, Polarity, Score};

/// GMM engine holding one model per identity in enrollment order.
pub struct GmmEngine {
    cfg: GmmConfig,
    background: String,
    margin_threshold: f64,
    models: RwLock<Vec<(String, Arc<DiagGmm>)>>,
}

impl GmmEngine {
    pub fn new(cfg: GmmConfig, background: impl Into<String>, margin_threshold: f64) -> Self {
        Self {
            cfg,
            background: background.into(),
            margin_threshold,
            models: RwLock::new(Vec::new()),
        }
    }

    /// Name of the background identity.
    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn margin_threshold(&self) -> f64 {
        self.margin_threshold
    }

    /// Returns the model for `identity`.
    pub fn model(&self, identity: &str) -> Option<Arc<DiagGmm>> {
        self.models
            .read()
            .iter()
            .find(|(name, _)| name == identity)
            .map(|(_, m)| m.clone())
    }

    /// Inserts or replaces a trained model. A replaced identity keeps its
    /// position in enrollment order.
    pub fn install(&self, identity: &str, model: Arc<DiagGmm>) {
        let mut models = self.models.write();
        match models.iter_mut().find(|(name, _)| name == identity) {
            Some(slot) => slot.1 = model,
            None => models.push((identity.to_string(), model)),
        }
    }

    /// Mean per-frame log-likelihood of `seq` under `identity`'s model.
    pub fn score(&self, identity: &str, seq: &FeatureSequence) -> Result<f64, AuthError> {
        let model = self
            .model(identity)
            .ok_or_else(|| AuthError::IdentityNotEnrolled(identity.to_string()))?;
        model.score(seq)
    }

    fn background_score(&self, seq: &FeatureSequence) -> Result<f64, AuthError> {
        let model = self
            .model(&self.background)
            .ok_or_else(|| AuthError::BackgroundModelMissing(self.background.clone()))?;
        model.score(seq)
    }
}

impl Verifier for GmmEngine {
    fn polarity(&self) -> Polarity {
        Polarity::Higher
    }

    fn enroll(
        &self,
        identity: &str,
        sequences: &[Arc<FeatureSequence>],
    ) -> Result<EnrollOutcome, AuthError> {
        if sequences.is_empty() {
            info!(identity, "no usable enrollment audio, model unchanged");
            return Ok(EnrollOutcome::Skipped {
                identity: identity.to_string(),
            });
        }

        let pooled = FeatureSequence::concat(sequences.iter().map(|s| s.as_ref()))?;
        let components = if identity == self.background {
            self.cfg.background_components
        } else {
            self.cfg.components
        };

        // Train outside the lock; readers keep using the previous model.
        let model = DiagGmm::fit(&pooled, components, &self.cfg)?;
        info!(
            identity,
            utterances = sequences.len(),
            frames = pooled.len(),
            components = model.components(),
            "gmm enrolled"
        );
        self.install(identity, Arc::new(model));

        Ok(EnrollOutcome::Enrolled {
            identity: identity.to_string(),
            sequences: sequences.len(),
            frames: pooled.len(),
        })
    }

    /// Margin of `identity` over the background model.
    fn verify(&self, identity: &str, sequence: &FeatureSequence) -> Result<Score, AuthError> {
        let background = self.background_score(sequence)?;
        let score = self.score(identity, sequence)?;
        Ok(Score::higher(score - background))
    }

    fn remove(&self, identity: &str) -> bool {
        let mut models = self.models.write();
        let before = models.len();
        models.retain(|(name, _)| name != identity);
        models.len() != before
    }

    fn identities(&self) -> Vec<String> {
        self.models.read().iter().map(|(n, _)| n.clone()).collect()
    }

    fn contains(&self, identity: &str) -> bool {
        self.models.read().iter().any(|(n, _)| n == identity)
    }
}

impl Identifier for GmmEngine {
    /// Picks the identity with the largest margin over the background model.
    ///
    /// Ties keep the earlier-enrolled identity. The result is accepted only
    /// when the best margin is strictly above the threshold.
    fn identify(&self, sequence: &FeatureSequence) -> Result<Identification, AuthError> {
        let background = self.background_score(sequence)?;

        // Snapshot so scoring runs without holding the lock.
        let candidates: Vec<(String, Arc<DiagGmm>)> = self
            .models
            .read()
            .iter()
            .filter(|(name, _)| *name != self.background)
            .cloned()
            .collect();

        let mut best: Option<String> = None;
        let mut best_margin = f64::NEG_INFINITY;
        for (name, model) in candidates {
            let margin = model.score(sequence)? - background;
            debug!(identity = %name, margin, "gmm margin");
            if best.is_none() || margin > best_margin {
                best = Some(name);
                best_margin = margin;
            }
        }

        let accepted = best.is_some() && best_margin > self.margin_threshold;
        debug!(best = ?best, margin = best_margin, accepted, "gmm identification");
        Ok(Identification {
            best,
            margin: best_margin,
            accepted,
        })
    }
}

//! Template alignment for passphrase verification.
//!
//! Enrollment keeps every utterance's feature sequence verbatim. A claim is
//! scored by aligning it against each template with DTW and taking the
//! smallest path-normalized cost.

mod align;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use voxgate_features::FeatureSequence;

pub use align::{align, Alignment};

use crate::engine::{EnrollOutcome, Verifier};
use crate::{AuthError, Polarity, Score};

/// An identity's enrolled templates.
pub type TemplateGallery = Vec<Arc<FeatureSequence>>;

/// DTW engine holding one template gallery per identity in enrollment
/// order.
pub struct DtwEngine {
    band: Option<usize>,
    galleries: RwLock<Vec<(String, Arc<TemplateGallery>)>>,
}

impl DtwEngine {
    pub fn new(band: Option<usize>) -> Self {
        Self {
            band,
            galleries: RwLock::new(Vec::new()),
        }
    }

    pub fn gallery(&self, identity: &str) -> Option<Arc<TemplateGallery>> {
        self.galleries
            .read()
            .iter()
            .find(|(name, _)| name == identity)
            .map(|(_, g)| g.clone())
    }

    /// Inserts or replaces a gallery, keeping a replaced identity's position.
    pub fn install(&self, identity: &str, gallery: Arc<TemplateGallery>) {
        let mut galleries = self.galleries.write();
        match galleries.iter_mut().find(|(name, _)| name == identity) {
            Some(slot) => slot.1 = gallery,
            None => galleries.push((identity.to_string(), gallery)),
        }
    }

    /// Smallest normalized alignment cost between `seq` and any template of
    /// `identity`.
    pub fn distance(&self, identity: &str, seq: &FeatureSequence) -> Result<f64, AuthError> {
        let gallery = self
            .gallery(identity)
            .ok_or_else(|| AuthError::IdentityNotEnrolled(identity.to_string()))?;

        let mut best = f64::INFINITY;
        for template in gallery.iter() {
            let d = align(template, seq, self.band)?.normalized();
            best = best.min(d);
        }
        debug!(identity, templates = gallery.len(), distance = best, "dtw distance");
        Ok(best)
    }
}

impl Verifier for DtwEngine {
    fn polarity(&self) -> Polarity {
        Polarity::Lower
    }

    fn enroll(
        &self,
        identity: &str,
        sequences: &[Arc<FeatureSequence>],
    ) -> Result<EnrollOutcome, AuthError> {
        if sequences.is_empty() {
            info!(identity, "no usable enrollment audio, gallery unchanged");
            return Ok(EnrollOutcome::Skipped {
                identity: identity.to_string(),
            });
        }
        let frames = sequences.iter().map(|s| s.len()).sum();
        self.install(identity, Arc::new(sequences.to_vec()));
        info!(identity, templates = sequences.len(), frames, "dtw templates stored");
        Ok(EnrollOutcome::Enrolled {
            identity: identity.to_string(),
            sequences: sequences.len(),
            frames,
        })
    }

    fn verify(&self, identity: &str, sequence: &FeatureSequence) -> Result<Score, AuthError> {
        self.distance(identity, sequence).map(Score::lower)
    }

    fn remove(&self, identity: &str) -> bool {
        let mut galleries = self.galleries.write();
        let before = galleries.len();
        galleries.retain(|(name, _)| name != identity);
        galleries.len() != before
    }

    fn identities(&self) -> Vec<String> {
        self.galleries.read().iter().map(|(n, _)| n.clone()).collect()
    }

    fn contains(&self, identity: &str) -> bool {
        self.galleries.read().iter().any(|(n, _)| n == identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq1(values: &[f32]) -> Arc<FeatureSequence> {
        Arc::new(FeatureSequence::new(1, values.to_vec()).unwrap())
    }

    #[test]
    fn test_distance_is_min_over_templates() {
        let engine = DtwEngine::new(None);
        let near = seq1(&[1.0, 2.0, 3.0]);
        let far = seq1(&[9.0, 9.0, 9.0]);
        engine.enroll("alice", &[far.clone(), near.clone()]).unwrap();

        let d = engine.distance("alice", &near).unwrap();
        assert_eq!(d, 0.0);

        let probe = seq1(&[1.5, 2.5, 3.5]);
        let got = engine.distance("alice", &probe).unwrap();
        assert!((got - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_template_order_does_not_matter() {
        let a = seq1(&[0.0, 1.0, 2.0]);
        let b = seq1(&[4.0, 3.0, 2.0, 1.0]);
        let c = seq1(&[2.0, 2.0]);
        let probe = seq1(&[1.0, 1.5, 2.5]);

        let forward = DtwEngine::new(None);
        forward.enroll("x", &[a.clone(), b.clone(), c.clone()]).unwrap();
        let backward = DtwEngine::new(None);
        backward.enroll("x", &[c, b, a]).unwrap();

        assert_eq!(
            forward.distance("x", &probe).unwrap(),
            backward.distance("x", &probe).unwrap()
        );
    }

    #[test]
    fn test_unknown_identity() {
        let engine = DtwEngine::new(None);
        let err = engine.verify("nobody", &seq1(&[1.0])).unwrap_err();
        assert!(matches!(err, AuthError::IdentityNotEnrolled(_)));
    }

    #[test]
    fn test_empty_enrollment_stores_nothing() {
        let engine = DtwEngine::new(None);
        assert!(!engine.enroll("alice", &[]).unwrap().is_enrolled());
        assert!(!engine.contains("alice"));
    }

    #[test]
    fn test_reenroll_replaces_gallery() {
        let engine = DtwEngine::new(Some(10));
        engine.enroll("alice", &[seq1(&[1.0]), seq1(&[2.0])]).unwrap();
        engine.enroll("alice", &[seq1(&[3.0])]).unwrap();
        assert_eq!(engine.gallery("alice").unwrap().len(), 1);
        assert_eq!(engine.verify("alice", &seq1(&[3.0])).unwrap(), Score::lower(0.0));
    }

    #[test]
    fn test_enroll_files_skips_unreadable_files() {
        use crate::engine::FileSource;
        use voxgate_features::{Extractor, FeatureCache, FeatureConfig};

        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.wav");
        let samples: Vec<f32> = (0..8000).map(|i| (i as f32 * 0.05).sin() * 0.4).collect();
        voxgate_audio::write_wav(&good, &voxgate_audio::Waveform::new(samples, 16000)).unwrap();

        let extractor = Extractor::new(FeatureConfig::default()).unwrap();
        let cache = FeatureCache::new();
        let source = FileSource {
            extractor: &extractor,
            cache: &cache,
            workers: 2,
        };
        let engine = DtwEngine::new(None);
        let outcome = engine
            .enroll_files(&source, "alice", &[dir.path().join("missing.wav"), good])
            .unwrap();

        assert!(matches!(outcome, EnrollOutcome::Enrolled { sequences: 1, .. }));
        assert_eq!(engine.gallery("alice").unwrap().len(), 1);
        assert_eq!(cache.len(), 1);
    }
}

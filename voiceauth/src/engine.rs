use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use voxgate_features::{extract_ok, Extractor, FeatureCache, FeatureSequence};

use crate::{AuthError, Polarity, Score};

/// Result of an enrollment call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrollOutcome {
    /// A model or gallery was built from `sequences` utterances totalling
    /// `frames` frames.
    Enrolled {
        identity: String,
        sequences: usize,
        frames: usize,
    },
    /// No usable utterances were supplied; nothing was stored.
    Skipped { identity: String },
}

impl EnrollOutcome {
    pub fn is_enrolled(&self) -> bool {
        matches!(self, EnrollOutcome::Enrolled { .. })
    }
}

/// Outcome of open-set identification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identification {
    /// Best-scoring enrolled identity, whether or not it was accepted.
    pub best: Option<String>,
    /// Margin of `best` over the background model; `-inf` when no identity
    /// was compared.
    pub margin: f64,
    /// True when `margin` cleared the configured threshold.
    pub accepted: bool,
}

impl Identification {
    /// The accepted identity, if any.
    pub fn identity(&self) -> Option<&str> {
        if self.accepted {
            self.best.as_deref()
        } else {
            None
        }
    }
}

/// An engine that can enroll identities and score a claim against one.
///
/// Implementations must be safe for concurrent use; enrollment replaces an
/// identity's data atomically.
pub trait Verifier: Send + Sync {
    /// Direction in which [`verify`](Self::verify) scores improve.
    fn polarity(&self) -> Polarity;

    /// Builds (or replaces) the data for `identity` from `sequences`.
    /// An empty slice is a no-op returning [`EnrollOutcome::Skipped`].
    fn enroll(
        &self,
        identity: &str,
        sequences: &[Arc<FeatureSequence>],
    ) -> Result<EnrollOutcome, AuthError>;

    /// Scores `sequence` against the claimed `identity`.
    fn verify(&self, identity: &str, sequence: &FeatureSequence) -> Result<Score, AuthError>;

    /// Removes `identity`. Returns false when it was not enrolled.
    fn remove(&self, identity: &str) -> bool;

    /// Enrolled identities in enrollment order.
    fn identities(&self) -> Vec<String>;

    fn contains(&self, identity: &str) -> bool {
        self.identities().iter().any(|i| i == identity)
    }

    /// Extracts `paths` through `source` and enrolls the utterances that
    /// succeeded. Files that fail extraction are logged and skipped.
    fn enroll_files(
        &self,
        source: &FileSource<'_>,
        identity: &str,
        paths: &[PathBuf],
    ) -> Result<EnrollOutcome, AuthError> {
        let seqs = source.extract(paths);
        if seqs.len() < paths.len() {
            warn!(
                identity,
                usable = seqs.len(),
                total = paths.len(),
                "some enrollment files were skipped"
            );
        }
        self.enroll(identity, &seqs)
    }
}

/// Where file-based enrollment gets its features.
#[derive(Clone, Copy)]
pub struct FileSource<'a> {
    pub extractor: &'a Extractor,
    pub cache: &'a FeatureCache,
    /// Worker threads; 0 means one per CPU.
    pub workers: usize,
}

impl FileSource<'_> {
    /// Successfully extracted sequences in input order.
    pub fn extract(&self, paths: &[PathBuf]) -> Vec<Arc<FeatureSequence>> {
        extract_ok(self.extractor, self.cache, paths, self.workers)
    }
}

/// An engine that can name the speaker of a sequence.
pub trait Identifier: Send + Sync {
    fn identify(&self, sequence: &FeatureSequence) -> Result<Identification, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_requires_acceptance() {
        let mut id = Identification {
            best: Some("alice".into()),
            margin: 3.0,
            accepted: false,
        };
        assert_eq!(id.identity(), None);
        id.accepted = true;
        assert_eq!(id.identity(), Some("alice"));
    }
}

//! Two-stage authentication decision.
//!
//! ```text
//! identify ──unknown/error──▶ Reject(BiometricMismatch)
//!    │
//!    └─identity─▶ verify passphrase ──pass──▶ Accept(identity)
//!                        │
//!                        └─fail/error──▶ Reject(PassphraseMismatch)
//! ```
//!
//! The passphrase stage always checks the identity returned by the first
//! stage. Both stages score the same feature sequence.

use serde::Serialize;
use tracing::info;
use voxgate_features::FeatureSequence;

use crate::engine::{Identifier, Verifier};
use crate::{AuthError, ErrorKind};

/// First-stage outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Identified {
    Identity(String),
    Unknown,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    BiometricMismatch,
    PassphraseMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Accept { identity: String },
    Reject { reason: RejectReason },
}

/// The error that caused a rejection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AuthError> for Failure {
    fn from(e: &AuthError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Outcome of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticationResult {
    pub identified: Identified,
    /// Best identification margin, when any identity was compared.
    pub margin: Option<f64>,
    /// Passphrase alignment score, when the second stage ran.
    pub distance: Option<f64>,
    #[serde(flatten)]
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl AuthenticationResult {
    /// A rejection caused by an error before or during identification.
    pub fn failed(err: &AuthError) -> Self {
        Self {
            identified: Identified::Error,
            margin: None,
            distance: None,
            decision: Decision::Reject {
                reason: RejectReason::BiometricMismatch,
            },
            failure: Some(err.into()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.decision, Decision::Accept { .. })
    }

    /// The accepted identity.
    pub fn identity(&self) -> Option<&str> {
        match &self.decision {
            Decision::Accept { identity } => Some(identity),
            Decision::Reject { .. } => None,
        }
    }
}

/// Runs identification and passphrase verification over borrowed engines.
pub struct Pipeline<'a, I, V> {
    identifier: &'a I,
    verifier: &'a V,
    threshold: f64,
}

impl<'a, I: Identifier, V: Verifier> Pipeline<'a, I, V> {
    /// `threshold` applies to the verifier's score in its own polarity.
    pub fn new(identifier: &'a I, verifier: &'a V, threshold: f64) -> Self {
        Self {
            identifier,
            verifier,
            threshold,
        }
    }

    pub fn authenticate(&self, seq: &FeatureSequence) -> AuthenticationResult {
        let id = match self.identifier.identify(seq) {
            Ok(id) => id,
            Err(e) => {
                info!(error = %e, "identification failed");
                return AuthenticationResult::failed(&e);
            }
        };
        let margin = id.best.as_ref().map(|_| id.margin);

        let Some(identity) = id.identity().map(str::to_string) else {
            info!(best = ?id.best, margin = id.margin, "speaker not recognized");
            return AuthenticationResult {
                identified: Identified::Unknown,
                margin,
                distance: None,
                decision: Decision::Reject {
                    reason: RejectReason::BiometricMismatch,
                },
                failure: None,
            };
        };

        let reject = |distance, failure| AuthenticationResult {
            identified: Identified::Identity(identity.clone()),
            margin,
            distance,
            decision: Decision::Reject {
                reason: RejectReason::PassphraseMismatch,
            },
            failure,
        };

        match self.verifier.verify(&identity, seq) {
            Ok(score) if score.passes(self.threshold) => {
                info!(identity = %identity, score = score.value, "authenticated");
                AuthenticationResult {
                    identified: Identified::Identity(identity.clone()),
                    margin,
                    distance: Some(score.value),
                    decision: Decision::Accept {
                        identity: identity.clone(),
                    },
                    failure: None,
                }
            }
            Ok(score) => {
                info!(identity = %identity, score = score.value, "passphrase mismatch");
                reject(Some(score.value), None)
            }
            Err(e) => {
                info!(identity = %identity, error = %e, "passphrase verification failed");
                reject(None, Some(Failure::from(&e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::engine::{EnrollOutcome, Identification};
    use crate::{Polarity, Score};

    struct FixedIdentifier(Result<Identification, fn() -> AuthError>);

    impl Identifier for FixedIdentifier {
        fn identify(&self, _: &FeatureSequence) -> Result<Identification, AuthError> {
            self.0.clone().map_err(|f| f())
        }
    }

    /// Records the identity it was asked about.
    struct RecordingVerifier {
        distance: Result<f64, fn() -> AuthError>,
        asked: Mutex<Vec<String>>,
    }

    impl Verifier for RecordingVerifier {
        fn polarity(&self) -> Polarity {
            Polarity::Lower
        }
        fn enroll(
            &self,
            identity: &str,
            _: &[Arc<FeatureSequence>],
        ) -> Result<EnrollOutcome, AuthError> {
            Ok(EnrollOutcome::Skipped {
                identity: identity.into(),
            })
        }
        fn verify(&self, identity: &str, _: &FeatureSequence) -> Result<Score, AuthError> {
            self.asked.lock().push(identity.to_string());
            self.distance.map(Score::lower).map_err(|f| f())
        }
        fn remove(&self, _: &str) -> bool {
            false
        }
        fn identities(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn verifier(distance: Result<f64, fn() -> AuthError>) -> RecordingVerifier {
        RecordingVerifier {
            distance,
            asked: Mutex::new(Vec::new()),
        }
    }

    fn found(name: &str, margin: f64) -> FixedIdentifier {
        FixedIdentifier(Ok(Identification {
            best: Some(name.into()),
            margin,
            accepted: true,
        }))
    }

    fn seq() -> FeatureSequence {
        FeatureSequence::new(1, vec![0.0; 4]).unwrap()
    }

    #[test]
    fn test_accept() {
        let v = verifier(Ok(10.0));
        let r = Pipeline::new(&found("alice", 20.0), &v, 70.0).authenticate(&seq());
        assert_eq!(r.identity(), Some("alice"));
        assert_eq!(r.identified, Identified::Identity("alice".into()));
        assert_eq!(r.margin, Some(20.0));
        assert_eq!(r.distance, Some(10.0));
        assert!(r.failure.is_none());
    }

    #[test]
    fn test_passphrase_checked_for_identified_speaker() {
        let v = verifier(Ok(10.0));
        Pipeline::new(&found("alice", 20.0), &v, 70.0).authenticate(&seq());
        assert_eq!(*v.asked.lock(), vec!["alice".to_string()]);
    }

    #[test]
    fn test_unknown_skips_second_stage() {
        let id = FixedIdentifier(Ok(Identification {
            best: Some("alice".into()),
            margin: 3.0,
            accepted: false,
        }));
        let v = verifier(Ok(0.0));
        let r = Pipeline::new(&id, &v, 70.0).authenticate(&seq());
        assert_eq!(r.identified, Identified::Unknown);
        assert_eq!(
            r.decision,
            Decision::Reject {
                reason: RejectReason::BiometricMismatch
            }
        );
        assert_eq!(r.margin, Some(3.0));
        assert!(v.asked.lock().is_empty());
    }

    #[test]
    fn test_identification_error() {
        let id = FixedIdentifier(Err(|| AuthError::BackgroundModelMissing("background".into())));
        let v = verifier(Ok(0.0));
        let r = Pipeline::new(&id, &v, 70.0).authenticate(&seq());
        assert_eq!(r.identified, Identified::Error);
        assert_eq!(
            r.failure.as_ref().map(|f| f.kind),
            Some(ErrorKind::BackgroundModelMissing)
        );
        assert!(!r.is_accepted());
    }

    #[test]
    fn test_distance_at_threshold_rejects() {
        let v = verifier(Ok(70.0));
        let r = Pipeline::new(&found("alice", 20.0), &v, 70.0).authenticate(&seq());
        assert_eq!(
            r.decision,
            Decision::Reject {
                reason: RejectReason::PassphraseMismatch
            }
        );
        assert_eq!(r.identified, Identified::Identity("alice".into()));
    }

    #[test]
    fn test_verifier_error_is_passphrase_mismatch() {
        let v = verifier(Err(|| AuthError::IdentityNotEnrolled("alice".into())));
        let r = Pipeline::new(&found("alice", 20.0), &v, 70.0).authenticate(&seq());
        assert_eq!(
            r.decision,
            Decision::Reject {
                reason: RejectReason::PassphraseMismatch
            }
        );
        assert_eq!(r.failure.as_ref().map(|f| f.kind), Some(ErrorKind::IdentityNotEnrolled));
    }

    #[test]
    fn test_serializes_flat() {
        let v = verifier(Ok(12.5));
        let r = Pipeline::new(&found("alice", 20.0), &v, 70.0).authenticate(&seq());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["decision"], "accept");
        assert_eq!(json["identity"], "alice");
        assert_eq!(json["distance"], 12.5);
        assert!(json.get("failure").is_none());
    }
}

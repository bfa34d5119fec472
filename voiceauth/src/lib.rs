//! Two-factor voice authentication.
//!
//! A recording is accepted only when both factors agree:
//!
//! 1. **Who is speaking.** [`GmmEngine`] fits a diagonal-covariance Gaussian
//!    mixture per enrolled speaker plus one for a background population, and
//!    identifies a recording by its log-likelihood margin over the
//!    background.
//! 2. **What was said.** [`DtwEngine`] keeps the enrollment utterances as
//!    templates and measures the path-normalized dynamic time warping cost to
//!    the nearest one.
//!
//! [`Pipeline`] chains the two, and [`VoiceAuth`] wraps everything behind a
//! file-level API with optional persistence through [`ModelStore`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use voxgate_voiceauth::{AuthConfig, Engines, VoiceAuth};
//!
//! let auth = VoiceAuth::new(AuthConfig::default())?;
//! let background: Vec<PathBuf> = vec!["bg/1.wav".into(), "bg/2.wav".into()];
//! auth.enroll_files("background", &background, Engines::Gmm)?;
//! auth.enroll_files("alice", &["alice/1.wav".into()], Engines::Both)?;
//!
//! let result = auth.authenticate_file(Path::new("attempt.wav"));
//! println!("accepted: {}", result.is_accepted());
//! # Ok::<(), voxgate_voiceauth::AuthError>(())
//! ```

pub mod calibrate;
mod config;
pub mod dtw;
mod engine;
mod error;
pub mod gmm;
mod pipeline;
mod score;
mod service;
mod store;

pub use config::{AuthConfig, DecisionConfig, DtwConfig, GmmConfig, DEFAULT_BACKGROUND};
pub use dtw::DtwEngine;
pub use engine::{EnrollOutcome, FileSource, Identification, Identifier, Verifier};
pub use error::{AuthError, ErrorKind};
pub use gmm::GmmEngine;
pub use pipeline::{
    AuthenticationResult, Decision, Failure, Identified, Pipeline, RejectReason,
};
pub use score::{Polarity, Score};
pub use service::{Engines, IdentitySummary, VoiceAuth};
pub use store::ModelStore;

pub use voxgate_features::{FeatureConfig, FeatureSequence};

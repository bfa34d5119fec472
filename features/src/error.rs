use thiserror::Error;
use voxgate_audio::AudioError;

/// Errors returned by feature extraction.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("audio too short or silent: {samples} voiced samples, need at least {min}")]
    TooShortOrSilent { samples: usize, min: usize },

    #[error("too few feature frames: got {frames}, need at least {min}")]
    TooFewFrames { frames: usize, min: usize },

    #[error("non-finite value in feature sequence")]
    NumericDegenerate,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid feature config: {0}")]
    Config(String),

    #[error("worker panicked: {0}")]
    WorkerPanic(String),
}

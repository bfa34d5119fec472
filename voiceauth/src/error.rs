use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use voxgate_audio::AudioError;
use voxgate_features::FeatureError;
use voxgate_kv::KVError;

/// Errors returned by enrollment, scoring and persistence.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("audio file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("audio too short or silent: {0}")]
    TooShortOrSilent(String),

    #[error("feature extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("identity not enrolled: {0}")]
    IdentityNotEnrolled(String),

    #[error("background model {0:?} is not enrolled")]
    BackgroundModelMissing(String),

    #[error("numeric failure: {0}")]
    NumericDegenerate(String),

    #[error("model store: {0}")]
    Store(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Stable, serializable classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    UnsupportedFormat,
    TooShortOrSilent,
    ExtractionFailure,
    IdentityNotEnrolled,
    BackgroundModelMissing,
    NumericDegenerate,
    Store,
    Config,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::FileNotFound(_) => ErrorKind::FileNotFound,
            AuthError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            AuthError::TooShortOrSilent(_) => ErrorKind::TooShortOrSilent,
            AuthError::ExtractionFailure(_) => ErrorKind::ExtractionFailure,
            AuthError::IdentityNotEnrolled(_) => ErrorKind::IdentityNotEnrolled,
            AuthError::BackgroundModelMissing(_) => ErrorKind::BackgroundModelMissing,
            AuthError::NumericDegenerate(_) => ErrorKind::NumericDegenerate,
            AuthError::Store(_) => ErrorKind::Store,
            AuthError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<AudioError> for AuthError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::FileNotFound(p) => AuthError::FileNotFound(p),
            AudioError::UnsupportedFormat(f) => AuthError::UnsupportedFormat(f),
            other => AuthError::ExtractionFailure(other.to_string()),
        }
    }
}

impl From<FeatureError> for AuthError {
    fn from(e: FeatureError) -> Self {
        match e {
            FeatureError::Audio(a) => a.into(),
            FeatureError::TooShortOrSilent { .. } | FeatureError::TooFewFrames { .. } => {
                AuthError::TooShortOrSilent(e.to_string())
            }
            FeatureError::NumericDegenerate => AuthError::NumericDegenerate(e.to_string()),
            FeatureError::Config(msg) => AuthError::Config(msg),
            other => AuthError::ExtractionFailure(other.to_string()),
        }
    }
}

impl From<KVError> for AuthError {
    fn from(e: KVError) -> Self {
        AuthError::Store(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_errors_map_to_kinds() {
        let e: AuthError = FeatureError::TooShortOrSilent { samples: 0, min: 1024 }.into();
        assert_eq!(e.kind(), ErrorKind::TooShortOrSilent);

        let e: AuthError = FeatureError::TooFewFrames { frames: 2, min: 4 }.into();
        assert_eq!(e.kind(), ErrorKind::TooShortOrSilent);

        let e: AuthError =
            FeatureError::Audio(AudioError::FileNotFound(PathBuf::from("x.wav"))).into();
        assert_eq!(e.kind(), ErrorKind::FileNotFound);

        let e: AuthError = FeatureError::Audio(AudioError::UnsupportedFormat("x".into())).into();
        assert_eq!(e.kind(), ErrorKind::UnsupportedFormat);

        let e: AuthError = FeatureError::Audio(AudioError::Decode("bad".into())).into();
        assert_eq!(e.kind(), ErrorKind::ExtractionFailure);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::BackgroundModelMissing).unwrap();
        assert_eq!(json, "\"background_model_missing\"");
    }
}

//! Errors surfaced by the prediction path.

use serde::{Serialize, Serializer};
use std::fmt;

/// Failure of a single prediction call. Every variant fails the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    /// The loader did not produce both artifacts; terminal until restart.
    #[error("sentiment model artifacts are not loaded")]
    ArtifactUnavailable,

    /// Rejected before any model work.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The vectorizer or classifier failed on this batch.
    #[error("inference failed: {0}")]
    InferenceFailure(String),
}

/// Error category shared by the wire body and the metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ArtifactUnavailable,
    InvalidRequest,
    InferenceFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ArtifactUnavailable => "artifact_unavailable",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InferenceFailure => "inference_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl PredictionError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Keeps the full `anyhow` context chain in the message.
    pub fn inference(err: anyhow::Error) -> Self {
        Self::InferenceFailure(format!("{err:#}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictionError::ArtifactUnavailable => ErrorKind::ArtifactUnavailable,
            PredictionError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            PredictionError::InferenceFailure(_) => ErrorKind::InferenceFailure,
        }
    }
}

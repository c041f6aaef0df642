//! Error types for the learning memory core.
//!
//! [`Error`] carries both the internal-only variants the pipeline needs
//! (`ParseError`, `EmbeddingError`, `DimensionMismatch`, ...) and the four
//! RPC-visible kinds from spec §7, reachable via [`Error::kind`]. Only
//! [`ErrorKind::Internal`] should ever carry a message an operator, not an
//! end user, is meant to read.

use std::path::PathBuf;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The four RPC-visible error kinds (spec §6.1, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    InsufficientData,
    InternalError,
}

/// Structured reason a parse attempt failed (spec §4.4 tolerance rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    Parse,
    Encoding,
    Io,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Parse => "parse",
            Self::Encoding => "encoding",
            Self::Io => "io",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation failed for field `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("insufficient data for clustering: {found} members, need at least {required}")]
    InsufficientData { found: usize, required: usize },

    #[error("{kind} error parsing {path}: {message}")]
    Parse {
        kind: ParseErrorKind,
        path: PathBuf,
        message: String,
    },

    #[error("embedding failed for model `{model}`: {message}")]
    Embedding { model: String, message: String },

    #[error("embedding model `{model}` failed to load: {message}")]
    EmbeddingModel { model: String, message: String },

    #[error(
        "dimension mismatch in collection `{collection}`: expected {expected}, got {actual}"
    )]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("metadata store error: {0}")]
    MetadataStore(String),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("shallow clone: {0}")]
    ShallowClone(String),

    #[error("persistence failed after retries: {0}")]
    Persist(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Map this error onto the four RPC-visible kinds.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::Parse { .. }
            | Self::Embedding { .. }
            | Self::EmbeddingModel { .. }
            | Self::DimensionMismatch { .. }
            | Self::VectorStore(_)
            | Self::MetadataStore(_)
            | Self::Git(_)
            | Self::ShallowClone(_)
            | Self::Persist(_)
            | Self::InvalidState(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Whether this class of failure is worth retrying (used by the GHAP
    /// persister and the commit/code batch-embed fallback paths).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Embedding { .. }
                | Self::VectorStore(_)
                | Self::MetadataStore(_)
                | Self::Io(_)
                | Self::Persist(_)
        )
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Per-item failure classification for indexing runs (spec §4.5, §4.7):
/// `index_directory` and `index_commits` both report one of these per failed
/// item in their stats rather than aborting the run on the first error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingErrorKind {
    ParseError,
    EncodingError,
    IoError,
    EmbeddingError,
    UnknownError,
}

impl IndexingErrorKind {
    #[must_use]
    pub fn classify(error: &Error) -> Self {
        match error {
            Error::Parse { kind, .. } => match kind {
                ParseErrorKind::Parse => Self::ParseError,
                ParseErrorKind::Encoding => Self::EncodingError,
                ParseErrorKind::Io => Self::IoError,
            },
            Error::Io(_) => Self::IoError,
            Error::Embedding { .. } | Error::EmbeddingModel { .. } => Self::EmbeddingError,
            _ => Self::UnknownError,
        }
    }
}

/// Structured, RPC-visible error envelope (spec §6.1): `{"error": {"type", "message"}}`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub r#type: ErrorKind,
    pub message: String,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        Self {
            r#type: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_maps_to_validation_kind() {
        let err = Error::validation("importance", "must be in [0,1]");
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("importance"));
    }

    #[test]
    fn insufficient_data_maps_correctly() {
        let err = Error::InsufficientData {
            found: 5,
            required: 20,
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn unknown_failures_become_internal_error() {
        let err = Error::Internal("unexpected".to_string());
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn embedding_failures_are_recoverable() {
        let err = Error::Embedding {
            model: "m".into(),
            message: "timeout".into(),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn error_response_serializes_snake_case() {
        let err = Error::not_found("memory", "abc");
        let resp = ErrorResponse::from(&err);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"not_found\""));
    }
}

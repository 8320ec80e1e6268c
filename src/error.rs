//! Error types for the VitalGuard library.

use std::path::PathBuf;

/// Failure to load a classifier artifact. Callers fall back to the heuristic.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model artifact not found at {0}")]
    Missing(PathBuf),

    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model expects {expected} features, artifact declares {found}")]
    Shape { expected: usize, found: usize },

    #[error("unknown feature in model artifact: {0}")]
    UnknownFeature(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WardError {
    #[error("patient {0} not found")]
    UnknownPatient(String),

    #[error("alert {0} not found")]
    AlertNotFound(String),
}

pub type Result<T> = std::result::Result<T, WardError>;

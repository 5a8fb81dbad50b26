use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors for a speedcam run.
///
/// Local decode problems (a bad geometry payload, an unparsable number) never
/// surface here; the affected value is treated as absent instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("required input columns missing: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("camera source misconfigured: {0}")]
    SourceConflict(String),

    #[error("source unavailable: {}: {reason}", .path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("no usable camera records")]
    EmptyCatalog,

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

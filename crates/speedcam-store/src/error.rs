use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] speedcam_core::Error),

    #[error("could not decode {} as any of [{}]: {last}", .path.display(), .tried.join(", "))]
    Undecodable {
        path: PathBuf,
        tried: Vec<String>,
        last: String,
    },

    #[error("duckdb extension '{name}' unavailable: {reason}")]
    ExtensionUnavailable { name: String, reason: String },

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

//! I/O boundary for speedcam: DuckDB ingestion and spatial camera backend,
//! plus partitioned Parquet / CSV output.

mod error;
pub mod export;

pub use error::StoreError;
pub use export::{OutputFormat, check_output_dir, write_partitions};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::{DEFAULT_CAMERA_TABLE, DEFAULT_ENCODINGS, DuckStore};

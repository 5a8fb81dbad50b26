//! Partitioned output: one file per month plus a residual file.

use std::fs::File;
use std::path::{Path, PathBuf};

use parquet::arrow::ArrowWriter;
use speedcam_core::Partition;
use speedcam_core::schema::output_batch;
use tracing::info;

use crate::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Csv => "csv",
        }
    }
}

/// The output directory must already exist; it is never created.
pub fn check_output_dir(dir: &Path) -> Result<(), StoreError> {
    if !dir.is_dir() {
        return Err(speedcam_core::Error::unavailable(dir, "output directory does not exist").into());
    }
    Ok(())
}

/// `<dir>/<input stem>_output_<label>.<ext>`
pub fn partition_path(dir: &Path, input: &Path, label: &str, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "events".to_string());
    dir.join(format!("{stem}_output_{label}.{}", format.extension()))
}

/// Write every partition to its own file and return the paths written.
pub fn write_partitions(
    dir: &Path,
    input: &Path,
    partitions: &[Partition],
    format: OutputFormat,
) -> Result<Vec<PathBuf>, StoreError> {
    check_output_dir(dir)?;
    let mut written = Vec::with_capacity(partitions.len());
    for partition in partitions {
        let path = partition_path(dir, input, &partition.label(), format);
        let batch = output_batch(&partition.records)?;
        let file = File::create(&path)?;
        match format {
            OutputFormat::Parquet => {
                let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
                writer.write(&batch)?;
                writer.close()?;
            }
            OutputFormat::Csv => {
                let mut writer = arrow::csv::WriterBuilder::new()
                    .with_header(true)
                    .build(file);
                writer.write(&batch)?;
            }
        }
        info!(
            path = %path.display(),
            month = ?partition.month,
            rows = partition.records.len(),
            "wrote partition"
        );
        written.push(path);
    }
    Ok(written)
}

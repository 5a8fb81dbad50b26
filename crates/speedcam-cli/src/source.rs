//! Camera source selection.

use std::fmt;
use std::path::PathBuf;

use speedcam_core::{CameraOrigin, CameraRecord, CatalogBuilder, Config, Error};
use speedcam_store::{DEFAULT_CAMERA_TABLE, DEFAULT_ENCODINGS, DuckStore, StoreError};

/// Exactly one configured camera source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    /// Table in a DuckDB database with the spatial extension.
    Backend { db: PathBuf, table: String },
    /// Plain CSV file.
    File(PathBuf),
}

impl CameraSource {
    /// Pick the source from CLI options before any I/O happens.
    pub fn resolve(
        db: Option<PathBuf>,
        table: Option<String>,
        csv: Option<PathBuf>,
    ) -> Result<Self, Error> {
        match (db, table, csv) {
            (Some(_), _, Some(_)) => Err(Error::SourceConflict(
                "give either --camera-db or --camera-csv, not both".into(),
            )),
            (None, Some(_), _) => Err(Error::SourceConflict(
                "--camera-table needs --camera-db".into(),
            )),
            (Some(db), table, None) => Ok(Self::Backend {
                db,
                table: table.unwrap_or_else(|| DEFAULT_CAMERA_TABLE.to_string()),
            }),
            (None, None, Some(csv)) => Ok(Self::File(csv)),
            (None, None, None) => Err(Error::SourceConflict(
                "no camera source: give --camera-db or --camera-csv (or --aggregate-only)".into(),
            )),
        }
    }

    /// Read and normalise the catalog.
    pub fn load(&self, config: &Config) -> Result<Vec<CameraRecord>, StoreError> {
        let builder = CatalogBuilder::new(config);
        let cameras = match self {
            Self::Backend { db, table } => {
                let store = DuckStore::open_persistent(db)?;
                store.load_spatial()?;
                let rows = store.camera_table(table)?;
                builder.from_table(&rows, CameraOrigin::Backend)?
            }
            Self::File(path) => {
                let store = DuckStore::open()?;
                let rows = store.read_csv(path, DEFAULT_ENCODINGS)?;
                builder.from_table(&rows, CameraOrigin::Table)?
            }
        };
        Ok(cameras)
    }
}

impl fmt::Display for CameraSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend { db, table } => write!(f, "{}:{table}", db.display()),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

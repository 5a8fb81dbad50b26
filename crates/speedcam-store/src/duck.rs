//! DuckDB access for event files and camera sources.

use std::path::Path;

use arrow::record_batch::RecordBatch;
use duckdb::Connection;
use speedcam_core::Table;
use speedcam_core::catalog::{CameraColumns, CameraOrigin};
use tracing::{debug, info, warn};

use crate::StoreError;

/// Encodings tried, in order, when reading a CSV file.
pub const DEFAULT_ENCODINGS: &[&str] = &["utf-8", "cp949", "euc-kr"];

/// Camera table read from a backend database when none is named.
pub const DEFAULT_CAMERA_TABLE: &str = "cameras";

/// Encodings DuckDB reads without the `encodings` extension.
const BUILTIN_ENCODINGS: &[&str] = &["utf-8", "utf8", "utf-16", "latin-1"];

/// DuckDB connection used for both file ingestion and the spatial backend.
///
/// Use [`open`](Self::open) for an in-memory database (reading CSV files) and
/// [`open_persistent`](Self::open_persistent) for an existing camera database.
pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Open an existing DuckDB database file.
    ///
    /// Unlike DuckDB itself this never creates the file: a missing path is a
    /// configuration mistake.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(speedcam_core::Error::unavailable(path, "database file does not exist").into());
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened camera database");
        Ok(Self { conn })
    }

    /// Install and load the `spatial` extension.
    pub fn load_spatial(&self) -> Result<(), StoreError> {
        self.load_extension("spatial")
    }

    fn load_extension(&self, name: &str) -> Result<(), StoreError> {
        self.conn
            .execute_batch(&format!("INSTALL {name}; LOAD {name};"))
            .map_err(|e| StoreError::ExtensionUnavailable {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        debug!(extension = name, "loaded duckdb extension");
        Ok(())
    }

    // ── Tabular files ──

    /// Read a CSV file with every column as text.
    ///
    /// Each encoding is tried in turn and the first that parses wins.
    pub fn read_csv(&self, path: &Path, encodings: &[&str]) -> Result<Table, StoreError> {
        if !path.exists() {
            return Err(speedcam_core::Error::unavailable(path, "file does not exist").into());
        }
        if encodings
            .iter()
            .any(|e| !BUILTIN_ENCODINGS.contains(&e.to_ascii_lowercase().as_str()))
            && let Err(err) = self.load_extension("encodings")
        {
            warn!(%err, "extra csv encodings unavailable");
        }

        let mut last = String::from("no encodings given");
        for encoding in encodings {
            let sql = format!(
                "SELECT * FROM read_csv({}, header = true, all_varchar = true, encoding = {})",
                quote_literal(&path.display().to_string()),
                quote_literal(encoding),
            );
            match self.query_table(&sql) {
                Ok(table) => {
                    info!(
                        path = %path.display(),
                        encoding,
                        rows = table.num_rows(),
                        "read csv"
                    );
                    return Ok(table);
                }
                Err(err) => {
                    warn!(path = %path.display(), encoding, %err, "csv read failed");
                    last = err.to_string();
                }
            }
        }
        Err(StoreError::Undecodable {
            path: path.to_path_buf(),
            tried: encodings.iter().map(|e| e.to_string()).collect(),
            last,
        })
    }

    // ── Camera backend ──

    /// Column names of a table.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let sql = format!("SELECT * FROM {} LIMIT 0", quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let arrow = stmt.query_arrow([])?;
        let schema = arrow.get_schema();
        Ok(schema.fields().iter().map(|f| f.name().clone()).collect())
    }

    /// Read a camera table, projecting its columns onto the canonical camera
    /// names (`row_idx`, `cam_id`, `speed`, `cam_heading`, `code`, `type`,
    /// `x`, `y`).
    ///
    /// A geometry column is reduced to `ST_X` / `ST_Y`, which needs
    /// [`load_spatial`](Self::load_spatial) first. Without one, explicit
    /// longitude / latitude columns are read as-is.
    pub fn camera_table(&self, table: &str) -> Result<Table, StoreError> {
        let names = self.table_columns(table)?;
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let columns = CameraColumns::resolve(&name_refs);
        let sql = camera_select(table, &columns)?;
        debug!(%sql, "camera backend query");
        let out = self.query_table(&sql)?;
        info!(table, rows = out.num_rows(), "read camera table");
        Ok(out)
    }

    // ── Escape hatch ──

    /// Execute arbitrary SQL and return the result with its schema.
    pub fn query_table(&self, sql: &str) -> Result<Table, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let arrow = stmt.query_arrow([])?;
        let schema = arrow.get_schema();
        let batches: Vec<RecordBatch> = arrow.collect();
        Ok(Table::new(schema, batches))
    }

    /// Access the underlying DuckDB connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Projection of a backend camera table onto the canonical column names.
fn camera_select(table: &str, columns: &CameraColumns) -> Result<String, StoreError> {
    let missing = if columns.geometry.is_some() {
        columns.missing(CameraOrigin::Table)
    } else {
        columns.missing(CameraOrigin::Backend)
    };
    if !missing.is_empty() {
        return Err(speedcam_core::Error::Schema { missing }.into());
    }

    let aliased = |source: &Option<String>, alias: &str| {
        source
            .as_ref()
            .map(|col| format!("{} AS {}", quote_ident(col), quote_ident(alias)))
    };
    let mut select: Vec<String> = [
        aliased(&columns.row_index, "row_idx"),
        aliased(&columns.id, "cam_id"),
        aliased(&columns.speed, "speed"),
        aliased(&columns.heading, "cam_heading"),
        aliased(&columns.code, "code"),
        aliased(&columns.kind, "type"),
    ]
    .into_iter()
    .flatten()
    .collect();
    match &columns.geometry {
        Some(geom) => {
            let g = quote_ident(geom);
            select.push(format!("ST_X({g}) AS x"));
            select.push(format!("ST_Y({g}) AS y"));
        }
        None => select.extend(
            [
                aliased(&columns.longitude, "x"),
                aliased(&columns.latitude, "y"),
            ]
            .into_iter()
            .flatten(),
        ),
    }
    Ok(format!("SELECT {} FROM {}", select.join(", "), quote_ident(table)))
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

//! Camera catalog construction.
//!
//! Raw rows from either camera source are normalised into [`CameraRecord`]s,
//! filtered against the configured allow-sets, and deduplicated by identifier.

use std::collections::HashMap;

use arrow::record_batch::RecordBatch;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::geometry;
use crate::table::{Table, TextColumn, parse_integer, parse_number, resolve_alias};

/// Canonical camera fields and the header spellings accepted for each.
pub mod aliases {
    pub const ID: &[&str] = &["cam_id"];
    pub const LONGITUDE: &[&str] = &["longitude", "lon", "gps_x", "x"];
    pub const LATITUDE: &[&str] = &["latitude", "lat", "gps_y", "y"];
    pub const SPEED: &[&str] = &["speed", "limit_speed"];
    pub const TYPE: &[&str] = &["type", "cam_type"];
    pub const HEADING: &[&str] = &["cam_heading", "heading"];
    pub const CODE: &[&str] = &["code", "cam_code", "class_code"];
    pub const ROW_INDEX: &[&str] = &["row_idx", "idx", "ogc_fid"];
    pub const GEOMETRY: &[&str] = &["geom", "geometry", "wkb_geometry"];
}

/// Where a catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraOrigin {
    /// Spatial backend table; coordinates are already X/Y numbers.
    Backend,
    /// Plain tabular file; coordinates may come from an encoded geometry column.
    Table,
}

/// Source column names resolved once per load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraColumns {
    pub id: Option<String>,
    pub longitude: Option<String>,
    pub latitude: Option<String>,
    pub speed: Option<String>,
    pub kind: Option<String>,
    pub heading: Option<String>,
    pub code: Option<String>,
    pub row_index: Option<String>,
    pub geometry: Option<String>,
}

impl CameraColumns {
    pub fn resolve(names: &[&str]) -> Self {
        let find = |aliases: &[&str]| resolve_alias(names, aliases).map(str::to_string);
        Self {
            id: find(aliases::ID),
            longitude: find(aliases::LONGITUDE),
            latitude: find(aliases::LATITUDE),
            speed: find(aliases::SPEED),
            kind: find(aliases::TYPE),
            heading: find(aliases::HEADING),
            code: find(aliases::CODE),
            row_index: find(aliases::ROW_INDEX),
            geometry: find(aliases::GEOMETRY),
        }
    }

    /// Required fields this source cannot supply at all.
    pub fn missing(&self, origin: CameraOrigin) -> Vec<String> {
        let mut missing = Vec::new();
        if self.id.is_none() {
            missing.push(aliases::ID[0].to_string());
        }
        let has_geometry = origin == CameraOrigin::Table && self.geometry.is_some();
        if !has_geometry {
            if self.longitude.is_none() {
                missing.push(aliases::LONGITUDE[0].to_string());
            }
            if self.latitude.is_none() {
                missing.push(aliases::LATITUDE[0].to_string());
            }
        }
        missing
    }
}

/// One camera row as read, before any normalisation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCameraRow {
    pub id: Option<String>,
    pub longitude: Option<String>,
    pub latitude: Option<String>,
    pub geometry: Option<String>,
    pub speed: Option<String>,
    pub kind: Option<String>,
    pub heading: Option<String>,
    pub code: Option<String>,
    pub row_index: Option<String>,
}

/// A normalised enforcement camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRecord {
    pub id: String,
    pub longitude: f64,
    pub latitude: f64,
    pub heading: f64,
    pub speed_limit: Option<f64>,
    pub code: String,
    pub row_index: i64,
    /// Whether the source flagged this row as an enforcement point.
    pub enforcement_point: bool,
}

/// Divide values stored as scaled integers back down.
///
/// Magnitudes strictly between 1e3 and 1e9 are taken to be micro-units.
pub fn rescale_magnitude(v: f64) -> f64 {
    let m = v.abs();
    if m > 1_000.0 && m < 1_000_000_000.0 {
        v / 1_000_000.0
    } else {
        v
    }
}

/// Keep one record per identifier.
///
/// Enforcement points beat other records; otherwise the first seen wins. The
/// surviving record takes the slot where its identifier first appeared.
pub fn dedup(records: Vec<CameraRecord>) -> Vec<CameraRecord> {
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<CameraRecord> = Vec::with_capacity(records.len());
    for rec in records {
        match slots.get(&rec.id) {
            Some(&i) => {
                if rec.enforcement_point && !out[i].enforcement_point {
                    out[i] = rec;
                }
            }
            None => {
                slots.insert(rec.id.clone(), out.len());
                out.push(rec);
            }
        }
    }
    out
}

/// Turns raw camera rows into a deduplicated catalog.
pub struct CatalogBuilder<'a> {
    config: &'a Config,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Build a catalog from an Arrow table.
    ///
    /// Fails with [`Error::EmptyCatalog`] when nothing survives normalisation.
    pub fn from_table(&self, table: &Table, origin: CameraOrigin) -> Result<Vec<CameraRecord>> {
        let columns = CameraColumns::resolve(&table.column_names());
        debug!(?columns, ?origin, "resolved camera columns");
        let missing = columns.missing(origin);
        if !missing.is_empty() {
            return Err(Error::Schema { missing });
        }
        let mut rows = Vec::with_capacity(table.num_rows());
        for batch in &table.batches {
            rows.extend(read_rows(batch, &columns, origin)?);
        }
        self.build(&rows, columns.kind.is_some())
    }

    /// Normalise, filter and deduplicate raw rows.
    ///
    /// `has_type_column` tells whether the source carries a type flag at all;
    /// without one every row counts as an enforcement point.
    pub fn build(&self, rows: &[RawCameraRow], has_type_column: bool) -> Result<Vec<CameraRecord>> {
        let normalized: Vec<CameraRecord> = rows
            .iter()
            .enumerate()
            .filter_map(|(position, row)| self.normalize(row, position, has_type_column))
            .collect();
        let kept = normalized.len();
        let catalog = dedup(normalized);
        info!(
            rows = rows.len(),
            kept,
            cameras = catalog.len(),
            "built camera catalog"
        );
        if catalog.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(catalog)
    }

    /// Normalise one row, or `None` when it is unusable.
    pub fn normalize(
        &self,
        row: &RawCameraRow,
        position: usize,
        has_type_column: bool,
    ) -> Option<CameraRecord> {
        let enforcement_point = if has_type_column {
            row.kind
                .as_deref()
                .is_some_and(|k| self.config.is_enforcement_type(k))
        } else {
            true
        };
        if !enforcement_point {
            debug!(position, kind = ?row.kind, "dropped camera: not an enforcement point");
            return None;
        }

        let code = row.code.as_deref().map(str::trim).unwrap_or_default();
        if !self.config.allows_camera_code(code) {
            debug!(position, code, "dropped camera: classification code not allowed");
            return None;
        }

        let Some(id) = row.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            debug!(position, "dropped camera: missing identifier");
            return None;
        };

        let Some((longitude, latitude)) = coordinates(row) else {
            debug!(position, id, "dropped camera: no usable coordinates");
            return None;
        };

        let Some(heading) = row.heading.as_deref().and_then(parse_number) else {
            debug!(position, id, "dropped camera: missing heading");
            return None;
        };

        let speed_limit = row
            .speed
            .as_deref()
            .and_then(parse_number)
            .map(rescale_magnitude);
        let row_index = row
            .row_index
            .as_deref()
            .and_then(parse_integer)
            .unwrap_or(position as i64);

        Some(CameraRecord {
            id: id.to_string(),
            longitude,
            latitude,
            heading,
            speed_limit,
            code: code.to_string(),
            row_index,
            enforcement_point,
        })
    }
}

/// Geometry first, explicit columns second.
fn coordinates(row: &RawCameraRow) -> Option<(f64, f64)> {
    let decoded = row
        .geometry
        .as_deref()
        .and_then(|g| match geometry::decode_point(g) {
            Ok(point) => Some(point),
            Err(err) => {
                debug!(%err, "geometry decode failed, falling back to columns");
                None
            }
        });
    let (lon, lat) = match decoded {
        Some(point) => point,
        None => (
            row.longitude.as_deref().and_then(parse_number)?,
            row.latitude.as_deref().and_then(parse_number)?,
        ),
    };
    let (lon, lat) = (rescale_magnitude(lon), rescale_magnitude(lat));
    (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
}

fn read_rows(
    batch: &RecordBatch,
    columns: &CameraColumns,
    origin: CameraOrigin,
) -> Result<Vec<RawCameraRow>> {
    let col = |name: &Option<String>| -> Result<Option<TextColumn>> {
        match name {
            Some(n) => TextColumn::from_batch(batch, n),
            None => Ok(None),
        }
    };
    let id = col(&columns.id)?;
    let longitude = col(&columns.longitude)?;
    let latitude = col(&columns.latitude)?;
    let speed = col(&columns.speed)?;
    let kind = col(&columns.kind)?;
    let heading = col(&columns.heading)?;
    let code = col(&columns.code)?;
    let row_index = col(&columns.row_index)?;
    let geometry = match origin {
        CameraOrigin::Table => col(&columns.geometry)?,
        CameraOrigin::Backend => None,
    };

    let get = |c: &Option<TextColumn>, row: usize| c.as_ref().and_then(|c| c.text(row));
    Ok((0..batch.num_rows())
        .map(|row| RawCameraRow {
            id: get(&id, row),
            longitude: get(&longitude, row),
            latitude: get(&latitude, row),
            geometry: get(&geometry, row),
            speed: get(&speed, row),
            kind: get(&kind, row),
            heading: get(&heading, row),
            code: get(&code, row),
            row_index: get(&row_index, row),
        })
        .collect())
}

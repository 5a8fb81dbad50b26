//! Run-wide thresholds and allow-sets.
//!
//! A [`Config`] is built once (defaults, optionally overlaid by a JSON file)
//! and handed by reference to the catalog builder, the index, the aggregator
//! and the classifier.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Event-type codes that take part in aggregation.
pub const DEFAULT_EVENT_CODES: [i64; 5] = [81, 82, 83, 84, 85];

/// Camera classification codes that denote a speed-enforcement camera.
pub const DEFAULT_CAMERA_CODES: [&str; 4] = ["1", "2", "3", "4"];

/// Type marker carried by fixed enforcement points.
pub const DEFAULT_ENFORCEMENT_TYPE: &str = "1";

/// Canonical event input columns, in the order they are reported when missing.
pub const DEFAULT_EVENT_COLUMNS: EventColumns = EventColumns {
    event_id: "Num_event",
    timestamp: "DateTime",
    event_code: "eventcode",
    speed: "Speed",
    longitude: "GPS_X",
    latitude: "GPS_Y",
    heading: "GPS_Degree",
    source: "_source_file",
};

/// Names of the required event input columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventColumns {
    pub event_id: &'static str,
    pub timestamp: &'static str,
    pub event_code: &'static str,
    pub speed: &'static str,
    pub longitude: &'static str,
    pub latitude: &'static str,
    pub heading: &'static str,
    pub source: &'static str,
}

impl EventColumns {
    pub fn all(&self) -> [&'static str; 8] {
        [
            self.event_id,
            self.timestamp,
            self.event_code,
            self.speed,
            self.longitude,
            self.latitude,
            self.heading,
            self.source,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Event-type codes kept before grouping.
    pub event_codes: BTreeSet<i64>,
    /// Camera classification codes kept in the catalog (normalised form).
    pub camera_codes: BTreeSet<String>,
    /// Value of the camera type column marking an enforcement point.
    pub enforcement_type: String,
    /// Nearest-camera search radius in metres.
    pub search_radius_m: f64,
    /// Maximum heading / bearing disagreement in degrees.
    pub heading_tolerance_deg: f64,
    /// Speed over the limit (km/h) that counts as a violation.
    pub violation_delta: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_codes: DEFAULT_EVENT_CODES.into_iter().collect(),
            camera_codes: DEFAULT_CAMERA_CODES.iter().map(|c| c.to_string()).collect(),
            enforcement_type: DEFAULT_ENFORCEMENT_TYPE.to_string(),
            search_radius_m: 1000.0,
            heading_tolerance_deg: 20.0,
            violation_delta: 20.0,
        }
    }
}

impl Config {
    /// Read a JSON config file; fields it omits keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::unavailable(path, e.to_string()))?;
        let mut config: Self = serde_json::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.camera_codes = config
            .camera_codes
            .iter()
            .map(|c| normalize_code(c))
            .collect();
        Ok(config)
    }

    /// Whether a raw camera classification code is in the allow-set.
    pub fn allows_camera_code(&self, raw: &str) -> bool {
        self.camera_codes.contains(&normalize_code(raw))
    }

    /// Whether a raw camera type value is the enforcement-point marker.
    pub fn is_enforcement_type(&self, raw: &str) -> bool {
        normalize_code(raw) == normalize_code(&self.enforcement_type)
    }
}

/// Canonical form of a code string: trimmed, and integral numbers collapsed
/// to their integer spelling so `"01"`, `"1"` and `"1.0"` compare equal.
pub fn normalize_code(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        _ => trimmed.to_string(),
    }
}

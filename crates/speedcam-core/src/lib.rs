//! Core of speedcam: camera catalog and nearest-camera index, event
//! aggregation, and speed-violation classification.

pub mod aggregate;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod geo;
pub mod geometry;
pub mod index;
pub mod pipeline;
pub mod schema;
pub mod table;

pub use aggregate::{EventGroup, aggregate, month_from_digits};
pub use catalog::{CameraOrigin, CameraRecord, CatalogBuilder, RawCameraRow};
pub use classify::{SpeedClassifier, ViolationClass};
pub use config::Config;
pub use error::{Error, Result};
pub use events::{EventSample, read_samples};
pub use geometry::{GeometryError, decode_point};
pub use index::{CameraIndex, CameraMatch};
pub use pipeline::{OutputRecord, Partition, Pipeline, RunSummary, partition_by_month};
pub use table::Table;

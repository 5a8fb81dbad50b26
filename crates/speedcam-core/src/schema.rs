//! Arrow schemas for pipeline output and catalog inspection.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, UInt8Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::catalog::CameraRecord;
use crate::error::Result;
use crate::pipeline::OutputRecord;

/// Output columns, in their fixed order.
pub mod output {
    pub const EVENT_ID: &str = "Num_event";
    pub const TIMESTAMP: &str = "DateTime";
    pub const EVENT_CODE: &str = "eventcode";
    pub const LONGITUDE: &str = "GPS_X";
    pub const LATITUDE: &str = "GPS_Y";
    pub const HEADING: &str = "GPS_Degree";
    pub const CAMERA_ID: &str = "camera_id";
    pub const CAMERA_ROW: &str = "camera_row_idx";
    pub const SPEED_LIMIT: &str = "limit_speed";
    pub const T0: &str = "t0";
    pub const T5: &str = "t+5s";
    pub const T10: &str = "t+10s";
    pub const CLASS: &str = "violation_class";
    pub const SOURCE: &str = "_source_file";
}

/// Schema of one output partition.
pub fn output_schema() -> Schema {
    Schema::new(vec![
        Field::new(output::EVENT_ID, DataType::Utf8, false),
        Field::new(output::TIMESTAMP, DataType::Utf8, false),
        Field::new(output::EVENT_CODE, DataType::Utf8, false),
        Field::new(output::LONGITUDE, DataType::Float64, true),
        Field::new(output::LATITUDE, DataType::Float64, true),
        Field::new(output::HEADING, DataType::Float64, true),
        Field::new(output::CAMERA_ID, DataType::Utf8, false),
        Field::new(output::CAMERA_ROW, DataType::Int64, true),
        Field::new(output::SPEED_LIMIT, DataType::Float64, true),
        Field::new(output::T0, DataType::Float64, true),
        Field::new(output::T5, DataType::Float64, true),
        Field::new(output::T10, DataType::Float64, true),
        Field::new(output::CLASS, DataType::UInt8, true),
        Field::new(output::SOURCE, DataType::Utf8, false),
    ])
}

/// Convert output records into a single batch.
///
/// An unmatched camera id is written as an empty string, not null.
pub fn output_batch(records: &[OutputRecord]) -> Result<RecordBatch> {
    let f64_col = |get: fn(&OutputRecord) -> Option<f64>| -> ArrayRef {
        Arc::new(records.iter().map(get).collect::<Float64Array>())
    };
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.event_id))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.timestamp))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.event_code))),
        f64_col(|r| r.longitude),
        f64_col(|r| r.latitude),
        f64_col(|r| r.heading),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.camera_id.as_deref().unwrap_or_default()),
        )),
        Arc::new(records.iter().map(|r| r.camera_row_index).collect::<Int64Array>()),
        f64_col(|r| r.speed_limit),
        f64_col(|r| r.t0),
        f64_col(|r| r.t5),
        f64_col(|r| r.t10),
        Arc::new(records.iter().map(|r| r.class.map(|c| c.code())).collect::<UInt8Array>()),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.source))),
    ];
    Ok(RecordBatch::try_new(Arc::new(output_schema()), columns)?)
}

/// Schema used when listing a camera catalog.
pub fn camera_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("cam_id", DataType::Utf8, false),
        Field::new("longitude", DataType::Float64, false),
        Field::new("latitude", DataType::Float64, false),
        Field::new("cam_heading", DataType::Float64, false),
        Field::new("limit_speed", DataType::Float64, true),
        Field::new("code", DataType::Utf8, false),
        Field::new("row_idx", DataType::Int64, false),
        Field::new("enforcement_point", DataType::Boolean, false),
    ]))
}

/// Convert catalog records into a batch for display.
pub fn camera_batch(cameras: &[CameraRecord]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(cameras.iter().map(|c| &c.id))),
        Arc::new(Float64Array::from_iter_values(cameras.iter().map(|c| c.longitude))),
        Arc::new(Float64Array::from_iter_values(cameras.iter().map(|c| c.latitude))),
        Arc::new(Float64Array::from_iter_values(cameras.iter().map(|c| c.heading))),
        Arc::new(cameras.iter().map(|c| c.speed_limit).collect::<Float64Array>()),
        Arc::new(StringArray::from_iter_values(cameras.iter().map(|c| &c.code))),
        Arc::new(Int64Array::from_iter_values(cameras.iter().map(|c| c.row_index))),
        Arc::new(cameras.iter().map(|c| Some(c.enforcement_point)).collect::<BooleanArray>()),
    ];
    Ok(RecordBatch::try_new(camera_schema(), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ViolationClass;
    use arrow::array::Array;

    fn record(camera: Option<&str>, class: Option<ViolationClass>) -> OutputRecord {
        OutputRecord {
            event_id: "1".into(),
            timestamp: "24-03-15 10:00:00".into(),
            event_code: "81".into(),
            longitude: Some(127.0),
            latitude: Some(37.0),
            heading: None,
            camera_id: camera.map(Into::into),
            camera_row_index: camera.map(|_| 3),
            speed_limit: camera.map(|_| 100.0),
            t0: Some(125.0),
            t5: None,
            t10: None,
            class,
            source: "a.csv".into(),
            month: Some(3),
        }
    }

    #[test]
    fn output_schema_column_order() {
        let schema = output_schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Num_event",
                "DateTime",
                "eventcode",
                "GPS_X",
                "GPS_Y",
                "GPS_Degree",
                "camera_id",
                "camera_row_idx",
                "limit_speed",
                "t0",
                "t+5s",
                "t+10s",
                "violation_class",
                "_source_file",
            ]
        );
    }

    #[test]
    fn output_batch_nulls_and_empty_camera() {
        let batch = output_batch(&[
            record(Some("C9"), Some(ViolationClass::Sustained)),
            record(None, None),
        ])
        .unwrap();
        assert_eq!(batch.num_rows(), 2);

        let cam = batch
            .column_by_name(output::CAMERA_ID)
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(cam.value(0), "C9");
        assert_eq!(cam.value(1), "");

        let class = batch
            .column_by_name(output::CLASS)
            .unwrap()
            .as_any()
            .downcast_ref::<UInt8Array>()
            .unwrap();
        assert_eq!(class.value(0), 2);
        assert!(class.is_null(1));

        assert!(batch.column_by_name(output::CAMERA_ROW).unwrap().is_null(1));
        assert!(batch.column_by_name(output::HEADING).unwrap().is_null(0));
    }

    #[test]
    fn empty_output_batch() {
        let batch = output_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 14);
    }

    #[test]
    fn camera_batch_roundtrip_shape() {
        let cams = vec![CameraRecord {
            id: "C1".into(),
            longitude: 127.0,
            latitude: 37.0,
            heading: 90.0,
            speed_limit: None,
            code: "1".into(),
            row_index: 0,
            enforcement_point: true,
        }];
        let batch = camera_batch(&cams).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert!(batch.column_by_name("limit_speed").unwrap().is_null(0));
    }
}

//! Vehicle event samples read from the event input table.

use tracing::{debug, info};

use crate::config::{DEFAULT_EVENT_COLUMNS, EventColumns};
use crate::error::{Error, Result};
use crate::table::{Table, TextColumn, parse_integer};

/// Older exports spell the event identifier column this way.
pub const LEGACY_EVENT_ID_COLUMN: &str = "Num_Event";

/// One timestamped vehicle sample.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSample {
    pub source: String,
    pub event_id: String,
    /// Timestamp text exactly as read.
    pub timestamp: String,
    /// Digits of `timestamp` only; orders samples and yields the month.
    pub timestamp_key: String,
    /// Event-type code text exactly as read.
    pub event_code: String,
    pub speed: Option<f64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub heading: Option<f64>,
}

impl EventSample {
    /// Event-type code as an integer, if it is one.
    pub fn event_code_value(&self) -> Option<i64> {
        parse_integer(&self.event_code)
    }
}

/// Keep only the ASCII digits of a timestamp.
pub fn digits_key(timestamp: &str) -> String {
    timestamp.chars().filter(char::is_ascii_digit).collect()
}

/// Verify every required column is present, accepting the legacy id spelling.
///
/// Returns the column actually holding the event identifier.
pub fn check_schema(table: &Table, columns: &EventColumns) -> Result<&'static str> {
    let names = table.column_names();
    let event_id = if names.contains(&columns.event_id) {
        Some(columns.event_id)
    } else if columns.event_id == DEFAULT_EVENT_COLUMNS.event_id
        && names.contains(&LEGACY_EVENT_ID_COLUMN)
    {
        Some(LEGACY_EVENT_ID_COLUMN)
    } else {
        None
    };

    let missing: Vec<String> = columns
        .all()
        .into_iter()
        .filter(|c| {
            if *c == columns.event_id {
                event_id.is_none()
            } else {
                !names.contains(c)
            }
        })
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(Error::Schema { missing });
    }

    Ok(event_id.unwrap_or(columns.event_id))
}

fn group_key(col: &TextColumn, row: usize) -> Option<&str> {
    col.get(row).map(str::trim).filter(|v| !v.is_empty())
}

/// Read all event samples, in input order.
pub fn read_samples(table: &Table, columns: &EventColumns) -> Result<Vec<EventSample>> {
    let event_id_column = check_schema(table, columns)?;
    debug!(event_id_column, "event schema ok");

    let mut samples = Vec::with_capacity(table.num_rows());
    let mut keyless = 0usize;
    for batch in &table.batches {
        // Presence was checked against the schema above.
        let col = |name: &str| -> Result<TextColumn> {
            TextColumn::from_batch(batch, name)?.ok_or_else(|| Error::Schema {
                missing: vec![name.to_string()],
            })
        };
        let event_id = col(event_id_column)?;
        let timestamp = col(columns.timestamp)?;
        let event_code = col(columns.event_code)?;
        let speed = col(columns.speed)?;
        let longitude = col(columns.longitude)?;
        let latitude = col(columns.latitude)?;
        let heading = col(columns.heading)?;
        let source = col(columns.source)?;

        for row in 0..batch.num_rows() {
            // Rows without a grouping key never form an event.
            let (Some(source_text), Some(event_id_text)) =
                (group_key(&source, row), group_key(&event_id, row))
            else {
                keyless += 1;
                continue;
            };
            let timestamp_text = timestamp.get(row).unwrap_or_default().to_string();
            samples.push(EventSample {
                source: source_text.to_string(),
                event_id: event_id_text.to_string(),
                timestamp_key: digits_key(&timestamp_text),
                timestamp: timestamp_text,
                event_code: event_code.get(row).unwrap_or_default().to_string(),
                speed: speed.number(row),
                longitude: longitude.number(row),
                latitude: latitude.number(row),
                heading: heading.number(row),
            });
        }
    }
    if keyless > 0 {
        debug!(keyless, "skipped samples without source or event id");
    }
    info!(samples = samples.len(), "read event samples");
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::text_batch;

    const HEADER: [&str; 8] = [
        "Num_event",
        "DateTime",
        "eventcode",
        "Speed",
        "GPS_X",
        "GPS_Y",
        "GPS_Degree",
        "_source_file",
    ];

    #[test]
    fn digits_only() {
        assert_eq!(digits_key("24-03-15 12:00:05"), "240315120005");
        assert_eq!(digits_key("n/a"), "");
    }

    #[test]
    fn reads_rows_leniently() {
        let batch = text_batch(
            &HEADER,
            &[
                vec![Some("7"), Some("24/03/15 10:00:00"), Some("81"), Some("110.5"), Some("127.0"), Some("37.0"), Some("90"), Some("a.csv")],
                vec![Some("7"), Some("24/03/15 10:00:05"), Some("x"), Some("fast"), None, Some("37.0"), Some(""), Some("a.csv")],
            ],
        );
        let table = Table::from_batches(vec![batch]).unwrap();
        let samples = read_samples(&table, &DEFAULT_EVENT_COLUMNS).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp_key, "240315100000");
        assert_eq!(samples[0].event_code_value(), Some(81));
        assert_eq!(samples[0].speed, Some(110.5));
        assert_eq!(samples[1].event_code_value(), None);
        assert_eq!(samples[1].speed, None);
        assert_eq!(samples[1].longitude, None);
        assert_eq!(samples[1].heading, None);
    }

    #[test]
    fn rows_without_grouping_key_are_skipped() {
        let batch = text_batch(
            &HEADER,
            &[
                vec![None, Some("240315100000"), Some("81"), Some("120"), Some("127.0"), Some("37.0"), Some("0"), Some("a.csv")],
                vec![Some("3"), Some("240315100000"), Some("81"), Some("120"), Some("127.0"), Some("37.0"), Some("0"), None],
                vec![Some(" "), Some("240315100000"), Some("81"), Some("120"), Some("127.0"), Some("37.0"), Some("0"), Some("a.csv")],
                vec![Some("4"), Some("240315100000"), Some("81"), Some("120"), Some("127.0"), Some("37.0"), Some("0"), Some("a.csv")],
            ],
        );
        let table = Table::from_batches(vec![batch]).unwrap();
        let samples = read_samples(&table, &DEFAULT_EVENT_COLUMNS).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].event_id, "4");
        assert_eq!(samples[0].source, "a.csv");
    }

    #[test]
    fn missing_columns_reported() {
        let batch = text_batch(&["Num_event", "DateTime", "Speed"], &[]);
        let table = Table::from_batches(vec![batch]).unwrap();
        let err = read_samples(&table, &DEFAULT_EVENT_COLUMNS).unwrap_err();
        match err {
            Error::Schema { missing } => assert_eq!(
                missing,
                vec!["eventcode", "GPS_X", "GPS_Y", "GPS_Degree", "_source_file"]
            ),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn column_names_are_case_sensitive() {
        let mut header = HEADER;
        header[3] = "speed";
        let batch = text_batch(&header, &[]);
        let table = Table::from_batches(vec![batch]).unwrap();
        assert!(matches!(
            read_samples(&table, &DEFAULT_EVENT_COLUMNS),
            Err(Error::Schema { .. })
        ));
    }

    #[test]
    fn legacy_event_id_column_accepted() {
        let mut header = HEADER;
        header[0] = LEGACY_EVENT_ID_COLUMN;
        let batch = text_batch(
            &header,
            &[vec![Some("3"), Some("240315"), Some("82"), Some("90"), Some("127"), Some("37"), Some("0"), Some("b.csv")]],
        );
        let table = Table::from_batches(vec![batch]).unwrap();
        let samples = read_samples(&table, &DEFAULT_EVENT_COLUMNS).unwrap();
        assert_eq!(samples[0].event_id, "3");
    }
}

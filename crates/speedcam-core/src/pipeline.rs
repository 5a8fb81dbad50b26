//! Per-event camera matching and classification.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::aggregate::{EventGroup, aggregate};
use crate::classify::{SpeedClassifier, ViolationClass};
use crate::config::Config;
use crate::events::EventSample;
use crate::index::{CameraIndex, CameraMatch};

/// Slots tried for camera matching: +5 s, then t0, then +10 s.
///
/// The +5 s sample carries the steady-state heading; t0 may still be turning
/// into the road.
pub const MATCH_PRIORITY: [usize; 3] = [1, 0, 2];

/// One output row per event group.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub event_id: String,
    pub timestamp: String,
    pub event_code: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub heading: Option<f64>,
    pub camera_id: Option<String>,
    pub camera_row_index: Option<i64>,
    pub speed_limit: Option<f64>,
    pub t0: Option<f64>,
    pub t5: Option<f64>,
    pub t10: Option<f64>,
    pub class: Option<ViolationClass>,
    pub source: String,
    pub month: Option<u32>,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub samples: usize,
    pub groups: usize,
    pub matched: usize,
    pub indeterminate: usize,
    pub by_class: BTreeMap<ViolationClass, usize>,
}

impl RunSummary {
    fn record(&mut self, rec: &OutputRecord) {
        self.groups += 1;
        if rec.camera_id.is_some() {
            self.matched += 1;
        }
        match rec.class {
            Some(class) => *self.by_class.entry(class).or_default() += 1,
            None => self.indeterminate += 1,
        }
    }
}

/// All output rows sharing one month (or none).
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub month: Option<u32>,
    pub records: Vec<OutputRecord>,
}

impl Partition {
    /// Short label used for file names: `"03"` or `"other"`.
    pub fn label(&self) -> String {
        match self.month {
            Some(m) => format!("{m:02}"),
            None => "other".to_string(),
        }
    }
}

/// Matches event groups to cameras and classifies them.
///
/// Without an index the camera columns stay empty and every group is
/// indeterminate.
pub struct Pipeline<'a> {
    config: &'a Config,
    index: Option<&'a CameraIndex>,
    classifier: SpeedClassifier,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, index: Option<&'a CameraIndex>) -> Self {
        Self {
            config,
            index,
            classifier: SpeedClassifier::new(config),
        }
    }

    /// Aggregate samples and process every resulting group.
    pub fn run(&self, samples: Vec<EventSample>) -> (Vec<OutputRecord>, RunSummary) {
        let mut summary = RunSummary {
            samples: samples.len(),
            ..Default::default()
        };
        let groups = aggregate(samples, &self.config.event_codes);
        let records: Vec<OutputRecord> = groups
            .iter()
            .map(|g| {
                let rec = self.process_group(g);
                summary.record(&rec);
                rec
            })
            .collect();
        info!(
            samples = summary.samples,
            groups = summary.groups,
            matched = summary.matched,
            indeterminate = summary.indeterminate,
            "pipeline finished"
        );
        (records, summary)
    }

    /// Build the output row for one group.
    pub fn process_group(&self, group: &EventGroup) -> OutputRecord {
        let rep = group.representative();
        let [t0, t5, t10] = group.speeds();
        let camera = self.index.and_then(|idx| match_group(idx, group));
        let speed_limit = camera.and_then(|m| m.speed_limit());
        let class = self.classifier.classify(speed_limit, t0, t5, t10);
        debug!(
            source = %group.source,
            event_id = %group.event_id,
            camera = camera.map(|m| m.id()),
            ?class,
            "processed event"
        );

        OutputRecord {
            event_id: group.event_id.clone(),
            timestamp: rep.timestamp.clone(),
            event_code: rep.event_code.clone(),
            longitude: rep.longitude,
            latitude: rep.latitude,
            heading: rep.heading,
            camera_id: camera.map(|m| m.id().to_string()),
            camera_row_index: camera.map(|m| m.row_index()),
            speed_limit,
            t0,
            t5,
            t10,
            class,
            source: group.source.clone(),
            month: group.month(),
        }
    }
}

/// First camera found across the group's samples in [`MATCH_PRIORITY`] order.
///
/// Each sample with a heading is tried heading-constrained first, then
/// unconstrained.
pub fn match_group<'i>(index: &'i CameraIndex, group: &EventGroup) -> Option<CameraMatch<'i>> {
    MATCH_PRIORITY.iter().find_map(|&slot| {
        let sample = group.slot(slot)?;
        let (lon, lat) = (sample.longitude?, sample.latitude?);
        let constrained = sample
            .heading
            .and_then(|h| index.lookup(lon, lat, Some(h), true));
        constrained.or_else(|| index.lookup(lon, lat, sample.heading, false))
    })
}

/// Split records by month (ascending, residual last), each sorted by source
/// then event id.
pub fn partition_by_month(records: Vec<OutputRecord>) -> Vec<Partition> {
    let mut months: BTreeMap<u32, Vec<OutputRecord>> = BTreeMap::new();
    let mut other = Vec::new();
    for rec in records {
        match rec.month {
            Some(m) => months.entry(m).or_default().push(rec),
            None => other.push(rec),
        }
    }

    let mut partitions: Vec<Partition> = months
        .into_iter()
        .map(|(m, records)| Partition {
            month: Some(m),
            records,
        })
        .collect();
    if !other.is_empty() {
        partitions.push(Partition {
            month: None,
            records: other,
        });
    }
    for p in &mut partitions {
        p.records.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| compare_event_ids(&a.event_id, &b.event_id))
        });
    }
    partitions
}

/// Integer ids first in numeric order, then the rest in text order.
pub fn compare_event_ids(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<i64>().ok(), b.trim().parse::<i64>().ok()) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

//! Grouping of event samples into per-event windows.
//!
//! Each group holds at most the three earliest samples of one
//! `(source, event id)` pair: the onset (t0), +5 s and +10 s.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::events::EventSample;

/// Samples retained per group.
pub const GROUP_SLOTS: usize = 3;

/// The retained samples of one event, earliest first.
#[derive(Debug, Clone, PartialEq)]
pub struct EventGroup {
    pub source: String,
    pub event_id: String,
    samples: Vec<EventSample>,
}

impl EventGroup {
    /// Retained samples, never more than [`GROUP_SLOTS`] and never empty.
    pub fn samples(&self) -> &[EventSample] {
        &self.samples
    }

    /// Sample in slot `i` (0 = t0, 1 = +5 s, 2 = +10 s).
    pub fn slot(&self, i: usize) -> Option<&EventSample> {
        self.samples.get(i)
    }

    /// The earliest sample; its fields represent the whole event.
    pub fn representative(&self) -> &EventSample {
        &self.samples[0]
    }

    /// Speeds at t0, +5 s and +10 s; empty slots stay `None`.
    pub fn speeds(&self) -> [Option<f64>; GROUP_SLOTS] {
        [0, 1, 2].map(|i| self.slot(i).and_then(|s| s.speed))
    }

    /// Month of the representative sample, if resolvable.
    pub fn month(&self) -> Option<u32> {
        month_from_digits(&self.representative().timestamp_key)
    }
}

/// Month from a digits-only timestamp: characters 2..4, valid when 1..=12.
pub fn month_from_digits(digits: &str) -> Option<u32> {
    if digits.len() < 4 {
        return None;
    }
    digits
        .get(2..4)?
        .parse::<u32>()
        .ok()
        .filter(|m| (1..=12).contains(m))
}

/// Filter by event-type code, group by `(source, event id)`, and keep the
/// three earliest samples of each group.
///
/// Groups appear in order of their first sample. Samples with equal
/// timestamp keys keep their input order.
pub fn aggregate(samples: Vec<EventSample>, allowed_codes: &BTreeSet<i64>) -> Vec<EventGroup> {
    let total = samples.len();
    let mut slots: HashMap<(String, String), usize> = HashMap::new();
    let mut groups: Vec<(String, String, Vec<EventSample>)> = Vec::new();

    for sample in samples {
        if !sample
            .event_code_value()
            .is_some_and(|c| allowed_codes.contains(&c))
        {
            continue;
        }
        let key = (sample.source.clone(), sample.event_id.clone());
        match slots.get(&key) {
            Some(&i) => groups[i].2.push(sample),
            None => {
                slots.insert(key.clone(), groups.len());
                groups.push((key.0, key.1, vec![sample]));
            }
        }
    }

    let out: Vec<EventGroup> = groups
        .into_iter()
        .map(|(source, event_id, mut samples)| {
            // Vec::sort_by is stable.
            samples.sort_by(|a, b| a.timestamp_key.cmp(&b.timestamp_key));
            samples.truncate(GROUP_SLOTS);
            EventGroup {
                source,
                event_id,
                samples,
            }
        })
        .collect();
    debug!(samples = total, groups = out.len(), "aggregated events");
    out
}

//! Speed-violation classification over a t0 / +5 s / +10 s window.

use crate::config::Config;

/// Violation class assigned to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViolationClass {
    /// Not over the threshold at onset.
    BelowThreshold = 0,
    /// Over at +5 s, back under by +10 s.
    Decayed = 1,
    /// Over at both +5 s and +10 s.
    Sustained = 2,
    /// Over only at onset.
    Transient = 3,
}

impl ViolationClass {
    pub const ALL: [ViolationClass; 4] = [
        Self::BelowThreshold,
        Self::Decayed,
        Self::Sustained,
        Self::Transient,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BelowThreshold => "below_threshold",
            Self::Decayed => "decayed",
            Self::Sustained => "sustained",
            Self::Transient => "transient",
        }
    }
}

/// Deterministic classifier; `None` means indeterminate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedClassifier {
    delta: f64,
}

impl Default for SpeedClassifier {
    fn default() -> Self {
        Self { delta: 20.0 }
    }
}

impl SpeedClassifier {
    pub fn new(config: &Config) -> Self {
        Self {
            delta: config.violation_delta,
        }
    }

    /// Classify a window against a posted limit.
    ///
    /// The +5 s / +10 s samples are only consulted when t0 is already over the
    /// threshold. Dropping under at +5 s and climbing back over at +10 s is
    /// contradictory and stays indeterminate.
    pub fn classify(
        &self,
        limit: Option<f64>,
        t0: Option<f64>,
        t5: Option<f64>,
        t10: Option<f64>,
    ) -> Option<ViolationClass> {
        let (limit, t0) = (limit?, t0?);
        if t0 - limit < self.delta {
            return Some(ViolationClass::BelowThreshold);
        }
        let over5 = t5? - limit >= self.delta;
        let over10 = t10? - limit >= self.delta;
        match (over5, over10) {
            (true, true) => Some(ViolationClass::Sustained),
            (true, false) => Some(ViolationClass::Decayed),
            (false, false) => Some(ViolationClass::Transient),
            (false, true) => None,
        }
    }

    /// Same as [`classify`](Self::classify) with the window as an array.
    pub fn classify_window(
        &self,
        limit: Option<f64>,
        speeds: [Option<f64>; 3],
    ) -> Option<ViolationClass> {
        let [t0, t5, t10] = speeds;
        self.classify(limit, t0, t5, t10)
    }
}

use serde::Serialize;

use crate::labels::LabelSet;

/// A single observed value with its labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub value: f64,
    pub labels: LabelSet,
}

impl Measurement {
    pub fn new(value: f64, labels: LabelSet) -> Self {
        Self { value, labels }
    }
}

/// Lazy, finite sequence of measurements produced by one collection pass.
pub type Measurements = Box<dyn Iterator<Item = Measurement> + Send>;

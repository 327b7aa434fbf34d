use polars::prelude::*;

/// Columnar buffer for the aggregated detector-hit table.
///
/// Columns must always stay the same length, so rows are only ever added
/// through `push_hit`.
#[derive(Debug, Clone, Default)]
pub struct HitData {
    events: Vec<i64>,
    det_ids: Vec<i64>,
    energies: Vec<f64>,
}

impl HitData {
    pub fn push_hit(&mut self, event: i64, det_id: i64, energy: f64) {
        self.events.push(event);
        self.det_ids.push(det_id);
        self.energies.push(energy);
    }

    pub fn rows(&self) -> usize {
        self.events.len()
    }

    pub fn convert_to_series(self) -> Vec<Series> {
        vec![
            Series::new("event", self.events),
            Series::new("detID", self.det_ids),
            Series::new("energy", self.energies),
        ]
    }

    pub fn into_dataframe(self) -> Result<DataFrame, PolarsError> {
        DataFrame::new(self.convert_to_series())
    }
}

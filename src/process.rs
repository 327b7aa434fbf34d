use log::info;
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};

use super::aggregate::aggregate;
use super::error::PostProcError;
use super::step_source::{ParquetSteps, StepSource, materialize};

//Fields read from the step ntuple; `step` is carried along but unused by the aggregation
pub const STEP_FIELDS: [&str; 5] = ["event", "step", "Edep", "volID", "iRep"];

#[derive(Debug, Clone)]
pub struct ProcessParams {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub target_vol_id: i64,
    pub pct_res_at_1mev: f64,
    pub seed: Option<u64>,
    pub row_range: Option<Range<usize>>,
}

/// Run the whole pipeline for one file: materialize the step table, aggregate
/// and smear, write the detector-hit table to parquet.
///
/// A row window is applied verbatim, not snapped to event boundaries, so a
/// caller cycling through windows can split one event's steps across two of
/// them and get two partial aggregates.
pub fn process_file(params: &ProcessParams) -> Result<(), PostProcError> {
    let steps = ParquetSteps::open(&params.input_path)?;

    let table = materialize(&steps, &STEP_FIELDS, params.row_range.as_ref())?;
    info!(
        "Materialized {} of {} steps",
        table.height(),
        steps.row_count()?
    );

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let hits = aggregate(
        &table,
        params.target_vol_id,
        params.pct_res_at_1mev,
        &mut rng,
    )?;
    write_dataframe(hits, &params.output_path)?;

    Ok(())
}

fn write_dataframe(mut df: DataFrame, filepath: &Path) -> Result<(), PolarsError> {
    info!("Writing dataframe to disk at {}", filepath.display());
    let mut output_file = File::create(filepath)?;
    ParquetWriter::new(&mut output_file).finish(&mut df)?;
    Ok(())
}

/// Parse a `START:END` row window from the command line.
pub fn parse_row_range(text: &str) -> Result<Range<usize>, PostProcError> {
    let (start, end) = text.split_once(':').ok_or_else(|| {
        PostProcError::Usage(format!("row range must look like START:END, got '{}'", text))
    })?;
    let start: usize = start
        .parse()
        .map_err(|_| PostProcError::Usage(format!("bad row range start '{}'", start)))?;
    let end: usize = end
        .parse()
        .map_err(|_| PostProcError::Usage(format!("bad row range end '{}'", end)))?;
    if start >= end {
        return Err(PostProcError::Usage(format!(
            "row range '{}' selects no rows",
            text
        )));
    }
    Ok(start..end)
}

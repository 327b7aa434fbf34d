use log::info;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::PathBuf;

use super::error::PostProcError;
use super::histogram::Histogram;

#[derive(Debug, Clone)]
pub struct SpectraParams {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub number_of_bins: usize,
    pub range: (f64, f64),
    pub energy_scale: f64,
}

/// Histogram the smeared energy of each detector in a processed hit table
/// and write the spectra to a JSON file for plotting.
pub fn write_spectra(params: &SpectraParams) -> Result<(), PostProcError> {
    let lf = LazyFrame::scan_parquet(&params.input_path, ScanArgsParquet::default())?;

    let det_ids = distinct_det_ids(&lf)?;
    info!(
        "{} detectors in {}",
        det_ids.len(),
        params.input_path.display()
    );

    let mut spectra: Vec<Histogram> = Vec::with_capacity(det_ids.len());
    for det in det_ids {
        let mut hist = Histogram::new(
            &format!("detector {}", det),
            params.number_of_bins,
            params.range,
        );
        let detector_lf = lf
            .clone()
            .filter(col("detID").eq(lit(det)))
            .select([(col("energy") * lit(params.energy_scale)).alias("energy")]);
        hist.fill_from_lazyframe(detector_lf, "energy")?;
        info!(
            "detector {}: {} entries, {} underflow, {} overflow",
            det,
            hist.entries(),
            hist.underflow,
            hist.overflow
        );
        spectra.push(hist);
    }

    let file = File::create(&params.output_path)?;
    serde_json::to_writer_pretty(file, &spectra)?;
    info!(
        "Wrote {} spectra to {}",
        spectra.len(),
        params.output_path.display()
    );

    Ok(())
}

fn distinct_det_ids(lf: &LazyFrame) -> Result<Vec<i64>, PostProcError> {
    let df = lf.clone().select([col("detID")]).collect()?;
    let series = df.column("detID")?.cast(&DataType::Int64)?;
    let mut ids: BTreeSet<i64> = BTreeSet::new();
    for det in series.i64()? {
        if let Some(det) = det {
            ids.insert(det);
        }
    }
    Ok(ids.into_iter().collect())
}

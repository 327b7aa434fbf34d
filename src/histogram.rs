use polars::prelude::*;
use std::time::Instant;

/// Fixed-range 1D histogram with underflow/overflow counters.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Histogram {
    pub name: String,
    pub bins: Vec<u64>,
    pub range: (f64, f64),
    pub bin_width: f64,
    pub underflow: u64,
    pub overflow: u64,
}

impl Histogram {
    // Create a new Histogram with specified number of bins over [min, max)
    pub fn new(name: &str, number_of_bins: usize, range: (f64, f64)) -> Self {
        Histogram {
            name: name.to_string(),
            bins: vec![0; number_of_bins],
            range,
            bin_width: (range.1 - range.0) / number_of_bins as f64,
            underflow: 0,
            overflow: 0,
        }
    }

    // Add a value to the histogram
    pub fn fill(&mut self, value: f64) {
        if value >= self.range.0 && value < self.range.1 {
            let index = ((value - self.range.0) / self.bin_width) as usize;
            if index < self.bins.len() {
                self.bins[index] += 1;
            }
        } else if value >= self.range.1 {
            self.overflow += 1;
        } else {
            self.underflow += 1;
        }
    }

    pub fn entries(&self) -> u64 {
        self.bins.iter().sum()
    }

    // Get the bin edges
    pub fn get_bin_edges(&self) -> Vec<f64> {
        (0..=self.bins.len())
            .map(|i| self.range.0 + i as f64 * self.bin_width)
            .collect()
    }

    /// Fill from a lazyframe column, binning inside the lazy engine so the
    /// values never have to be materialized one by one.
    pub fn fill_from_lazyframe(&mut self, lf: LazyFrame, column: &str) -> PolarsResult<()> {
        let start = Instant::now();

        let (min_val, max_val) = self.range;
        let bin_width = self.bin_width;

        let raw_bin = ((col(column) - lit(min_val)) / lit(bin_width)).cast(DataType::Int32);

        //-2 and -1 are sentinel bins for underflow and overflow
        let bin_index = when(col(column).lt(lit(min_val)))
            .then(lit(-2))
            .when(col(column).gt_eq(lit(max_val)))
            .then(lit(-1))
            .otherwise(raw_bin)
            .alias("bin_index");

        let df = lf
            .select([col(column)])
            .with_columns([bin_index])
            .group_by([col("bin_index")])
            .agg([col("bin_index").count().alias("count")])
            .sort(["bin_index"], Default::default())
            .collect()?;

        let bin_indices = df.column("bin_index")?.i32()?;
        let counts = df.column("count")?.u32()?;

        for (bin, count) in bin_indices.into_iter().zip(counts) {
            if let (Some(bin), Some(count)) = (bin, count) {
                match bin {
                    -2 => self.underflow += count as u64,
                    -1 => self.overflow += count as u64,
                    i if i >= 0 && (i as usize) < self.bins.len() => {
                        self.bins[i as usize] += count as u64;
                    }
                    _ => {}
                }
            }
        }

        log::info!("Filled histogram {} in {:?}", self.name, start.elapsed());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_boundaries() {
        let mut hist = Histogram::new("energy", 10, (0.0, 1.0));
        hist.fill(0.0); // first bin, inclusive lower edge
        hist.fill(0.55);
        hist.fill(1.0); // upper edge counts as overflow
        hist.fill(-0.1);

        assert_eq!(hist.bins[0], 1);
        assert_eq!(hist.bins[5], 1);
        assert_eq!(hist.overflow, 1);
        assert_eq!(hist.underflow, 1);
        assert_eq!(hist.entries(), 2);
    }

    #[test]
    fn test_bin_edges_span_range() {
        let hist = Histogram::new("energy", 4, (0.0, 2.0));
        let edges = hist.get_bin_edges();
        assert_eq!(edges.len(), 5);
        assert_eq!(edges[0], 0.0);
        assert_eq!(edges[4], 2.0);
        assert!((hist.bin_width - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_lazy_fill_matches_scalar_fill() {
        let values = [-0.2f64, 0.01, 0.15, 0.15, 0.49, 0.77, 1.0, 2.3];
        let df = df!("energy" => values).unwrap();

        let mut lazy = Histogram::new("lazy", 20, (0.0, 1.0));
        lazy.fill_from_lazyframe(df.lazy(), "energy").unwrap();

        let mut scalar = Histogram::new("scalar", 20, (0.0, 1.0));
        for value in values {
            scalar.fill(value);
        }

        assert_eq!(lazy.bins, scalar.bins);
        assert_eq!(lazy.underflow, scalar.underflow);
        assert_eq!(lazy.overflow, scalar.overflow);
    }
}

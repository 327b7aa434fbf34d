use polars::prelude::*;
use std::ops::Range;
use std::path::Path;

use super::error::PostProcError;

/// Read access to the named columns of a step-wise record table.
///
/// Nothing is read from the backing store until `read_range` is called, so a
/// caller can pick a row window to bound memory on large step tables.
pub trait StepSource {
    /// Number of rows (steps) in the underlying table.
    fn row_count(&self) -> Result<usize, PostProcError>;

    /// Materialize a single column, restricted to a contiguous row range when
    /// one is given. Row order is preserved.
    fn read_range(
        &self,
        field: &str,
        rows: Option<&Range<usize>>,
    ) -> Result<Series, PostProcError>;
}

fn check_range(range: &Range<usize>, rows: usize) -> Result<(), PostProcError> {
    if range.start > range.end || range.end > rows {
        return Err(PostProcError::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            rows,
        });
    }
    Ok(())
}

/// Step records backed by a parquet file, scanned lazily.
pub struct ParquetSteps {
    lazyframe: LazyFrame,
    columns: Vec<String>,
    rows: usize,
}

impl ParquetSteps {
    pub fn open(path: &Path) -> Result<Self, PostProcError> {
        let args = ScanArgsParquet::default();
        let lazyframe = LazyFrame::scan_parquet(path, args)?;
        let columns = Self::get_column_names_from_lazyframe(&lazyframe)?;
        let rows = Self::count_rows(&lazyframe)?;
        log::info!("Opened {} with {} steps", path.display(), rows);
        Ok(Self {
            lazyframe,
            columns,
            rows,
        })
    }

    pub fn get_column_names(&self) -> &[String] {
        &self.columns
    }

    fn get_column_names_from_lazyframe(
        lazyframe: &LazyFrame,
    ) -> Result<Vec<String>, PostProcError> {
        let df = lazyframe.clone().limit(1).collect()?;
        let columns = df
            .get_column_names_owned()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        Ok(columns)
    }

    fn count_rows(lazyframe: &LazyFrame) -> Result<usize, PostProcError> {
        let df = lazyframe.clone().select([len().alias("rows")]).collect()?;
        let n = df.column("rows")?.u32()?.get(0).unwrap_or(0);
        Ok(n as usize)
    }
}

impl StepSource for ParquetSteps {
    fn row_count(&self) -> Result<usize, PostProcError> {
        Ok(self.rows)
    }

    fn read_range(
        &self,
        field: &str,
        rows: Option<&Range<usize>>,
    ) -> Result<Series, PostProcError> {
        if !self.columns.iter().any(|name| name == field) {
            return Err(PostProcError::MissingField(field.to_string()));
        }

        let mut lf = self.lazyframe.clone().select([col(field)]);
        if let Some(range) = rows {
            check_range(range, self.rows)?;
            lf = lf.slice(range.start as i64, (range.end - range.start) as IdxSize);
        }

        let df = lf.collect()?;
        Ok(df.column(field)?.clone())
    }
}

/// In-memory backing, used by tests and by callers already holding a table.
impl StepSource for DataFrame {
    fn row_count(&self) -> Result<usize, PostProcError> {
        Ok(self.height())
    }

    fn read_range(
        &self,
        field: &str,
        rows: Option<&Range<usize>>,
    ) -> Result<Series, PostProcError> {
        let series = self
            .column(field)
            .map_err(|_| PostProcError::MissingField(field.to_string()))?;
        match rows {
            Some(range) => {
                check_range(range, self.height())?;
                Ok(series.slice(range.start as i64, range.end - range.start))
            }
            None => Ok(series.clone()),
        }
    }
}

/// Assemble the requested columns into one row-oriented table, reading all
/// rows when no range is given.
pub fn materialize<S: StepSource>(
    source: &S,
    fields: &[&str],
    rows: Option<&Range<usize>>,
) -> Result<DataFrame, PostProcError> {
    let mut columns: Vec<Series> = Vec::with_capacity(fields.len());
    for field in fields {
        let series = source.read_range(field, rows)?;
        if let Some(first) = columns.first() {
            if series.len() != first.len() {
                return Err(PostProcError::LengthMismatch {
                    field: (*field).to_string(),
                    expected: first.len(),
                    found: series.len(),
                });
            }
        }
        columns.push(series);
    }
    Ok(DataFrame::new(columns)?)
}

use polars::error::PolarsError;
use std::error::Error;
use std::fmt::Display;

#[derive(Debug)]
pub enum PostProcError {
    Usage(String),
    MissingField(String),
    LengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },
    RangeOutOfBounds {
        start: usize,
        end: usize,
        rows: usize,
    },
    Domain(String),
    DataFrame(PolarsError),
    File(std::io::Error),
    Json(serde_json::Error),
}

impl From<PolarsError> for PostProcError {
    fn from(err: PolarsError) -> PostProcError {
        PostProcError::DataFrame(err)
    }
}

impl From<std::io::Error> for PostProcError {
    fn from(err: std::io::Error) -> PostProcError {
        PostProcError::File(err)
    }
}

impl From<serde_json::Error> for PostProcError {
    fn from(err: serde_json::Error) -> PostProcError {
        PostProcError::Json(err)
    }
}

impl Display for PostProcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostProcError::Usage(x) => write!(f, "Bad argument: {}", x),
            PostProcError::MissingField(x) => {
                write!(f, "Input table is missing required field '{}'", x)
            }
            PostProcError::LengthMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "Column '{}' has {} rows where {} were expected",
                field, found, expected
            ),
            PostProcError::RangeOutOfBounds { start, end, rows } => write!(
                f,
                "Row range {}:{} exceeds the table ({} rows)",
                start, end, rows
            ),
            PostProcError::Domain(x) => write!(f, "Invalid parameter: {}", x),
            PostProcError::DataFrame(x) => write!(f, "Processing had an error using polars: {}", x),
            PostProcError::File(x) => write!(f, "Processing had a file I/O error: {}", x),
            PostProcError::Json(x) => write!(f, "Processing had an error writing JSON: {}", x),
        }
    }
}

impl Error for PostProcError {}

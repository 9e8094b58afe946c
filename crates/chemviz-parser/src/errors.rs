use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("upload did not contain a header row")]
    EmptyInput,

    #[error("CSV error: {source}")]
    Csv {
        #[source]
        source: csv::Error,
    },

    #[error("data row {line_index} invalid: {message}")]
    DataRow { line_index: u64, message: String },
}

impl From<csv::Error> for ParserError {
    fn from(source: csv::Error) -> Self {
        ParserError::Csv { source }
    }
}

/// Required columns absent from an upload, listed in required-set order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub missing: Vec<&'static str>,
}

impl SchemaError {
    pub fn new(missing: Vec<&'static str>) -> Self {
        Self { missing }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid CSV format. Missing columns: {}",
            self.missing.join(", ")
        )
    }
}

impl std::error::Error for SchemaError {}

use chemviz_parser::{ParserError, SchemaError};
use polars::error::PolarsError;
use thiserror::Error;

use crate::history::HistoryError;
use crate::ingestion::IngestStage;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Malformed CSV upload: {0}")]
    Malformed(#[from] ParserError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Failed to aggregate upload: {0}")]
    Aggregation(#[from] PolarsError),

    #[error("History store failure: {0}")]
    Infrastructure(#[from] HistoryError),
}

impl IngestError {
    /// Whether the upload itself was at fault, as opposed to the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::MissingFile | IngestError::Malformed(_) | IngestError::Schema(_)
        )
    }

    /// The last stage the ingestion reached before failing.
    pub fn stage(&self) -> IngestStage {
        match self {
            IngestError::MissingFile | IngestError::Malformed(_) => IngestStage::Received,
            IngestError::Schema(_) => IngestStage::Validated,
            IngestError::Aggregation(_) => IngestStage::Sanitized,
            IngestError::Infrastructure(_) => IngestStage::Aggregated,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

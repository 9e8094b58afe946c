use std::fmt;
use std::sync::Arc;

use chemviz_parser::{parse_equipment_csv, RawTable, SchemaValidator};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::aggregate::Aggregator;
use crate::error::{IngestError, Result};
use crate::history::{HistoryEntry, HistoryRecord, HistoryStore};
use crate::sanitize::NumericSanitizer;
use crate::types::{SanitizedRow, UploadSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Received,
    Validated,
    Sanitized,
    Aggregated,
    Persisted,
    Completed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::Validated => "validated",
            IngestStage::Sanitized => "sanitized",
            IngestStage::Aggregated => "aggregated",
            IngestStage::Persisted => "persisted",
            IngestStage::Completed => "completed",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UploadedFile<'a> {
    pub filename: &'a str,
    pub contents: &'a [u8],
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub summary: UploadSummary,
    #[serde(rename = "raw_data")]
    pub rows: Vec<SanitizedRow>,
    #[serde(skip)]
    pub record: HistoryRecord,
}

/// Validate, sanitize, aggregate and record one upload.
pub struct IngestPipeline {
    validator: SchemaValidator,
    sanitizer: NumericSanitizer,
    aggregator: Aggregator,
    history: Arc<dyn HistoryStore>,
}

impl IngestPipeline {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self {
            validator: SchemaValidator::default(),
            sanitizer: NumericSanitizer::default(),
            aggregator: Aggregator,
            history,
        }
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Entry point for raw uploads. `None` means the request carried no file.
    pub async fn ingest_upload(&self, upload: Option<UploadedFile<'_>>) -> Result<IngestReport> {
        let Some(upload) = upload else {
            warn!(stage = %IngestStage::Received, "upload rejected: no file");
            return Err(IngestError::MissingFile);
        };

        info!(
            filename = upload.filename,
            bytes = upload.contents.len(),
            hash = %content_hash(upload.contents),
            "upload received"
        );

        let table = parse_equipment_csv(upload.contents).map_err(|err| {
            warn!(filename = upload.filename, "upload rejected: {err}");
            IngestError::from(err)
        })?;

        self.ingest(upload.filename, table).await
    }

    pub async fn ingest(&self, filename: &str, table: RawTable) -> Result<IngestReport> {
        let span = info_span!("ingest", ingestion_id = %Uuid::new_v4(), filename);
        self.run(filename, table).instrument(span).await
    }

    async fn run(&self, filename: &str, table: RawTable) -> Result<IngestReport> {
        debug!(stage = %IngestStage::Received, rows = table.height());

        if let Err(err) = self.validator.validate(&table.headers) {
            warn!(missing = ?err.missing, "upload rejected: {err}");
            return Err(err.into());
        }
        debug!(stage = %IngestStage::Validated);

        let rows = self.sanitizer.sanitize(table);
        debug!(stage = %IngestStage::Sanitized, rows = rows.len());

        let summary = self
            .aggregator
            .summarize(rows.iter().map(|row| &row.equipment))?;
        debug!(stage = %IngestStage::Aggregated, total_count = summary.total_count);

        let entry = HistoryEntry::new(filename, &summary, Utc::now());
        let record = self.history.append(entry).await.map_err(|err| {
            tracing::error!("history append failed: {err}");
            IngestError::from(err)
        })?;
        debug!(stage = %IngestStage::Persisted, sequence = record.sequence);

        info!(
            stage = %IngestStage::Completed,
            total_count = summary.total_count,
            categories = summary.type_distribution.len(),
            "ingestion completed"
        );

        Ok(IngestReport {
            summary,
            rows,
            record,
        })
    }
}

fn content_hash(contents: &[u8]) -> String {
    blake3::hash(contents).to_hex().to_string()
}

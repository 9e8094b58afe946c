//! Bounded rolling history of recent ingestions.
//!
//! A store keeps at most [`HISTORY_LIMIT`] records. `append` inserts and trims
//! inside one critical section, so readers never observe more than the limit
//! and a record is never evicted by its own insertion.

mod memory;
#[cfg(feature = "runtime")]
mod postgres;

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::UploadSummary;

pub use memory::InMemoryHistoryStore;
#[cfg(feature = "runtime")]
pub use postgres::PostgresHistoryStore;

pub const HISTORY_LIMIT: usize = 5;

pub const HISTORY_DATE_FORMAT: &str = "%b %d, %H:%M";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub total_count: usize,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
}

impl HistoryEntry {
    pub fn new(
        filename: impl Into<String>,
        summary: &UploadSummary,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            filename: filename.into(),
            uploaded_at,
            total_count: summary.total_count,
            avg_flowrate: summary.avg_flowrate,
            avg_pressure: summary.avg_pressure,
            avg_temperature: summary.avg_temperature,
        }
    }
}

/// An entry as persisted, with the insertion sequence the store assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub sequence: i64,
    #[serde(flatten)]
    pub entry: HistoryEntry,
}

impl HistoryRecord {
    /// Orders newest first: later `uploaded_at`, then higher sequence.
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        other
            .entry
            .uploaded_at
            .cmp(&self.entry.uploaded_at)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[cfg(feature = "runtime")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored history record {sequence} is invalid: {message}")]
    InvalidRecord { sequence: i64, message: String },

    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Inserts `entry` and trims the store back to [`HISTORY_LIMIT`] records.
    async fn append(&self, entry: HistoryEntry) -> Result<HistoryRecord, HistoryError>;

    /// Up to `min(limit, HISTORY_LIMIT)` records, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, HistoryError>;

    async fn count(&self) -> Result<usize, HistoryError>;
}

/// History row as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryItem {
    pub filename: String,
    pub total: usize,
    pub avg_temp: f64,
    pub date: String,
}

impl HistoryItem {
    pub fn from_record(record: &HistoryRecord, timezone: Tz) -> Self {
        Self {
            filename: record.entry.filename.clone(),
            total: record.entry.total_count,
            avg_temp: record.entry.avg_temperature,
            date: record
                .entry
                .uploaded_at
                .with_timezone(&timezone)
                .format(HISTORY_DATE_FORMAT)
                .to_string(),
        }
    }
}

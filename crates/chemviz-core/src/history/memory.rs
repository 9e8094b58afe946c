use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{HistoryEntry, HistoryError, HistoryRecord, HistoryStore, HISTORY_LIMIT};

#[derive(Debug, Default)]
struct HistoryState {
    // newest first, never longer than HISTORY_LIMIT
    records: Vec<HistoryRecord>,
    next_sequence: i64,
}

/// Process-local history store guarded by a single async mutex.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    state: Mutex<HistoryState>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, mut entry: HistoryEntry) -> Result<HistoryRecord, HistoryError> {
        let mut state = self.state.lock().await;

        if let Some(newest) = state.records.first() {
            if entry.uploaded_at < newest.entry.uploaded_at {
                entry.uploaded_at = newest.entry.uploaded_at;
            }
        }

        state.next_sequence += 1;
        let record = HistoryRecord {
            sequence: state.next_sequence,
            entry,
        };

        state.records.push(record.clone());
        state.records.sort_by(HistoryRecord::recency_cmp);
        state.records.truncate(HISTORY_LIMIT);

        tracing::debug!(
            sequence = record.sequence,
            retained = state.records.len(),
            "history entry appended"
        );
        Ok(record)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, HistoryError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .iter()
            .take(limit.min(HISTORY_LIMIT))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize, HistoryError> {
        Ok(self.state.lock().await.records.len())
    }
}

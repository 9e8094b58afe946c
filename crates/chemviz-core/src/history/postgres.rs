use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::{HistoryEntry, HistoryError, HistoryRecord, HistoryStore, HISTORY_LIMIT};
use crate::db::DbPool;

const HISTORY_LOCK_KEY: i64 = 0x4348_454D_5649_5A; // "CHEMVIZ"

/// History store backed by the `upload_history` table.
///
/// Appends run in one transaction holding a transaction-scoped advisory lock,
/// so concurrent writers are serialized and the trim commits together with
/// the insert.
#[derive(Debug, Clone)]
pub struct PostgresHistoryStore {
    pool: DbPool,
}

impl PostgresHistoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> Result<HistoryRecord, HistoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(HISTORY_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            r#"
            INSERT INTO upload_history (
                filename,
                uploaded_at,
                total_count,
                avg_flowrate,
                avg_pressure,
                avg_temperature
            ) VALUES (
                $1,
                GREATEST($2, COALESCE((SELECT MAX(uploaded_at) FROM upload_history), $2)),
                $3, $4, $5, $6
            )
            RETURNING sequence, uploaded_at
            "#,
        )
        .bind(&entry.filename)
        .bind(entry.uploaded_at)
        .bind(entry.total_count as i64)
        .bind(entry.avg_flowrate)
        .bind(entry.avg_pressure)
        .bind(entry.avg_temperature)
        .fetch_one(&mut *tx)
        .await?;

        let sequence: i64 = row.try_get("sequence")?;
        let uploaded_at: DateTime<Utc> = row.try_get("uploaded_at")?;

        let evicted = sqlx::query(
            r#"
            DELETE FROM upload_history
            WHERE sequence NOT IN (
                SELECT sequence
                FROM upload_history
                ORDER BY uploaded_at DESC, sequence DESC
                LIMIT $1
            )
            "#,
        )
        .bind(HISTORY_LIMIT as i64)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::debug!(sequence, evicted, "history entry appended");
        Ok(HistoryRecord {
            sequence,
            entry: HistoryEntry {
                uploaded_at,
                ..entry
            },
        })
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, HistoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                sequence,
                filename,
                uploaded_at,
                total_count,
                avg_flowrate,
                avg_pressure,
                avg_temperature
            FROM upload_history
            ORDER BY uploaded_at DESC, sequence DESC
            LIMIT $1
            "#,
        )
        .bind(limit.min(HISTORY_LIMIT) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self) -> Result<usize, HistoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

fn record_from_row(row: &PgRow) -> Result<HistoryRecord, HistoryError> {
    let sequence: i64 = row.try_get("sequence")?;
    let total_count: i64 = row.try_get("total_count")?;
    let total_count = usize::try_from(total_count).map_err(|_| HistoryError::InvalidRecord {
        sequence,
        message: format!("negative total_count {total_count}"),
    })?;

    Ok(HistoryRecord {
        sequence,
        entry: HistoryEntry {
            filename: row.try_get("filename")?,
            uploaded_at: row.try_get("uploaded_at")?,
            total_count,
            avg_flowrate: row.try_get("avg_flowrate")?,
            avg_pressure: row.try_get("avg_pressure")?,
            avg_temperature: row.try_get("avg_temperature")?,
        },
    })
}

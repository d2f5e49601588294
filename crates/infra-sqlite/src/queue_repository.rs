// SQLite QueueRepository Implementation

use crate::error::map_sqlx_error;
use crate::transaction::SqliteQueueTransaction;
use async_trait::async_trait;
use queueease_core::domain::{EntryStatus, QueueEntry};
use queueease_core::error::{AppError, Result};
use queueease_core::port::{
    ChangeEvent, ChangeKind, ChangeNotifier, QueueRepository, QueueRepositoryTransaction,
    TransactionalQueueRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;

const JOIN_TX_BEGIN: &str = "BEGIN IMMEDIATE";

pub(crate) const ENTRY_COLUMNS: &str =
    "id, shop_id, customer_id, status, joined_at, called_at, completed_at, cancelled_at, notes";

pub struct SqliteQueueRepository {
    pool: SqlitePool,
    notifier: Arc<dyn ChangeNotifier>,
}

impl SqliteQueueRepository {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { pool, notifier }
    }

    async fn fetch_entries(&self, sql: &str, shop_id: &str) -> Result<Vec<QueueEntry>> {
        let rows = sqlx::query_as::<_, QueueEntryRow>(sql)
            .bind(shop_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(QueueEntryRow::into_entry).collect()
    }

    async fn current_status(&self, id: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT status FROM queue_entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    /// Explain why a conditional update touched no row
    async fn explain_miss(&self, id: &str, wanted: EntryStatus) -> AppError {
        match self.current_status(id).await {
            Err(e) => e,
            Ok(None) => AppError::NotFound(format!("Queue entry {} not found", id)),
            Ok(Some(status)) => AppError::InvalidState(format!(
                "Cannot update entry {} from {} to {}",
                id, status, wanted
            )),
        }
    }

    fn publish_update(&self, id: &str, shop_id: String) {
        self.notifier
            .publish(ChangeEvent::entry(ChangeKind::Update, id, shop_id));
    }
}

#[async_trait]
impl QueueRepository for SqliteQueueRepository {
    async fn insert(&self, entry: &QueueEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO queue_entries (
                id, shop_id, customer_id, status, joined_at,
                called_at, completed_at, cancelled_at, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.shop_id)
        .bind(&entry.customer_id)
        .bind(entry.status.as_str())
        .bind(entry.joined_at)
        .bind(entry.called_at)
        .bind(entry.completed_at)
        .bind(entry.cancelled_at)
        .bind(&entry.notes)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.notifier
            .publish(ChangeEvent::entry(ChangeKind::Insert, &entry.id, &entry.shop_id));
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<QueueEntry>> {
        let sql = format!("SELECT {} FROM queue_entries WHERE id = ?", ENTRY_COLUMNS);
        let row = sqlx::query_as::<_, QueueEntryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(QueueEntryRow::into_entry).transpose()
    }

    async fn find_active_for_customer(&self, customer_id: &str) -> Result<Option<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries \
             WHERE customer_id = ? AND status IN ('waiting', 'in_service') LIMIT 1",
            ENTRY_COLUMNS
        );
        let row = sqlx::query_as::<_, QueueEntryRow>(&sql)
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(QueueEntryRow::into_entry).transpose()
    }

    async fn list_waiting(&self, shop_id: &str) -> Result<Vec<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries \
             WHERE shop_id = ? AND status = 'waiting' ORDER BY joined_at ASC, id ASC",
            ENTRY_COLUMNS
        );
        self.fetch_entries(&sql, shop_id).await
    }

    async fn list_in_service(&self, shop_id: &str) -> Result<Vec<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries \
             WHERE shop_id = ? AND status = 'in_service' ORDER BY called_at ASC, id ASC",
            ENTRY_COLUMNS
        );
        self.fetch_entries(&sql, shop_id).await
    }

    async fn count_waiting(&self, shop_id: &str) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_entries WHERE shop_id = ? AND status = 'waiting'",
        )
        .bind(shop_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_status(
        &self,
        id: &str,
        expected: EntryStatus,
        new_status: EntryStatus,
        at: i64,
    ) -> Result<()> {
        let column = match new_status {
            EntryStatus::InService => "called_at",
            EntryStatus::Completed => "completed_at",
            EntryStatus::Cancelled => "cancelled_at",
            EntryStatus::Waiting => {
                return Err(AppError::InvalidState(format!(
                    "Entry {} cannot return to waiting",
                    id
                )))
            }
        };

        // Compare-and-swap: only applies while the row is still in `expected`
        let sql = format!(
            "UPDATE queue_entries SET status = ?, {} = ? \
             WHERE id = ? AND status = ? RETURNING shop_id",
            column
        );
        let shop_id: Option<String> = sqlx::query_scalar(&sql)
            .bind(new_status.as_str())
            .bind(at)
            .bind(id)
            .bind(expected.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match shop_id {
            Some(shop_id) => {
                self.publish_update(id, shop_id);
                Ok(())
            }
            None => Err(self.explain_miss(id, new_status).await),
        }
    }

    async fn start_service(
        &self,
        id: &str,
        shop_id: &str,
        at: i64,
        exclusive: bool,
    ) -> Result<()> {
        // The NOT EXISTS guard runs inside the same write, so two operators
        // cannot both start a service at one shop
        let updated: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE queue_entries
            SET status = 'in_service', called_at = ?
            WHERE id = ? AND shop_id = ? AND status = 'waiting'
              AND (? = 0 OR NOT EXISTS (
                  SELECT 1 FROM queue_entries
                  WHERE shop_id = ? AND status = 'in_service'
              ))
            RETURNING shop_id
            "#,
        )
        .bind(at)
        .bind(id)
        .bind(shop_id)
        .bind(exclusive)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(shop_id) = updated {
            self.publish_update(id, shop_id);
            return Ok(());
        }

        match self.current_status(id).await? {
            None => Err(AppError::NotFound(format!("Queue entry {} not found", id))),
            Some(status) if status != EntryStatus::Waiting.as_str() => {
                Err(AppError::InvalidState(format!(
                    "Cannot update entry {} from {} to {}",
                    id,
                    status,
                    EntryStatus::InService
                )))
            }
            Some(_) if exclusive => Err(AppError::InvalidState(format!(
                "Shop {} is already serving another customer",
                shop_id
            ))),
            Some(_) => Err(AppError::InvalidState(format!(
                "Entry {} is not queued at shop {}",
                id, shop_id
            ))),
        }
    }

    async fn list_entries_between(
        &self,
        shop_id: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries \
             WHERE shop_id = ? AND joined_at >= ? AND joined_at < ? ORDER BY joined_at ASC, id ASC",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, QueueEntryRow>(&sql)
            .bind(shop_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(QueueEntryRow::into_entry).collect()
    }
}

#[async_trait]
impl TransactionalQueueRepository for SqliteQueueRepository {
    async fn begin_transaction(&self) -> Result<Box<dyn QueueRepositoryTransaction>> {
        // Take the write lock up front; a deferred read snapshot can't be upgraded under WAL
        let tx = self
            .pool
            .begin_with(JOIN_TX_BEGIN)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteQueueTransaction::new(
            tx,
            Arc::clone(&self.notifier),
        )))
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QueueEntryRow {
    id: String,
    shop_id: String,
    customer_id: String,
    status: String,
    joined_at: i64,
    called_at: Option<i64>,
    completed_at: Option<i64>,
    cancelled_at: Option<i64>,
    notes: Option<String>,
}

impl QueueEntryRow {
    pub(crate) fn into_entry(self) -> Result<QueueEntry> {
        let status: EntryStatus = self.status.parse().map_err(|_| {
            AppError::Database(format!(
                "Corrupt status '{}' on queue entry {}",
                self.status, self.id
            ))
        })?;

        Ok(QueueEntry {
            id: self.id,
            shop_id: self.shop_id,
            customer_id: self.customer_id,
            status,
            position: None,
            estimated_wait_time: None,
            joined_at: self.joined_at,
            called_at: self.called_at,
            completed_at: self.completed_at,
            cancelled_at: self.cancelled_at,
            notes: self.notes,
        })
    }
}

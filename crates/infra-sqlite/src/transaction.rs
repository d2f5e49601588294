// SQLite Transaction Implementation

use crate::error::map_sqlx_error;
use crate::queue_repository::{QueueEntryRow, ENTRY_COLUMNS};
use async_trait::async_trait;
use queueease_core::domain::QueueEntry;
use queueease_core::error::Result;
use queueease_core::port::{
    ChangeEvent, ChangeKind, ChangeNotifier, QueueRepositoryTransaction, Transaction,
};
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use std::sync::Arc;

/// Join transaction; inserts are announced only after commit
pub struct SqliteQueueTransaction<'a> {
    tx: SqlxTransaction<'a, Sqlite>,
    notifier: Arc<dyn ChangeNotifier>,
    inserted: Vec<ChangeEvent>,
}

impl<'a> SqliteQueueTransaction<'a> {
    pub fn new(tx: SqlxTransaction<'a, Sqlite>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            tx,
            notifier,
            inserted: Vec::new(),
        }
    }
}

#[async_trait]
impl Transaction for SqliteQueueTransaction<'_> {
    async fn commit(self: Box<Self>) -> Result<()> {
        let Self {
            tx,
            notifier,
            inserted,
        } = *self;
        tx.commit().await.map_err(map_sqlx_error)?;

        for event in inserted {
            notifier.publish(event);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl QueueRepositoryTransaction for SqliteQueueTransaction<'_> {
    async fn find_active_for_customer(&mut self, customer_id: &str) -> Result<Option<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries \
             WHERE customer_id = ? AND status IN ('waiting', 'in_service') LIMIT 1",
            ENTRY_COLUMNS
        );
        let row = sqlx::query_as::<_, QueueEntryRow>(&sql)
            .bind(customer_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(QueueEntryRow::into_entry).transpose()
    }

    async fn insert(&mut self, entry: &QueueEntry) -> Result<()> {
        // The partial unique index still rejects a racing second active entry
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
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        self.inserted
            .push(ChangeEvent::entry(ChangeKind::Insert, &entry.id, &entry.shop_id));
        Ok(())
    }
}

// Queue Repository Port (Interface)

use crate::domain::{EntryStatus, QueueEntry};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for QueueEntry persistence
///
/// Positions and estimated waits are never stored; entries come back with
/// `position = None` and are ranked by the estimator.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert a new entry
    ///
    /// # Errors
    /// - AppError::Conflict if the customer already holds an active entry
    async fn insert(&self, entry: &QueueEntry) -> Result<()>;

    /// Find entry by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<QueueEntry>>;

    /// Active (waiting or in_service) entry of a customer, any shop
    async fn find_active_for_customer(&self, customer_id: &str) -> Result<Option<QueueEntry>>;

    /// Waiting entries of a shop, ordered by `joined_at`, then `id`
    async fn list_waiting(&self, shop_id: &str) -> Result<Vec<QueueEntry>>;

    /// Entries of a shop currently in service (normally zero or one)
    async fn list_in_service(&self, shop_id: &str) -> Result<Vec<QueueEntry>>;

    /// Number of waiting entries of a shop
    async fn count_waiting(&self, shop_id: &str) -> Result<i64>;

    /// Conditional status change (compare-and-swap on `expected`)
    ///
    /// Sets the timestamp column belonging to `new_status` to `at`.
    ///
    /// # Errors
    /// - AppError::NotFound if the entry does not exist
    /// - AppError::InvalidState if the entry is no longer in `expected`
    async fn update_status(
        &self,
        id: &str,
        expected: EntryStatus,
        new_status: EntryStatus,
        at: i64,
    ) -> Result<()>;

    /// Waiting -> InService for call-next
    ///
    /// With `exclusive`, the update only applies while no other entry of
    /// `shop_id` is in service.
    ///
    /// # Errors
    /// - AppError::NotFound if the entry does not exist
    /// - AppError::InvalidState if the entry is not waiting, or `exclusive`
    ///   and the shop is already serving someone
    async fn start_service(&self, id: &str, shop_id: &str, at: i64, exclusive: bool)
        -> Result<()>;

    /// Entries of a shop that joined in `[from, to)`, ordered by `joined_at`
    async fn list_entries_between(&self, shop_id: &str, from: i64, to: i64)
        -> Result<Vec<QueueEntry>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{GeoPoint, Shop};
    use crate::error::AppError;
    use crate::port::change_notifier::{ChangeEvent, ChangeKind, ChangeNotifier};
    use crate::port::shop_repository::ShopRepository;
    use crate::port::transaction::{
        QueueRepositoryTransaction, Transaction, TransactionalQueueRepository,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryState {
        entries: Vec<QueueEntry>,
        shops: Vec<Shop>,
    }

    impl MemoryState {
        fn insert_entry(&mut self, entry: &QueueEntry) -> Result<()> {
            let duplicate = self
                .entries
                .iter()
                .any(|e| e.customer_id == entry.customer_id && e.is_active());
            if duplicate && entry.is_active() {
                return Err(AppError::Conflict(format!(
                    "Customer {} already has an active queue entry",
                    entry.customer_id
                )));
            }
            let mut stored = entry.clone();
            stored.position = None;
            stored.estimated_wait_time = None;
            self.entries.push(stored);
            Ok(())
        }
    }

    /// In-memory store implementing every persistence port
    ///
    /// Publishes change events the same way the SQLite adapter does.
    #[derive(Clone)]
    pub struct InMemoryQueueStore {
        state: Arc<Mutex<MemoryState>>,
        notifier: Arc<dyn ChangeNotifier>,
    }

    impl InMemoryQueueStore {
        pub fn new(notifier: Arc<dyn ChangeNotifier>) -> Self {
            Self {
                state: Arc::new(Mutex::new(MemoryState::default())),
                notifier,
            }
        }

        /// Raw stored entries in insertion order
        pub fn entries(&self) -> Vec<QueueEntry> {
            self.state.lock().unwrap().entries.clone()
        }

        fn with_state<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
            let mut state = self.state.lock().unwrap();
            f(&mut state)
        }
    }

    #[async_trait]
    impl QueueRepository for InMemoryQueueStore {
        async fn insert(&self, entry: &QueueEntry) -> Result<()> {
            self.with_state(|s| s.insert_entry(entry))?;
            self.notifier
                .publish(ChangeEvent::entry(ChangeKind::Insert, &entry.id, &entry.shop_id));
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<QueueEntry>> {
            Ok(self.with_state(|s| s.entries.iter().find(|e| e.id == id).cloned()))
        }

        async fn find_active_for_customer(&self, customer_id: &str) -> Result<Option<QueueEntry>> {
            Ok(self.with_state(|s| {
                s.entries
                    .iter()
                    .find(|e| e.customer_id == customer_id && e.is_active())
                    .cloned()
            }))
        }

        async fn list_waiting(&self, shop_id: &str) -> Result<Vec<QueueEntry>> {
            let mut waiting: Vec<QueueEntry> = self.with_state(|s| {
                s.entries
                    .iter()
                    .filter(|e| e.shop_id == shop_id && e.status == EntryStatus::Waiting)
                    .cloned()
                    .collect()
            });
            waiting.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
            Ok(waiting)
        }

        async fn list_in_service(&self, shop_id: &str) -> Result<Vec<QueueEntry>> {
            Ok(self.with_state(|s| {
                s.entries
                    .iter()
                    .filter(|e| e.shop_id == shop_id && e.status == EntryStatus::InService)
                    .cloned()
                    .collect()
            }))
        }

        async fn count_waiting(&self, shop_id: &str) -> Result<i64> {
            Ok(self.list_waiting(shop_id).await?.len() as i64)
        }

        async fn update_status(
            &self,
            id: &str,
            expected: EntryStatus,
            new_status: EntryStatus,
            at: i64,
        ) -> Result<()> {
            let shop_id = self.with_state(|s| -> Result<String> {
                let entry = s
                    .entries
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or_else(|| AppError::NotFound(format!("Queue entry {} not found", id)))?;
                if entry.status != expected {
                    return Err(AppError::InvalidState(format!(
                        "Cannot update entry {} from {} to {}",
                        id, entry.status, new_status
                    )));
                }
                match new_status {
                    EntryStatus::InService => entry.call(at)?,
                    EntryStatus::Completed => entry.complete(at)?,
                    EntryStatus::Cancelled => entry.cancel(at)?,
                    EntryStatus::Waiting => entry.ensure_transition(EntryStatus::Waiting)?,
                }
                Ok(entry.shop_id.clone())
            })?;
            self.notifier
                .publish(ChangeEvent::entry(ChangeKind::Update, id, shop_id));
            Ok(())
        }

        async fn start_service(
            &self,
            id: &str,
            shop_id: &str,
            at: i64,
            exclusive: bool,
        ) -> Result<()> {
            if exclusive {
                let busy = self.with_state(|s| {
                    s.entries
                        .iter()
                        .find(|e| {
                            e.shop_id == shop_id && e.status == EntryStatus::InService && e.id != id
                        })
                        .map(|e| e.id.clone())
                });
                if let Some(busy_id) = busy {
                    return Err(AppError::InvalidState(format!(
                        "Shop {} is already serving entry {}",
                        shop_id, busy_id
                    )));
                }
            }
            self.update_status(id, EntryStatus::Waiting, EntryStatus::InService, at)
                .await
        }

        async fn list_entries_between(
            &self,
            shop_id: &str,
            from: i64,
            to: i64,
        ) -> Result<Vec<QueueEntry>> {
            let mut entries: Vec<QueueEntry> = self.with_state(|s| {
                s.entries
                    .iter()
                    .filter(|e| e.shop_id == shop_id && e.joined_at >= from && e.joined_at < to)
                    .cloned()
                    .collect()
            });
            entries.sort_by_key(|e| e.joined_at);
            Ok(entries)
        }
    }

    /// Buffered inserts applied on commit
    pub struct InMemoryQueueTransaction {
        store: InMemoryQueueStore,
        pending: Vec<QueueEntry>,
    }

    #[async_trait]
    impl Transaction for InMemoryQueueTransaction {
        async fn commit(self: Box<Self>) -> Result<()> {
            let store = self.store.clone();
            store.with_state(|s| -> Result<()> {
                for entry in &self.pending {
                    s.insert_entry(entry)?;
                }
                Ok(())
            })?;
            for entry in &self.pending {
                store
                    .notifier
                    .publish(ChangeEvent::entry(ChangeKind::Insert, &entry.id, &entry.shop_id));
            }
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl QueueRepositoryTransaction for InMemoryQueueTransaction {
        async fn find_active_for_customer(
            &mut self,
            customer_id: &str,
        ) -> Result<Option<QueueEntry>> {
            if let Some(pending) = self
                .pending
                .iter()
                .find(|e| e.customer_id == customer_id && e.is_active())
            {
                return Ok(Some(pending.clone()));
            }
            self.store.find_active_for_customer(customer_id).await
        }

        async fn insert(&mut self, entry: &QueueEntry) -> Result<()> {
            self.pending.push(entry.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl TransactionalQueueRepository for InMemoryQueueStore {
        async fn begin_transaction(&self) -> Result<Box<dyn QueueRepositoryTransaction>> {
            Ok(Box::new(InMemoryQueueTransaction {
                store: self.clone(),
                pending: Vec::new(),
            }))
        }
    }

    #[async_trait]
    impl ShopRepository for InMemoryQueueStore {
        async fn insert(&self, shop: &Shop) -> Result<()> {
            self.with_state(|s| {
                if s.shops.iter().any(|existing| existing.id == shop.id) {
                    return Err(AppError::Conflict(format!("Shop {} already exists", shop.id)));
                }
                s.shops.push(shop.clone());
                Ok(())
            })?;
            self.notifier
                .publish(ChangeEvent::shop(ChangeKind::Insert, &shop.id));
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<Shop>> {
            Ok(self.with_state(|s| s.shops.iter().find(|shop| shop.id == id).cloned()))
        }

        async fn list_open(&self) -> Result<Vec<Shop>> {
            Ok(self.with_state(|s| s.shops.iter().filter(|shop| shop.is_open).cloned().collect()))
        }

        async fn set_open(&self, id: &str, is_open: bool) -> Result<()> {
            self.with_state(|s| {
                let shop = s
                    .shops
                    .iter_mut()
                    .find(|shop| shop.id == id)
                    .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", id)))?;
                shop.is_open = is_open;
                Ok::<(), AppError>(())
            })?;
            self.notifier.publish(ChangeEvent::shop(ChangeKind::Update, id));
            Ok(())
        }

        async fn set_location(&self, id: &str, point: Option<GeoPoint>) -> Result<()> {
            self.with_state(|s| {
                let shop = s
                    .shops
                    .iter_mut()
                    .find(|shop| shop.id == id)
                    .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", id)))?;
                shop.set_coordinates(point);
                Ok::<(), AppError>(())
            })?;
            self.notifier.publish(ChangeEvent::shop(ChangeKind::Update, id));
            Ok(())
        }
    }
}

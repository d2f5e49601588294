// Transaction port for atomic operations

use crate::domain::QueueEntry;
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction (change notifications are published after commit)
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Transactional QueueRepository operations
#[async_trait]
pub trait TransactionalQueueRepository: Send + Sync {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn QueueRepositoryTransaction>>;
}

/// QueueRepository operations within a transaction (join use case)
#[async_trait]
pub trait QueueRepositoryTransaction: Transaction {
    /// Active (waiting or in_service) entry of a customer, any shop
    async fn find_active_for_customer(&mut self, customer_id: &str) -> Result<Option<QueueEntry>>;

    /// Insert entry (within transaction)
    async fn insert(&mut self, entry: &QueueEntry) -> Result<()>;
}

// Queue Service - customer and operator use cases

pub mod join;
pub mod transitions;
pub mod view;

pub use join::JoinRequest;
pub use view::{CustomerQueueStatus, QueueView};

use crate::application::constants::DEFAULT_GUARD_CALL_NEXT;
use crate::domain::QueueEntry;
use crate::error::Result;
use crate::port::{
    IdProvider, QueueRepository, ShopRepository, TimeProvider, TransactionalQueueRepository,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Queue behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Refuse call-next while the shop is already serving someone
    pub guard_call_next: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            guard_call_next: DEFAULT_GUARD_CALL_NEXT,
        }
    }
}

pub struct QueueService {
    tx_repo: Arc<dyn TransactionalQueueRepository>,
    queue_repo: Arc<dyn QueueRepository>,
    shop_repo: Arc<dyn ShopRepository>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    config: QueueConfig,
}

impl QueueService {
    pub fn new(
        tx_repo: Arc<dyn TransactionalQueueRepository>,
        queue_repo: Arc<dyn QueueRepository>,
        shop_repo: Arc<dyn ShopRepository>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        config: QueueConfig,
    ) -> Self {
        Self {
            tx_repo,
            queue_repo,
            shop_repo,
            id_provider,
            time_provider,
            config,
        }
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// Customer joins a shop's queue
    pub async fn join(&self, req: JoinRequest) -> Result<QueueEntry> {
        join::execute(
            self.tx_repo.as_ref(),
            self.queue_repo.as_ref(),
            self.shop_repo.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            req,
        )
        .await
    }

    /// Customer leaves (cancels a waiting entry)
    pub async fn leave(&self, entry_id: &str, customer_id: Option<&str>) -> Result<QueueEntry> {
        transitions::leave(
            self.queue_repo.as_ref(),
            self.time_provider.as_ref(),
            entry_id,
            customer_id,
        )
        .await
    }

    /// Operator calls the next waiting customer
    pub async fn call_next(&self, shop_id: &str) -> Result<Option<QueueEntry>> {
        transitions::call_next(
            self.queue_repo.as_ref(),
            self.shop_repo.as_ref(),
            self.time_provider.as_ref(),
            shop_id,
            self.config.guard_call_next,
        )
        .await
    }

    /// Operator marks the entry in service as done
    pub async fn complete(&self, entry_id: &str, shop_id: Option<&str>) -> Result<QueueEntry> {
        transitions::complete(
            self.queue_repo.as_ref(),
            self.time_provider.as_ref(),
            entry_id,
            shop_id,
        )
        .await
    }

    pub async fn shop_view(&self, shop_id: &str) -> Result<QueueView> {
        view::shop_view(self.queue_repo.as_ref(), self.shop_repo.as_ref(), shop_id).await
    }

    pub async fn customer_status(&self, customer_id: &str) -> Result<Option<CustomerQueueStatus>> {
        view::customer_status(self.queue_repo.as_ref(), self.shop_repo.as_ref(), customer_id)
            .await
    }
}

// Queue Entry Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::shop::ShopId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Queue entry ID (UUID v4)
pub type EntryId = String;

/// Customer identifier (profile id owned by the auth layer)
pub type CustomerId = String;

/// Entry status
///
/// `Waiting -> InService -> Completed`, `Waiting -> Cancelled`.
/// `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Waiting,
    InService,
    Completed,
    Cancelled,
}

impl EntryStatus {
    /// Statuses that occupy the customer's single active slot
    pub const ACTIVE: [EntryStatus; 2] = [EntryStatus::Waiting, EntryStatus::InService];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Waiting => "waiting",
            EntryStatus::InService => "in_service",
            EntryStatus::Completed => "completed",
            EntryStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, EntryStatus::Waiting | EntryStatus::InService)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::Cancelled)
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "waiting" => Ok(EntryStatus::Waiting),
            "in_service" => Ok(EntryStatus::InService),
            "completed" => Ok(EntryStatus::Completed),
            "cancelled" => Ok(EntryStatus::Cancelled),
            other => Err(DomainError::ValidationError(format!(
                "unknown queue status: {}",
                other
            ))),
        }
    }
}

/// One customer's occupancy of a place in a shop's queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub shop_id: ShopId,
    pub customer_id: CustomerId,
    pub status: EntryStatus,

    // Derived by the estimator, never persisted
    pub position: Option<u32>,
    pub estimated_wait_time: Option<u32>, // minutes

    pub joined_at: i64, // epoch ms
    pub called_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub cancelled_at: Option<i64>,

    pub notes: Option<String>,
}

impl QueueEntry {
    /// Create a new waiting entry
    ///
    /// # Arguments
    ///
    /// * `id` - Unique entry ID (injected, not generated)
    /// * `shop_id` - Shop whose queue is joined
    /// * `customer_id` - Joining customer
    /// * `joined_at` - Join timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        shop_id: impl Into<String>,
        customer_id: impl Into<String>,
        joined_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            shop_id: shop_id.into(),
            customer_id: customer_id.into(),
            status: EntryStatus::Waiting,
            position: None,
            estimated_wait_time: None,
            joined_at,
            called_at: None,
            completed_at: None,
            cancelled_at: None,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Check that `self.status -> to` is an edge of the state machine
    pub fn ensure_transition(&self, to: EntryStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, to),
            (EntryStatus::Waiting, EntryStatus::InService)
                | (EntryStatus::Waiting, EntryStatus::Cancelled)
                | (EntryStatus::InService, EntryStatus::Completed)
        );
        if allowed {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Waiting -> InService (operator calls next)
    pub fn call(&mut self, now_millis: i64) -> Result<()> {
        self.ensure_transition(EntryStatus::InService)?;
        self.status = EntryStatus::InService;
        self.called_at = Some(now_millis);
        self.clear_derived();
        Ok(())
    }

    /// InService -> Completed (operator marks done)
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        self.ensure_transition(EntryStatus::Completed)?;
        self.status = EntryStatus::Completed;
        self.completed_at = Some(now_millis);
        Ok(())
    }

    /// Waiting -> Cancelled (customer leaves)
    pub fn cancel(&mut self, now_millis: i64) -> Result<()> {
        self.ensure_transition(EntryStatus::Cancelled)?;
        self.status = EntryStatus::Cancelled;
        self.cancelled_at = Some(now_millis);
        self.clear_derived();
        Ok(())
    }

    pub(crate) fn clear_derived(&mut self) {
        self.position = None;
        self.estimated_wait_time = None;
    }
}

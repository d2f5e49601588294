// Status transition use cases: leave, call next, complete

use crate::domain::{recompute_positions, EntryStatus, QueueEntry, Shop};
use crate::error::{AppError, Result};
use crate::port::{QueueRepository, ShopRepository, TimeProvider};
use tracing::{debug, info};

pub(crate) async fn load_entry(
    queue_repo: &dyn QueueRepository,
    entry_id: &str,
) -> Result<QueueEntry> {
    queue_repo
        .find_by_id(entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Queue entry {} not found", entry_id)))
}

pub(crate) async fn load_shop(shop_repo: &dyn ShopRepository, shop_id: &str) -> Result<Shop> {
    shop_repo
        .find_by_id(shop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", shop_id)))
}

// Foreign entries are reported as missing so ids of other customers don't leak
fn ensure_owned(entry_id: &str, expected_owner: Option<&str>, actual_owner: &str) -> Result<()> {
    match expected_owner {
        Some(expected) if expected != actual_owner => Err(AppError::NotFound(format!(
            "Queue entry {} not found",
            entry_id
        ))),
        _ => Ok(()),
    }
}

/// Customer leaves: Waiting -> Cancelled
///
/// `customer_id`, when given, must own the entry.
pub async fn leave(
    queue_repo: &dyn QueueRepository,
    time_provider: &dyn TimeProvider,
    entry_id: &str,
    customer_id: Option<&str>,
) -> Result<QueueEntry> {
    let mut entry = load_entry(queue_repo, entry_id).await?;
    ensure_owned(&entry.id, customer_id, &entry.customer_id)?;
    entry.ensure_transition(EntryStatus::Cancelled)?;

    let now = time_provider.now_millis();
    queue_repo
        .update_status(&entry.id, EntryStatus::Waiting, EntryStatus::Cancelled, now)
        .await?;
    entry.cancel(now)?;

    info!(entry_id = %entry.id, shop_id = %entry.shop_id, "Customer left queue");
    Ok(entry)
}

/// Operator calls next: lowest-position waiting entry -> InService
///
/// Returns `Ok(None)` when nobody is waiting.
///
/// # Arguments
/// * `exclusive` - refuse while another entry of the shop is in service
pub async fn call_next(
    queue_repo: &dyn QueueRepository,
    shop_repo: &dyn ShopRepository,
    time_provider: &dyn TimeProvider,
    shop_id: &str,
    exclusive: bool,
) -> Result<Option<QueueEntry>> {
    let shop = load_shop(shop_repo, shop_id).await?;
    let waiting = recompute_positions(&shop, queue_repo.list_waiting(&shop.id).await?);

    let Some(mut next) = waiting.into_iter().next() else {
        debug!(shop_id = %shop.id, "Call next with empty queue, nothing to do");
        return Ok(None);
    };

    let now = time_provider.now_millis();
    queue_repo
        .start_service(&next.id, &shop.id, now, exclusive)
        .await?;
    next.call(now)?;

    info!(
        entry_id = %next.id,
        shop_id = %shop.id,
        customer_id = %next.customer_id,
        "Customer called"
    );
    Ok(Some(next))
}

/// Operator marks done: InService -> Completed
///
/// `shop_id`, when given, must be the entry's shop.
pub async fn complete(
    queue_repo: &dyn QueueRepository,
    time_provider: &dyn TimeProvider,
    entry_id: &str,
    shop_id: Option<&str>,
) -> Result<QueueEntry> {
    let mut entry = load_entry(queue_repo, entry_id).await?;
    ensure_owned(&entry.id, shop_id, &entry.shop_id)?;
    entry.ensure_transition(EntryStatus::Completed)?;

    let now = time_provider.now_millis();
    queue_repo
        .update_status(&entry.id, EntryStatus::InService, EntryStatus::Completed, now)
        .await?;
    entry.complete(now)?;

    info!(entry_id = %entry.id, shop_id = %entry.shop_id, "Service completed");
    Ok(entry)
}

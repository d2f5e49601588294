// Join Use Case

use crate::application::constants::MAX_NOTES_LEN;
use crate::domain::{recompute_positions, DomainError, QueueEntry};
use crate::error::{AppError, Result};
use crate::port::{
    IdProvider, QueueRepository, ShopRepository, TimeProvider, TransactionalQueueRepository,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Join request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub shop_id: String,
    pub customer_id: String,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Reject malformed requests before touching the store
pub fn validate_request(req: &JoinRequest) -> Result<()> {
    if req.shop_id.trim().is_empty() {
        return Err(AppError::Validation("shop_id cannot be empty".to_string()));
    }
    if req.customer_id.trim().is_empty() {
        return Err(AppError::Validation("customer_id cannot be empty".to_string()));
    }
    if let Some(notes) = &req.notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(AppError::Validation(format!(
                "notes too long (max {} characters)",
                MAX_NOTES_LEN
            )));
        }
    }
    Ok(())
}

/// Execute join use case (active-entry check and insert share one transaction)
///
/// # Arguments
///
/// * `tx_repo` - Transactional queue repository
/// * `queue_repo` - Queue repository (position of the new entry)
/// * `shop_repo` - Shop repository
/// * `id_provider` - ID generator (injected for determinism)
/// * `time_provider` - Time provider (injected for determinism)
/// * `req` - Join request
///
/// # Errors
/// - AppError::NotFound if the shop does not exist
/// - AppError::InvalidState if the shop is closed
/// - AppError::Conflict if the customer already has an active entry anywhere
pub async fn execute(
    tx_repo: &dyn TransactionalQueueRepository,
    queue_repo: &dyn QueueRepository,
    shop_repo: &dyn ShopRepository,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    req: JoinRequest,
) -> Result<QueueEntry> {
    validate_request(&req)?;

    let shop = shop_repo
        .find_by_id(&req.shop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Shop {} not found", req.shop_id)))?;

    if !shop.is_open {
        return Err(DomainError::ShopClosed(shop.name.clone()).into());
    }

    let mut tx = tx_repo.begin_transaction().await?;

    if let Some(active) = tx.find_active_for_customer(&req.customer_id).await? {
        tx.rollback().await?;
        return Err(AppError::Conflict(format!(
            "Customer {} is already {} at shop {}",
            req.customer_id, active.status, active.shop_id
        )));
    }

    let entry = QueueEntry::new(
        id_provider.generate_id(),
        shop.id.clone(),
        req.customer_id,
        time_provider.now_millis(),
    )
    .with_notes(req.notes);

    tx.insert(&entry).await?;
    tx.commit().await?;

    // Position comes from the committed waiting set, not from the insert
    let waiting = queue_repo.list_waiting(&shop.id).await?;
    let ranked = recompute_positions(&shop, waiting)
        .into_iter()
        .find(|e| e.id == entry.id);

    info!(
        entry_id = %entry.id,
        shop_id = %shop.id,
        customer_id = %entry.customer_id,
        position = ?ranked.as_ref().and_then(|e| e.position),
        "Customer joined queue"
    );

    Ok(ranked.unwrap_or(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> JoinRequest {
        JoinRequest {
            shop_id: "shop-1".to_string(),
            customer_id: "cust-1".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_validate_valid_request() {
        assert!(validate_request(&request()).is_ok());
    }

    #[test]
    fn test_validate_empty_ids() {
        let mut req = request();
        req.shop_id = " ".to_string();
        assert!(validate_request(&req).unwrap_err().to_string().contains("shop_id"));

        let mut req = request();
        req.customer_id = String::new();
        assert!(validate_request(&req)
            .unwrap_err()
            .to_string()
            .contains("customer_id"));
    }

    #[test]
    fn test_validate_notes_too_long() {
        let mut req = request();
        req.notes = Some("x".repeat(MAX_NOTES_LEN + 1));
        assert!(validate_request(&req).unwrap_err().to_string().contains("too long"));
    }
}

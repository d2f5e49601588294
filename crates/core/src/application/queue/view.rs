// Read models recomputed from the store on every request

use crate::application::constants::UNKNOWN_SHOP_NAME;
use crate::application::queue::transitions::load_shop;
use crate::domain::{recompute_positions, select_in_service, EntryStatus, QueueEntry, Shop};
use crate::error::Result;
use crate::port::{QueueRepository, ShopRepository};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Operator's view of one shop's queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueView {
    pub shop: Shop,
    /// Waiting entries in position order
    pub waiting: Vec<QueueEntry>,
    pub in_service: Option<QueueEntry>,
    /// Minutes a customer joining now would wait
    pub estimated_wait_for_new: u32,
}

impl QueueView {
    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }
}

/// Customer's view of their own active entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerQueueStatus {
    pub entry: QueueEntry,
    pub shop_name: String,
    /// Waiting entries ahead of this one (0 while in service)
    pub people_ahead: u32,
}

pub async fn shop_view(
    queue_repo: &dyn QueueRepository,
    shop_repo: &dyn ShopRepository,
    shop_id: &str,
) -> Result<QueueView> {
    let shop = load_shop(shop_repo, shop_id).await?;
    let waiting = recompute_positions(&shop, queue_repo.list_waiting(&shop.id).await?);

    let serving = queue_repo.list_in_service(&shop.id).await?;
    if serving.len() > 1 {
        warn!(
            shop_id = %shop.id,
            in_service = serving.len(),
            "More than one entry in service, reporting earliest call"
        );
    }
    let in_service = select_in_service(&serving).cloned();

    let estimated_wait_for_new = (waiting.len() as u32).saturating_mul(shop.average_service_time);

    Ok(QueueView {
        shop,
        waiting,
        in_service,
        estimated_wait_for_new,
    })
}

pub async fn customer_status(
    queue_repo: &dyn QueueRepository,
    shop_repo: &dyn ShopRepository,
    customer_id: &str,
) -> Result<Option<CustomerQueueStatus>> {
    let Some(entry) = queue_repo.find_active_for_customer(customer_id).await? else {
        return Ok(None);
    };

    let shop = shop_repo.find_by_id(&entry.shop_id).await?;
    let shop_name = shop
        .as_ref()
        .map(|s| s.name.clone())
        .unwrap_or_else(|| UNKNOWN_SHOP_NAME.to_string());

    let status = match (&shop, entry.status) {
        (Some(shop), EntryStatus::Waiting) => {
            let ranked = recompute_positions(shop, queue_repo.list_waiting(&shop.id).await?)
                .into_iter()
                .find(|e| e.id == entry.id)
                .unwrap_or(entry);
            let people_ahead = ranked.position.map_or(0, |p| p.saturating_sub(1));
            CustomerQueueStatus {
                entry: ranked,
                shop_name,
                people_ahead,
            }
        }
        _ => CustomerQueueStatus {
            entry,
            shop_name,
            people_ahead: 0,
        },
    };
    Ok(Some(status))
}

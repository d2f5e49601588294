// Daily analytics use case

use crate::application::queue::transitions::load_shop;
use crate::domain::analytics::day_bounds_millis;
use crate::domain::DailyAnalytics;
use crate::error::Result;
use crate::port::{QueueRepository, ShopRepository};
use chrono::NaiveDate;
use std::sync::Arc;

pub struct AnalyticsService {
    queue_repo: Arc<dyn QueueRepository>,
    shop_repo: Arc<dyn ShopRepository>,
}

impl AnalyticsService {
    pub fn new(queue_repo: Arc<dyn QueueRepository>, shop_repo: Arc<dyn ShopRepository>) -> Self {
        Self {
            queue_repo,
            shop_repo,
        }
    }

    /// Summary of one UTC day at a shop
    pub async fn daily(&self, shop_id: &str, date: NaiveDate) -> Result<DailyAnalytics> {
        let shop = load_shop(self.shop_repo.as_ref(), shop_id).await?;
        let (from, to) = day_bounds_millis(date);
        let entries = self.queue_repo.list_entries_between(&shop.id, from, to).await?;

        tracing::debug!(
            shop_id = %shop.id,
            %date,
            entries = entries.len(),
            "Computing daily analytics"
        );
        Ok(DailyAnalytics::compute(&shop.id, date, &entries))
    }
}

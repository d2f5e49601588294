// Shop discovery: open shops ranked by distance from the customer

use crate::domain::{sort_by_distance, GeoPoint, Shop};
use crate::error::Result;
use crate::port::{QueueRepository, ShopRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// One shop in the customer's discovery list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopListing {
    pub shop: Shop,
    /// Customers currently waiting
    pub queue_count: i64,
    /// Distance from the customer; None without a location on either side
    pub distance_km: Option<f64>,
}

/// Order listings nearest first
///
/// Shops without coordinates go last, ties keep their input order. With no
/// user location the input order is returned unchanged.
pub fn rank_by_distance(
    user_location: Option<GeoPoint>,
    listings: Vec<ShopListing>,
) -> Vec<ShopListing> {
    let Some(origin) = user_location else {
        return listings;
    };
    sort_by_distance(origin, listings, |l| l.shop.coordinates())
        .into_iter()
        .map(|(mut listing, distance)| {
            listing.distance_km = distance;
            listing
        })
        .collect()
}

pub struct ShopDiscovery {
    shop_repo: Arc<dyn ShopRepository>,
    queue_repo: Arc<dyn QueueRepository>,
}

impl ShopDiscovery {
    pub fn new(shop_repo: Arc<dyn ShopRepository>, queue_repo: Arc<dyn QueueRepository>) -> Self {
        Self {
            shop_repo,
            queue_repo,
        }
    }

    /// Open shops with their waiting counts, nearest first when a location is given
    pub async fn list_open_shops(
        &self,
        user_location: Option<GeoPoint>,
    ) -> Result<Vec<ShopListing>> {
        if let Some(point) = user_location {
            point.validate()?;
        }

        let shops = self.shop_repo.list_open().await?;
        let mut listings = Vec::with_capacity(shops.len());
        for shop in shops {
            let queue_count = self.queue_repo.count_waiting(&shop.id).await?;
            listings.push(ShopListing {
                shop,
                queue_count,
                distance_km: None,
            });
        }

        debug!(
            shops = listings.len(),
            located = user_location.is_some(),
            "Listing open shops"
        );
        Ok(rank_by_distance(user_location, listings))
    }
}

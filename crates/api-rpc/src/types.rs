//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results. Domain types that already carry a
//! stable serde shape (`QueueEntry`, `Shop`, `DailyAnalytics`) are returned as is.

use chrono::NaiveDate;
use queueease_core::application::{CustomerQueueStatus, QueueView, ShopListing};
use queueease_core::domain::{GeoPoint, QueueEntry, Shop};
use serde::{Deserialize, Serialize};

pub use queueease_core::application::CreateShopRequest;

/// queue.join.v1
#[derive(Debug, Deserialize)]
pub struct JoinQueueRequest {
    pub shop_id: String,
    pub customer_id: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// queue.leave.v1
#[derive(Debug, Deserialize)]
pub struct LeaveQueueRequest {
    pub entry_id: String,
    /// When set, must own the entry
    #[serde(default)]
    pub customer_id: Option<String>,
}

/// queue.call_next.v1
#[derive(Debug, Deserialize)]
pub struct CallNextRequest {
    pub shop_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallNextResponse {
    /// None when nobody was waiting
    pub called: Option<QueueEntry>,
}

/// queue.complete.v1
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub entry_id: String,
    /// When set, must be the entry's shop
    #[serde(default)]
    pub shop_id: Option<String>,
}

/// queue.view.v1, queue.subscribe_shop.v1
#[derive(Debug, Deserialize)]
pub struct ShopViewRequest {
    pub shop_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopViewResponse {
    pub shop: Shop,
    pub waiting: Vec<QueueEntry>,
    pub in_service: Option<QueueEntry>,
    pub waiting_count: usize,
    pub estimated_wait_for_new: u32,
}

impl From<QueueView> for ShopViewResponse {
    fn from(view: QueueView) -> Self {
        Self {
            waiting_count: view.waiting_count(),
            estimated_wait_for_new: view.estimated_wait_for_new,
            shop: view.shop,
            waiting: view.waiting,
            in_service: view.in_service,
        }
    }
}

/// queue.status.v1, queue.subscribe_status.v1
#[derive(Debug, Deserialize)]
pub struct CustomerStatusRequest {
    pub customer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerStatusResponse {
    pub active: bool,
    pub entry: Option<QueueEntry>,
    pub shop_name: Option<String>,
    pub people_ahead: Option<u32>,
}

impl From<Option<CustomerQueueStatus>> for CustomerStatusResponse {
    fn from(status: Option<CustomerQueueStatus>) -> Self {
        match status {
            Some(s) => Self {
                active: true,
                entry: Some(s.entry),
                shop_name: Some(s.shop_name),
                people_ahead: Some(s.people_ahead),
            },
            None => Self {
                active: false,
                entry: None,
                shop_name: None,
                people_ahead: None,
            },
        }
    }
}

/// shop.set_open.v1
#[derive(Debug, Deserialize)]
pub struct SetOpenRequest {
    pub shop_id: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    pub is_open: bool,
}

/// shop.update_location.v1
///
/// Either explicit device coordinates, or `from_address` to re-geocode.
#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub shop_id: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub from_address: bool,
    #[serde(default)]
    pub search_near: Option<GeoPoint>,
}

/// shop.discover.v1
#[derive(Debug, Default, Deserialize)]
pub struct DiscoverRequest {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub shops: Vec<ShopListing>,
}

/// shop.analytics.v1
#[derive(Debug, Deserialize)]
pub struct AnalyticsRequest {
    pub shop_id: String,
    /// UTC day (`YYYY-MM-DD`); today when omitted
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

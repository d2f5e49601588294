// Shop Repository Port (Interface)

use crate::domain::{GeoPoint, Shop};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for Shop persistence
#[async_trait]
pub trait ShopRepository: Send + Sync {
    /// Insert a new shop
    async fn insert(&self, shop: &Shop) -> Result<()>;

    /// Find shop by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Shop>>;

    /// All shops currently accepting customers, oldest first
    async fn list_open(&self) -> Result<Vec<Shop>>;

    /// Toggle `is_open`
    ///
    /// # Errors
    /// - AppError::NotFound if the shop does not exist
    async fn set_open(&self, id: &str, is_open: bool) -> Result<()>;

    /// Replace coordinates (None clears them)
    ///
    /// # Errors
    /// - AppError::NotFound if the shop does not exist
    async fn set_location(&self, id: &str, point: Option<GeoPoint>) -> Result<()>;
}

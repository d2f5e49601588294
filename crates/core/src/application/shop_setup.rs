// Shop management: creation, opening hours toggle, location

use crate::application::queue::transitions::load_shop;
use crate::domain::{GeoPoint, Shop};
use crate::error::{AppError, Result};
use crate::port::{GeoBias, Geocoder, IdProvider, ShopRepository, TimeProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// New shop submitted by an owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShopRequest {
    pub owner_id: String,
    pub name: String,
    pub address: String,

    /// Minutes per customer; defaults to 15
    #[serde(default)]
    pub average_service_time: Option<u32>,

    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_range: Option<String>,

    /// Device coordinates; when present the address is not geocoded
    #[serde(default)]
    pub location: Option<GeoPoint>,

    /// Prefer geocoding results near this point
    #[serde(default)]
    pub search_near: Option<GeoPoint>,
}

pub struct ShopService {
    shop_repo: Arc<dyn ShopRepository>,
    geocoder: Arc<dyn Geocoder>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ShopService {
    pub fn new(
        shop_repo: Arc<dyn ShopRepository>,
        geocoder: Arc<dyn Geocoder>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            shop_repo,
            geocoder,
            id_provider,
            time_provider,
        }
    }

    /// Register a shop (open by default)
    ///
    /// Geocoding is best-effort: a provider failure or an unresolved address
    /// still saves the shop, just without coordinates.
    pub async fn create_shop(&self, req: CreateShopRequest) -> Result<Shop> {
        if req.owner_id.trim().is_empty() {
            return Err(AppError::Validation("owner_id cannot be empty".to_string()));
        }

        let mut shop = Shop::new(
            self.id_provider.generate_id(),
            req.name.trim(),
            req.address.trim(),
            self.time_provider.now_millis(),
        );
        shop.owner_id = Some(req.owner_id);
        if let Some(minutes) = req.average_service_time {
            shop.average_service_time = minutes;
        }
        shop.phone = req.phone;
        shop.description = req.description;
        shop.price_range = req.price_range;
        shop.set_coordinates(req.location);
        shop.validate()?;
        if let Some(near) = req.search_near {
            near.validate()?;
        }

        if shop.coordinates().is_none() {
            let bias = req.search_near.map(GeoBias::near);
            match self.geocoder.geocode(&shop.address, bias).await {
                Ok(Some(point)) if point.validate().is_ok() => shop.set_coordinates(Some(point)),
                Ok(_) => {
                    warn!(
                        address = %shop.address,
                        "Address not geocoded, saving shop without coordinates"
                    );
                }
                Err(e) => {
                    warn!(
                        address = %shop.address,
                        error = %e,
                        "Geocoding failed, saving shop without coordinates"
                    );
                }
            }
        }

        self.shop_repo.insert(&shop).await?;
        info!(
            shop_id = %shop.id,
            located = shop.coordinates().is_some(),
            "Shop created"
        );
        Ok(shop)
    }

    /// Open or close a shop for new customers
    pub async fn set_open(
        &self,
        shop_id: &str,
        owner_id: Option<&str>,
        is_open: bool,
    ) -> Result<Shop> {
        let mut shop = self.owned_shop(shop_id, owner_id).await?;
        self.shop_repo.set_open(&shop.id, is_open).await?;
        shop.is_open = is_open;

        info!(shop_id = %shop.id, is_open, "Shop availability changed");
        Ok(shop)
    }

    /// Store coordinates reported by the owner's device
    pub async fn update_location(
        &self,
        shop_id: &str,
        owner_id: Option<&str>,
        point: GeoPoint,
    ) -> Result<Shop> {
        point.validate()?;
        let mut shop = self.owned_shop(shop_id, owner_id).await?;
        self.shop_repo.set_location(&shop.id, Some(point)).await?;
        shop.set_coordinates(Some(point));

        info!(shop_id = %shop.id, lat = point.lat, lng = point.lng, "Shop location updated");
        Ok(shop)
    }

    /// Re-geocode the shop's address
    ///
    /// An unresolved address clears the coordinates; a provider error leaves
    /// them untouched and is returned to the caller.
    pub async fn relocate_from_address(
        &self,
        shop_id: &str,
        owner_id: Option<&str>,
        search_near: Option<GeoPoint>,
    ) -> Result<Shop> {
        let mut shop = self.owned_shop(shop_id, owner_id).await?;
        let point = self
            .geocoder
            .geocode(&shop.address, search_near.map(GeoBias::near))
            .await?;
        if let Some(p) = point {
            p.validate()?;
        }

        self.shop_repo.set_location(&shop.id, point).await?;
        shop.set_coordinates(point);

        info!(shop_id = %shop.id, located = point.is_some(), "Shop relocated from address");
        Ok(shop)
    }

    async fn owned_shop(&self, shop_id: &str, owner_id: Option<&str>) -> Result<Shop> {
        let shop = load_shop(self.shop_repo.as_ref(), shop_id).await?;
        match (owner_id, shop.owner_id.as_deref()) {
            (Some(caller), Some(owner)) if caller != owner => {
                Err(AppError::NotFound(format!("Shop {} not found", shop_id)))
            }
            _ => Ok(shop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::geocoder::mocks::{MockBehavior, MockGeocoder};
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::queue_repository::mocks::InMemoryQueueStore;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use crate::port::BroadcastChangeNotifier;
    use tokio_test::{assert_err, assert_ok};

    fn setup(geocoder: Arc<MockGeocoder>) -> (ShopService, InMemoryQueueStore) {
        let store = InMemoryQueueStore::new(Arc::new(BroadcastChangeNotifier::default()));
        let service = ShopService::new(
            Arc::new(store.clone()),
            geocoder,
            Arc::new(SequentialIdProvider::new("shop")),
            Arc::new(ManualTimeProvider::new(1_000)),
        );
        (service, store)
    }

    fn request() -> CreateShopRequest {
        CreateShopRequest {
            owner_id: "owner-1".to_string(),
            name: "Fade Factory".to_string(),
            address: "1 Main St".to_string(),
            average_service_time: None,
            phone: None,
            description: None,
            price_range: None,
            location: None,
            search_near: None,
        }
    }

    #[tokio::test]
    async fn test_create_shop_geocodes_address() {
        let geocoder = Arc::new(MockGeocoder::found(40.0, -74.0));
        let (service, store) = setup(geocoder.clone());

        let mut req = request();
        req.search_near = Some(GeoPoint { lat: 40.1, lng: -74.1 });
        let shop = service.create_shop(req).await.unwrap();

        assert_eq!(shop.id, "shop-1");
        assert!(shop.is_open);
        assert_eq!(shop.average_service_time, 15);
        assert_eq!(shop.coordinates(), Some(GeoPoint { lat: 40.0, lng: -74.0 }));
        assert_eq!(geocoder.call_count(), 1);
        assert_eq!(geocoder.last_bias().map(|b| b.zoom), Some(GeoBias::DEFAULT_ZOOM));

        let stored = ShopRepository::find_by_id(&store, "shop-1").await.unwrap();
        assert_eq!(stored, Some(shop));
    }

    #[tokio::test]
    async fn test_create_shop_survives_geocoder_failure() {
        let (service, _) = setup(Arc::new(MockGeocoder::failing("quota exceeded")));
        let shop = assert_ok!(service.create_shop(request()).await);
        assert!(shop.coordinates().is_none());

        let (service, _) = setup(Arc::new(MockGeocoder::new(MockBehavior::NotFound)));
        let shop = assert_ok!(service.create_shop(request()).await);
        assert!(shop.coordinates().is_none());
    }

    #[tokio::test]
    async fn test_device_location_skips_geocoding() {
        let geocoder = Arc::new(MockGeocoder::found(1.0, 1.0));
        let (service, _) = setup(geocoder.clone());

        let mut req = request();
        req.location = Some(GeoPoint { lat: 51.5, lng: -0.12 });
        let shop = service.create_shop(req).await.unwrap();

        assert_eq!(shop.latitude, Some(51.5));
        assert_eq!(geocoder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_shop_validation() {
        let (service, _) = setup(Arc::new(MockGeocoder::found(1.0, 1.0)));

        let mut req = request();
        req.name = "  ".to_string();
        assert!(matches!(service.create_shop(req).await, Err(AppError::Validation(_))));

        let mut req = request();
        req.average_service_time = Some(0);
        assert!(matches!(service.create_shop(req).await, Err(AppError::Validation(_))));

        let mut req = request();
        req.average_service_time = Some(481);
        assert_err!(service.create_shop(req).await);
    }

    #[tokio::test]
    async fn test_set_open_checks_owner() {
        let (service, store) = setup(Arc::new(MockGeocoder::found(1.0, 1.0)));
        let shop = service.create_shop(request()).await.unwrap();

        let err = assert_err!(service.set_open(&shop.id, Some("intruder"), false).await);
        assert!(matches!(err, AppError::NotFound(_)));

        let closed = service.set_open(&shop.id, Some("owner-1"), false).await.unwrap();
        assert!(!closed.is_open);
        assert!(store.list_open().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_relocate_clears_coordinates_when_unresolved() {
        let geocoder = Arc::new(MockGeocoder::new(MockBehavior::NotFound));
        let (service, store) = setup(geocoder);

        let mut req = request();
        req.location = Some(GeoPoint { lat: 10.0, lng: 10.0 });
        let shop = service.create_shop(req).await.unwrap();

        let relocated = service.relocate_from_address(&shop.id, None, None).await.unwrap();
        assert!(relocated.coordinates().is_none());
        let stored = ShopRepository::find_by_id(&store, &shop.id).await.unwrap().unwrap();
        assert!(stored.coordinates().is_none());
    }

    #[tokio::test]
    async fn test_relocate_keeps_coordinates_on_provider_error() {
        let (service, store) = setup(Arc::new(MockGeocoder::failing("offline")));

        let mut req = request();
        req.location = Some(GeoPoint { lat: 10.0, lng: 10.0 });
        let shop = service.create_shop(req).await.unwrap();

        let err = assert_err!(service.relocate_from_address(&shop.id, None, None).await);
        assert!(err.is_external());
        let stored = ShopRepository::find_by_id(&store, &shop.id).await.unwrap().unwrap();
        assert_eq!(stored.coordinates(), Some(GeoPoint { lat: 10.0, lng: 10.0 }));
    }

    #[tokio::test]
    async fn test_update_location_rejects_bad_coordinates() {
        let (service, _) = setup(Arc::new(MockGeocoder::found(1.0, 1.0)));
        let shop = service.create_shop(request()).await.unwrap();

        assert_err!(
            service
                .update_location(&shop.id, None, GeoPoint { lat: 0.0, lng: 200.0 })
                .await
        );
        let moved = service
            .update_location(&shop.id, Some("owner-1"), GeoPoint { lat: 2.0, lng: 3.0 })
            .await
            .unwrap();
        assert_eq!(moved.coordinates(), Some(GeoPoint { lat: 2.0, lng: 3.0 }));
    }
}

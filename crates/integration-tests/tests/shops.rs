//! Shop setup, discovery and analytics against the SQLite adapter

mod common;

use chrono::NaiveDate;
use common::{stack, MINUTE};
use queueease_core::application::{
    AnalyticsService, CreateShopRequest, QueueConfig, ShopDiscovery, ShopService,
};
use queueease_core::domain::GeoPoint;
use queueease_core::error::AppError;
use queueease_core::port::geocoder::mocks::MockGeocoder;
use queueease_core::port::id_provider::mocks::SequentialIdProvider;
use queueease_core::port::{Geocoder, ShopRepository};
use std::sync::Arc;
use tokio_test::assert_err;

const CUSTOMER: GeoPoint = GeoPoint {
    lat: 40.7128,
    lng: -74.0060,
};

fn create_request(name: &str) -> CreateShopRequest {
    CreateShopRequest {
        owner_id: "owner-1".to_string(),
        name: name.to_string(),
        address: "350 5th Ave, New York".to_string(),
        average_service_time: Some(20),
        phone: None,
        description: None,
        price_range: Some("$$".to_string()),
        location: None,
        search_near: None,
    }
}

#[tokio::test]
async fn test_discovery_ranks_open_shops_by_distance() {
    let s = stack(QueueConfig::default()).await;
    s.add_shop("no-coords", 15).await;
    s.add_shop_at("far", 40.65, -73.95).await;
    s.add_shop_at("near", 40.73, -73.99).await;
    s.add_shop_at("closed", 40.7129, -74.0061).await;
    s.shop_repo.set_open("closed", false).await.unwrap();

    s.join("far", "A").await;
    s.join("far", "B").await;

    let discovery = ShopDiscovery::new(s.shop_repo.clone(), s.queue_repo.clone());
    let listings = discovery.list_open_shops(Some(CUSTOMER)).await.unwrap();

    let ids: Vec<&str> = listings.iter().map(|l| l.shop.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "far", "no-coords"]);

    assert_eq!(listings[1].queue_count, 2);
    assert_eq!(listings[0].queue_count, 0);
    let near_km = listings[0].distance_km.unwrap();
    let far_km = listings[1].distance_km.unwrap();
    assert!(near_km < far_km);
    assert!(listings[2].distance_km.is_none());

    // Without a location the store order is kept and no distances are reported
    let unranked = discovery.list_open_shops(None).await.unwrap();
    assert_eq!(unranked.len(), 3);
    assert!(unranked.iter().all(|l| l.distance_km.is_none()));
}

#[tokio::test]
async fn test_discovery_rejects_invalid_location() {
    let s = stack(QueueConfig::default()).await;
    let discovery = ShopDiscovery::new(s.shop_repo.clone(), s.queue_repo.clone());
    let err = assert_err!(
        discovery
            .list_open_shops(Some(GeoPoint { lat: 95.0, lng: 0.0 }))
            .await
    );
    assert!(matches!(err, AppError::Domain(_)));
}

#[tokio::test]
async fn test_created_shop_is_geocoded_and_persisted() {
    let s = stack(QueueConfig::default()).await;
    let geocoder = Arc::new(MockGeocoder::found(40.7484, -73.9857));
    let shops = ShopService::new(
        s.shop_repo.clone(),
        geocoder.clone(),
        Arc::new(SequentialIdProvider::new("shop")),
        s.clock.clone(),
    );

    let shop = shops.create_shop(create_request("Empire Cuts")).await.unwrap();
    assert_eq!(shop.coordinates(), Some(GeoPoint { lat: 40.7484, lng: -73.9857 }));
    assert!(shop.is_open);
    assert_eq!(geocoder.call_count(), 1);

    let stored = s.shop_repo.find_by_id(&shop.id).await.unwrap().unwrap();
    assert_eq!(stored.average_service_time, 20);
    assert_eq!(stored.latitude, Some(40.7484));
    assert_eq!(stored.owner_id.as_deref(), Some("owner-1"));
}

#[tokio::test]
async fn test_geocoder_outage_still_creates_shop() {
    let s = stack(QueueConfig::default()).await;
    let geocoder: Arc<dyn Geocoder> = Arc::new(MockGeocoder::failing("serpapi down"));
    let shops = ShopService::new(
        s.shop_repo.clone(),
        geocoder,
        Arc::new(SequentialIdProvider::new("shop")),
        s.clock.clone(),
    );

    let shop = shops.create_shop(create_request("Offline Cuts")).await.unwrap();
    assert!(shop.coordinates().is_none());

    // Re-geocoding surfaces the outage and leaves the row alone
    let err = assert_err!(shops.relocate_from_address(&shop.id, None, None).await);
    assert!(err.is_external());

    let moved = shops
        .update_location(&shop.id, Some("owner-1"), GeoPoint { lat: 1.0, lng: 2.0 })
        .await
        .unwrap();
    assert_eq!(moved.latitude, Some(1.0));

    // Someone else's shop looks missing
    let err = assert_err!(shops.set_open(&shop.id, Some("intruder"), false).await);
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_daily_analytics_from_stored_entries() {
    let s = stack(QueueConfig::default()).await;
    s.add_shop("shop-1", 15).await;

    // T0 is 22:13:20 UTC; joins land at 22:14, 22:15 and 22:16
    let a = s.join("shop-1", "A").await;
    let b = s.join("shop-1", "B").await;
    let c = s.join("shop-1", "C").await;
    s.queue.leave(&c.id, None).await.unwrap();

    s.clock.advance(4 * MINUTE);
    s.queue.call_next("shop-1").await.unwrap();
    s.queue.complete(&a.id, None).await.unwrap();

    s.clock.advance(3 * MINUTE);
    s.queue.call_next("shop-1").await.unwrap();
    s.queue.complete(&b.id, None).await.unwrap();

    let analytics = AnalyticsService::new(s.queue_repo.clone(), s.shop_repo.clone());
    let day = NaiveDate::from_ymd_opt(2023, 11, 14).unwrap();
    let stats = analytics.daily("shop-1", day).await.unwrap();

    assert_eq!(stats.total_customers, 2);
    assert_eq!(stats.cancelled, 1);
    // A waited 6 minutes, B 8
    assert_eq!(stats.average_wait_time, Some(7));
    assert_eq!(stats.peak_hour, Some(22));

    let next_day = analytics
        .daily("shop-1", day.succ_opt().unwrap())
        .await
        .unwrap();
    assert_eq!(next_day.total_customers, 0);
    assert_eq!(next_day.peak_hour, None);
}

// Domain Layer - Pure queue logic and entities

pub mod analytics;
pub mod entry;
pub mod error;
pub mod estimator;
pub mod geo;
pub mod shop;

// Re-exports
pub use analytics::DailyAnalytics;
pub use entry::{CustomerId, EntryId, EntryStatus, QueueEntry};
pub use error::DomainError;
pub use estimator::{recompute_positions, select_in_service};
pub use geo::{haversine_km, sort_by_distance, GeoPoint, EARTH_RADIUS_KM};
pub use shop::{Shop, ShopId, DEFAULT_AVERAGE_SERVICE_TIME};

// Geocoding port (best-effort address -> coordinates)

use crate::domain::GeoPoint;
use crate::error::Result;
use async_trait::async_trait;

/// Search bias: prefer results near a point (e.g. the owner's device location)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBias {
    pub center: GeoPoint,
    /// Map zoom level the provider should search at
    pub zoom: u8,
}

impl GeoBias {
    pub const DEFAULT_ZOOM: u8 = 14;

    pub fn near(center: GeoPoint) -> Self {
        Self {
            center,
            zoom: Self::DEFAULT_ZOOM,
        }
    }
}

/// Geocoder port
///
/// Implementations:
/// - SerpApiGeocoder (infra-geo): Google Maps results through SerpAPI
/// - DisabledGeocoder: no provider configured
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve an address
    ///
    /// # Returns
    /// - `Ok(Some(point))` when the provider found coordinates
    /// - `Ok(None)` when the address could not be resolved
    ///
    /// # Errors
    /// - AppError::ExternalService if the provider is unreachable or misconfigured
    async fn geocode(&self, address: &str, bias: Option<GeoBias>) -> Result<Option<GeoPoint>>;
}

/// Geocoder used when no provider key is configured
pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn geocode(&self, address: &str, _bias: Option<GeoBias>) -> Result<Option<GeoPoint>> {
        tracing::debug!(address = %address, "Geocoding disabled, leaving shop without coordinates");
        Ok(None)
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::{Arc, Mutex};

    /// Mock geocoder behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        Found(GeoPoint),
        NotFound,
        Fail(String),
    }

    pub struct MockGeocoder {
        behavior: Arc<Mutex<MockBehavior>>,
        calls: Arc<Mutex<Vec<(String, Option<GeoBias>)>>>,
    }

    impl MockGeocoder {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn found(lat: f64, lng: f64) -> Self {
            Self::new(MockBehavior::Found(GeoPoint { lat, lng }))
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn last_bias(&self) -> Option<GeoBias> {
            self.calls.lock().unwrap().last().and_then(|(_, bias)| *bias)
        }
    }

    #[async_trait]
    impl Geocoder for MockGeocoder {
        async fn geocode(&self, address: &str, bias: Option<GeoBias>) -> Result<Option<GeoPoint>> {
            self.calls.lock().unwrap().push((address.to_string(), bias));
            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                MockBehavior::Found(point) => Ok(Some(point)),
                MockBehavior::NotFound => Ok(None),
                MockBehavior::Fail(msg) => Err(AppError::ExternalService(msg)),
            }
        }
    }
}

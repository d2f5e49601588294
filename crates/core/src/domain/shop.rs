// Shop Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// Shop ID (UUID v4)
pub type ShopId = String;

/// Average service time used when the owner never set one (minutes)
pub const DEFAULT_AVERAGE_SERVICE_TIME: u32 = 15;

/// Upper bound for a configured average service time (minutes)
pub const MAX_AVERAGE_SERVICE_TIME: u32 = 480;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub owner_id: Option<String>,
    pub name: String,
    pub address: String,

    // None until geolocation or geocoding resolves the address
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub is_open: bool,
    pub average_service_time: u32, // minutes

    pub rating: Option<f64>,
    pub price_range: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,

    pub created_at: i64, // epoch ms
}

impl Shop {
    /// Create a new open shop without coordinates
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: None,
            name: name.into(),
            address: address.into(),
            latitude: None,
            longitude: None,
            is_open: true,
            average_service_time: DEFAULT_AVERAGE_SERVICE_TIME,
            rating: None,
            price_range: None,
            phone: None,
            description: None,
            created_at,
        }
    }

    /// Coordinates, if both halves are known
    pub fn coordinates(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        }
    }

    pub fn set_coordinates(&mut self, point: Option<GeoPoint>) {
        self.latitude = point.map(|p| p.lat);
        self.longitude = point.map(|p| p.lng);
    }

    /// Validate owner-supplied fields before persisting
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "shop name cannot be empty".to_string(),
            ));
        }
        if self.address.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "shop address cannot be empty".to_string(),
            ));
        }
        if self.average_service_time == 0 || self.average_service_time > MAX_AVERAGE_SERVICE_TIME
        {
            return Err(DomainError::ValidationError(format!(
                "average service time out of range (1-{} minutes): {}",
                MAX_AVERAGE_SERVICE_TIME, self.average_service_time
            )));
        }
        if let Some(point) = self.coordinates() {
            point.validate()?;
        }
        Ok(())
    }
}

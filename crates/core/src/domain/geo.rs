// Great-circle distance and shop ordering

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// WGS84 latitude/longitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        let point = Self { lat, lng };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<()> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lng_ok = self.lng.is_finite() && (-180.0..=180.0).contains(&self.lng);
        if lat_ok && lng_ok {
            Ok(())
        } else {
            Err(DomainError::InvalidCoordinates {
                lat: self.lat.to_string(),
                lng: self.lng.to_string(),
            })
        }
    }
}

/// Haversine great-circle distance in kilometres
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let sin_d_lat = (d_lat / 2.0).sin();
    let sin_d_lng = (d_lng / 2.0).sin();
    let h = sin_d_lat * sin_d_lat + lat1.cos() * lat2.cos() * sin_d_lng * sin_d_lng;
    // Rounding can push h a hair outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Stable ascending sort by distance from `origin`
///
/// Items without coordinates count as infinitely far and keep their relative
/// order at the end. Returns each item paired with its distance in km.
pub fn sort_by_distance<T, F>(origin: GeoPoint, items: Vec<T>, locate: F) -> Vec<(T, Option<f64>)>
where
    F: Fn(&T) -> Option<GeoPoint>,
{
    let mut ranked: Vec<(T, Option<f64>)> = items
        .into_iter()
        .map(|item| {
            let distance = locate(&item).map(|p| haversine_km(origin, p));
            (item, distance)
        })
        .collect();

    // Vec::sort_by is stable; total_cmp keeps NaN from breaking the ordering
    ranked.sort_by(|(_, a), (_, b)| {
        let a = a.unwrap_or(f64::INFINITY);
        let b = b.unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    });
    ranked
}

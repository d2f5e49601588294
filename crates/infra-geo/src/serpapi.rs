// SerpAPI geocoder (Google Maps engine)
//
// reason: reqwest for HTTP, the client is built lazily through LazyLoader so a
// daemon without network access still starts.

use async_trait::async_trait;
use queueease_core::domain::GeoPoint;
use queueease_core::error::{AppError, Result};
use queueease_core::port::{GeoBias, Geocoder, LazyLoader, ResourceLoader};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";
const SEARCH_PATH: &str = "/search.json";
const ENGINE: &str = "google_maps";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SerpApiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl SerpApiConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Ready-to-use HTTP handle
pub struct SerpApiClient {
    http: reqwest::Client,
    api_key: String,
    search_url: String,
}

struct SerpApiClientLoader {
    config: SerpApiConfig,
}

#[async_trait]
impl ResourceLoader<SerpApiClient> for SerpApiClientLoader {
    fn name(&self) -> &str {
        "serpapi-client"
    }

    async fn load(&self) -> Result<SerpApiClient> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Config("SerpAPI key is not configured".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| AppError::ExternalService(format!("HTTP client build failed: {}", e)))?;

        Ok(SerpApiClient {
            http,
            api_key: api_key.to_string(),
            search_url: format!("{}{}", self.config.base_url.trim_end_matches('/'), SEARCH_PATH),
        })
    }
}

pub struct SerpApiGeocoder {
    client: LazyLoader<SerpApiClient>,
}

impl SerpApiGeocoder {
    pub fn new(config: SerpApiConfig) -> Self {
        Self {
            client: LazyLoader::new(SerpApiClientLoader { config }),
        }
    }
}

#[async_trait]
impl Geocoder for SerpApiGeocoder {
    async fn geocode(&self, address: &str, bias: Option<GeoBias>) -> Result<Option<GeoPoint>> {
        let client = self.client.get().await?;

        let mut query: Vec<(&str, String)> = vec![
            ("engine", ENGINE.to_string()),
            ("q", address.to_string()),
            ("api_key", client.api_key.clone()),
        ];
        if let Some(bias) = bias {
            query.push(("ll", viewport(bias)));
        }

        let response = client
            .http
            .get(&client.search_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("SerpAPI request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "SerpAPI returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("SerpAPI response unreadable: {}", e)))?;

        if let Some(error) = &body.error {
            warn!(address = %address, error = %error, "SerpAPI reported an error");
        }

        let point = body.coordinates();
        debug!(address = %address, found = point.is_some(), "Geocoded address");
        Ok(point)
    }
}

/// `@lat,lng,zoomz` search viewport
fn viewport(bias: GeoBias) -> String {
    format!("@{},{},{}z", bias.center.lat, bias.center.lng, bias.zoom)
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    place_results: Option<PlaceResult>,
    #[serde(default)]
    local_results: Option<Vec<PlaceResult>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    gps_coordinates: Option<GpsCoordinates>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct GpsCoordinates {
    latitude: f64,
    longitude: f64,
}

impl SearchResponse {
    /// Exact place match first, then the first local result with coordinates
    fn coordinates(&self) -> Option<GeoPoint> {
        let exact = self
            .place_results
            .as_ref()
            .and_then(|p| p.gps_coordinates);
        let first_local = || {
            self.local_results
                .iter()
                .flatten()
                .find_map(|r| r.gps_coordinates)
        };

        exact.or_else(first_local).map(|gps| GeoPoint {
            lat: gps.latitude,
            lng: gps.longitude,
        })
    }
}

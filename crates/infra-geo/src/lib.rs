// QueueEase Infrastructure - Geocoding Adapter
// Implements: Geocoder

pub mod serpapi;

pub use serpapi::{SerpApiConfig, SerpApiGeocoder, DEFAULT_BASE_URL};

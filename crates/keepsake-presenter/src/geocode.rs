//! The location-search collaborator seam.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// A geocoding result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Place {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Error from the location-search collaborator.
#[derive(Debug, thiserror::Error)]
#[error("geocoding failed: {0}")]
pub struct GeocodeError(pub String);

/// Resolves free-text place names to coordinates and back.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Search for a place; callers use the first result.
    async fn search(&self, text: &str) -> Result<Vec<Place>, GeocodeError>;

    /// Resolve coordinates back to a display name.
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<String>, GeocodeError>;
}

/// Caches the first search result per query.
///
/// Capsules re-render often and place names rarely change; one lookup per
/// name per session is enough. Failed lookups are cached too, so a broken
/// collaborator is asked once, not on every render.
pub struct CachedGeocoder {
    inner: Box<dyn Geocoder>,
    cache: Mutex<HashMap<String, Option<Place>>>,
}

impl CachedGeocoder {
    pub fn new(inner: Box<dyn Geocoder>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// First search result for a place name, cached.
    pub async fn first_result(&self, text: &str) -> Option<Place> {
        let key = text.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(&key) {
            return cached.clone();
        }

        let result = match self.inner.search(text).await {
            Ok(places) => places.into_iter().next(),
            Err(e) => {
                tracing::warn!(place = text, error = %e, "geocode lookup failed");
                None
            }
        };
        cache.insert(key, result.clone());
        result
    }

    /// Display name for coordinates ("use my current location" flows).
    pub async fn place_name(&self, lat: f64, lon: f64) -> Option<String> {
        match self.inner.reverse_geocode(lat, lon).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(lat, lon, error = %e, "reverse geocode failed");
                None
            }
        }
    }
}

/// Fixed-table geocoder for tests and offline previews.
pub struct StaticGeocoder {
    places: Vec<Place>,
}

impl StaticGeocoder {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places }
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn search(&self, text: &str) -> Result<Vec<Place>, GeocodeError> {
        let needle = text.to_lowercase();
        Ok(self
            .places
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<String>, GeocodeError> {
        Ok(self
            .places
            .iter()
            .find(|p| (p.lat - lat).abs() < 1e-6 && (p.lon - lon).abs() < 1e-6)
            .map(|p| p.name.clone()))
    }
}

//! The map-preview fallback chain.
//!
//! Capsules were authored at different times with different levels of
//! location detail: some carry a pre-rendered map URL, some only
//! coordinates, some only a place name, some nothing. The chain degrades
//! through those levels instead of failing.

use keepsake_types::MapRef;
use serde::{Deserialize, Serialize};

use crate::geocode::CachedGeocoder;

/// What the UI should show for a capsule's location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "preview", rename_all = "snake_case")]
pub enum MapPreview {
    /// A stored static map image.
    StaticImage { url: String },
    /// Coordinates for the host's map widget.
    Coordinates { lat: f64, lon: f64 },
    /// Only the place name text.
    PlaceOnly { name: String },
    /// No location detail at all.
    None,
}

/// Resolve a displayable map preview.
///
/// Order: stored map URL, stored coordinates, geocoded place name (first
/// result, cached), place-name text, nothing.
pub async fn resolve_map_preview(
    place_name: Option<&str>,
    map_ref: Option<&MapRef>,
    geocoder: &CachedGeocoder,
) -> MapPreview {
    if let Some(map_ref) = map_ref {
        if let Some(url) = &map_ref.map_url {
            if !url.is_empty() {
                return MapPreview::StaticImage { url: url.clone() };
            }
        }
        if let Some((lat, lon)) = map_ref.coordinates() {
            return MapPreview::Coordinates { lat, lon };
        }
    }

    let Some(name) = place_name.map(str::trim).filter(|n| !n.is_empty()) else {
        return MapPreview::None;
    };

    match geocoder.first_result(name).await {
        Some(place) => MapPreview::Coordinates {
            lat: place.lat,
            lon: place.lon,
        },
        None => MapPreview::PlaceOnly {
            name: name.to_string(),
        },
    }
}

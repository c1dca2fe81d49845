//! # keepsake-presenter
//!
//! Turns capsules into display-ready view models.
//!
//! Rendering is total: every payload variant has an exhaustive arm, blocks
//! missing their required field render as nothing, and location detail
//! degrades through a fallback chain instead of failing. The presenter only
//! reads loaded snapshots; it never mutates capsule state.
//!
//! ## Modules
//!
//! - [`render`] — the content render model.
//! - [`card`] — catalog card view models and unlock affordances.
//! - [`geocode`] — the location-search collaborator seam with caching.
//! - [`map_preview`] — the map-preview fallback chain.

pub mod card;
pub mod geocode;
pub mod map_preview;
pub mod render;

pub use card::{build_cards, CapsuleAffordance, CapsuleCard};
pub use geocode::{CachedGeocoder, GeocodeError, Geocoder, Place};
pub use map_preview::MapPreview;
pub use render::{present, RenderedBlock, RenderedBody, RenderedCapsule};

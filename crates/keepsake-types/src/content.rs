//! Content payload structures.
//!
//! The payload is a closed tagged union: every capsule carries exactly one
//! of the six variants, and consumers match exhaustively. The mixed variant
//! carries an ordered block list whose order is authoritative.

use serde::{Deserialize, Serialize};

/// Discriminator for the payload variants, used by catalog filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Image,
    Video,
    Invitation,
    Event,
    Mixed,
}

/// A map reference attached to invitation/event content.
///
/// Capsules authored at different times carry different levels of location
/// detail; any combination of fields may be absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct MapRef {
    /// Pre-rendered static map image URL, if one was stored.
    pub map_url: Option<String>,
    /// Stored latitude.
    pub lat: Option<f64>,
    /// Stored longitude.
    pub lon: Option<f64>,
}

impl MapRef {
    /// Whether the reference carries a usable coordinate pair.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// The kind of a single mixed-content block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Image,
    Video,
}

/// One element of the ordered block list inside a mixed capsule.
///
/// Blocks have no identity beyond their position plus `key`, a locally
/// unique string used only for edit-time diffing. The key is not part of
/// the persisted record; it is reassigned from position on decode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct ContentBlock {
    /// Block kind.
    pub kind: BlockKind,
    /// Local diff key.
    pub key: String,
    /// Optional block heading.
    pub title: Option<String>,
    /// Text body (text blocks).
    pub text_content: Option<String>,
    /// Stored media URL (image/video blocks).
    pub media_url: Option<String>,
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(key: impl Into<String>, title: Option<String>, body: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Text,
            key: key.into(),
            title,
            text_content: Some(body.into()),
            media_url: None,
        }
    }

    /// Create an image block pointing at a stored media URL.
    pub fn image(key: impl Into<String>, title: Option<String>, url: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Image,
            key: key.into(),
            title,
            text_content: None,
            media_url: Some(url.into()),
        }
    }

    /// Create a video block pointing at a stored media URL.
    pub fn video(key: impl Into<String>, title: Option<String>, url: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Video,
            key: key.into(),
            title,
            text_content: None,
            media_url: Some(url.into()),
        }
    }
}

/// A capsule's typed content payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "content_type", rename_all = "snake_case")]
pub enum ContentPayload {
    /// Plain text content.
    Text {
        title: String,
        description: String,
        body: String,
    },
    /// A single photo.
    Image {
        title: String,
        description: String,
        image_url: String,
    },
    /// A single video.
    Video {
        title: String,
        description: String,
        video_url: String,
    },
    /// A formal invitation with optional place and time.
    Invitation {
        title: String,
        description: String,
        body: String,
        #[ts(type = "string | null")]
        event_date: Option<chrono::NaiveDate>,
        place_name: Option<String>,
        map_ref: Option<MapRef>,
    },
    /// A scheduled event, optionally with a list of planned activities.
    Event {
        title: String,
        description: String,
        body: String,
        #[ts(type = "string | null")]
        event_date: Option<chrono::NaiveDate>,
        place_name: Option<String>,
        map_ref: Option<MapRef>,
        activities: Vec<String>,
    },
    /// A freely ordered mixture of text/photo/video blocks.
    Mixed {
        title: String,
        description: String,
        blocks: Vec<ContentBlock>,
    },
}

impl ContentPayload {
    /// The variant discriminator.
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Text { .. } => ContentKind::Text,
            Self::Image { .. } => ContentKind::Image,
            Self::Video { .. } => ContentKind::Video,
            Self::Invitation { .. } => ContentKind::Invitation,
            Self::Event { .. } => ContentKind::Event,
            Self::Mixed { .. } => ContentKind::Mixed,
        }
    }

    /// The content title.
    pub fn title(&self) -> &str {
        match self {
            Self::Text { title, .. }
            | Self::Image { title, .. }
            | Self::Video { title, .. }
            | Self::Invitation { title, .. }
            | Self::Event { title, .. }
            | Self::Mixed { title, .. } => title,
        }
    }

    /// The content description.
    pub fn description(&self) -> &str {
        match self {
            Self::Text { description, .. }
            | Self::Image { description, .. }
            | Self::Video { description, .. }
            | Self::Invitation { description, .. }
            | Self::Event { description, .. }
            | Self::Mixed { description, .. } => description,
        }
    }

    /// Whether the payload is presentable as content-complete.
    ///
    /// A mixed payload may be authored incrementally; it counts as complete
    /// only once at least one block exists. Every other variant is complete
    /// by construction.
    pub fn is_complete(&self) -> bool {
        match self {
            Self::Mixed { blocks, .. } => !blocks.is_empty(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let payload = ContentPayload::Text {
            title: "t".to_string(),
            description: "d".to_string(),
            body: "b".to_string(),
        };
        assert_eq!(payload.kind(), ContentKind::Text);
        assert_eq!(payload.title(), "t");
        assert_eq!(payload.description(), "d");
    }

    #[test]
    fn test_mixed_completeness_requires_a_block() {
        let empty = ContentPayload::Mixed {
            title: "t".to_string(),
            description: "d".to_string(),
            blocks: vec![],
        };
        assert!(!empty.is_complete());

        let with_block = ContentPayload::Mixed {
            title: "t".to_string(),
            description: "d".to_string(),
            blocks: vec![ContentBlock::text("b0", None, "hello")],
        };
        assert!(with_block.is_complete());
    }

    #[test]
    fn test_map_ref_coordinates_need_both_axes() {
        let partial = MapRef {
            map_url: None,
            lat: Some(41.38),
            lon: None,
        };
        assert!(partial.coordinates().is_none());

        let full = MapRef {
            map_url: None,
            lat: Some(41.38),
            lon: Some(2.17),
        };
        assert_eq!(full.coordinates(), Some((41.38, 2.17)));
    }

    #[test]
    fn test_payload_serde_tagging() {
        let payload = ContentPayload::Image {
            title: "photo".to_string(),
            description: "a photo".to_string(),
            image_url: "https://cdn.example/p.jpg".to_string(),
        };
        let json = serde_json::to_value(&payload).expect("serialize payload");
        assert_eq!(json["content_type"], "image");
        assert_eq!(json["image_url"], "https://cdn.example/p.jpg");
    }
}

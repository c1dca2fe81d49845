//! The content render model.
//!
//! One display node per payload variant, produced by exhaustive match. The
//! caller checks unlock state first (see [`crate::card`]); rendering itself
//! never gates.

use chrono::NaiveDate;
use keepsake_types::{BlockKind, Capsule, ContentBlock, ContentPayload};
use serde::{Deserialize, Serialize};

use crate::geocode::CachedGeocoder;
use crate::map_preview::{resolve_map_preview, MapPreview};

/// One rendered mixed-content block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "block", rename_all = "snake_case")]
pub enum RenderedBlock {
    Text {
        title: Option<String>,
        body: String,
    },
    Image {
        title: Option<String>,
        url: String,
    },
    Video {
        title: Option<String>,
        url: String,
    },
}

/// The variant-specific part of a rendered capsule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedBody {
    Text {
        body: String,
    },
    Image {
        image_url: String,
    },
    Video {
        video_url: String,
    },
    Invitation {
        body: String,
        #[ts(type = "string | null")]
        event_date: Option<NaiveDate>,
        place_name: Option<String>,
        map: MapPreview,
    },
    Event {
        body: String,
        #[ts(type = "string | null")]
        event_date: Option<NaiveDate>,
        place_name: Option<String>,
        map: MapPreview,
        activities: Vec<String>,
    },
    Blocks {
        blocks: Vec<RenderedBlock>,
    },
}

/// A capsule ready for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct RenderedCapsule {
    pub title: String,
    pub description: String,
    /// Play the celebratory animation when opening.
    pub celebrate: bool,
    pub content: RenderedBody,
}

/// Render one block, or nothing when its required field is absent.
fn render_block(block: &ContentBlock) -> Option<RenderedBlock> {
    match block.kind {
        BlockKind::Text => {
            let body = block.text_content.clone().filter(|b| !b.is_empty())?;
            Some(RenderedBlock::Text {
                title: block.title.clone(),
                body,
            })
        }
        BlockKind::Image => {
            let url = block.media_url.clone().filter(|u| !u.is_empty())?;
            Some(RenderedBlock::Image {
                title: block.title.clone(),
                url,
            })
        }
        BlockKind::Video => {
            let url = block.media_url.clone().filter(|u| !u.is_empty())?;
            Some(RenderedBlock::Video {
                title: block.title.clone(),
                url,
            })
        }
    }
}

/// Render a capsule's content for display.
///
/// Blocks keep their stored order exactly; incomplete ones are dropped
/// silently. Location detail for invitation/event content goes through the
/// map-preview fallback chain.
pub async fn present(capsule: &Capsule, geocoder: &CachedGeocoder) -> RenderedCapsule {
    let content = match &capsule.content {
        ContentPayload::Text { body, .. } => RenderedBody::Text { body: body.clone() },
        ContentPayload::Image { image_url, .. } => RenderedBody::Image {
            image_url: image_url.clone(),
        },
        ContentPayload::Video { video_url, .. } => RenderedBody::Video {
            video_url: video_url.clone(),
        },
        ContentPayload::Invitation {
            body,
            event_date,
            place_name,
            map_ref,
            ..
        } => RenderedBody::Invitation {
            body: body.clone(),
            event_date: *event_date,
            place_name: place_name.clone(),
            map: resolve_map_preview(place_name.as_deref(), map_ref.as_ref(), geocoder).await,
        },
        ContentPayload::Event {
            body,
            event_date,
            place_name,
            map_ref,
            activities,
            ..
        } => RenderedBody::Event {
            body: body.clone(),
            event_date: *event_date,
            place_name: place_name.clone(),
            map: resolve_map_preview(place_name.as_deref(), map_ref.as_ref(), geocoder).await,
            activities: activities.clone(),
        },
        ContentPayload::Mixed { blocks, .. } => RenderedBody::Blocks {
            blocks: blocks.iter().filter_map(render_block).collect(),
        },
    };

    RenderedCapsule {
        title: capsule.content.title().to_string(),
        description: capsule.content.description().to_string(),
        celebrate: capsule.effects.celebrate_on_unlock,
        content,
    }
}

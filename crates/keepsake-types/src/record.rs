//! Flattened persistence records.
//!
//! The persistence collaborator stores capsules with policy and content
//! fields flattened: an `unlock_type` discriminator with nullable policy
//! columns, a `content_type` discriminator with nullable per-variant
//! columns, and `content_blocks` as an ordered array of
//! `{ type, title, content, url }`.
//!
//! Conversion to the typed model is strict about discriminators and
//! variant-required fields, but lenient about block rows: a block with an
//! unrecognized `type` string is skipped on decode (it renders as nothing),
//! so newer authoring clients never brick older viewers.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capsule::{Capsule, CapsuleEffects, UnlockPolicy};
use crate::content::{BlockKind, ContentBlock, ContentPayload, MapRef};
use crate::{CapsuleId, RecordError, Result};

/// `unlock_type` discriminator values.
pub mod unlock_type {
    pub const FREE: &str = "free";
    pub const BY_DATE: &str = "by_date";
    pub const BY_SECRET_KEY: &str = "by_secret_key";
    pub const SEQUENTIAL: &str = "sequential";
}

/// `content_type` discriminator values.
pub mod content_type {
    pub const TEXT: &str = "text";
    pub const IMAGE: &str = "image";
    pub const VIDEO: &str = "video";
    pub const INVITATION: &str = "invitation";
    pub const EVENT: &str = "event";
    pub const MIXED: &str = "mixed";
}

/// One stored mixed-content block row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct BlockRecord {
    /// Block type: "text" | "image" | "video". Unknown values are skipped
    /// on decode.
    #[serde(rename = "type")]
    pub block_type: String,
    pub title: Option<String>,
    /// Text body for text blocks.
    pub content: Option<String>,
    /// Stored media URL for image/video blocks.
    pub url: Option<String>,
}

/// The flattened capsule row exchanged with the persistence collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct CapsuleRecord {
    pub id: CapsuleId,
    pub title: String,
    pub order_index: i64,

    pub unlock_type: String,
    #[ts(type = "string | null")]
    pub unlock_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub unlock_time: Option<NaiveTime>,
    pub required_key: Option<String>,
    pub depends_on_id: Option<CapsuleId>,

    pub is_unlocked: bool,
    #[ts(type = "string | null")]
    pub unlocked_at: Option<DateTime<Utc>>,
    pub edit_secret: Option<String>,
    pub celebrate_on_unlock: bool,

    pub content_type: String,
    pub content_title: String,
    pub content_description: String,
    pub body: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    #[ts(type = "string | null")]
    pub event_date: Option<NaiveDate>,
    pub place_name: Option<String>,
    pub map_url: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub activities: Option<Vec<String>>,
    pub content_blocks: Vec<BlockRecord>,
}

fn require<T>(value: Option<T>, field: &'static str, variant: &'static str) -> Result<T> {
    value.ok_or(RecordError::MissingField { field, variant })
}

fn map_ref_from_record(record: &CapsuleRecord) -> Option<MapRef> {
    if record.map_url.is_none() && record.lat.is_none() && record.lon.is_none() {
        return None;
    }
    Some(MapRef {
        map_url: record.map_url.clone(),
        lat: record.lat,
        lon: record.lon,
    })
}

/// Decode stored block rows, preserving order and skipping unknown types.
fn decode_blocks(rows: &[BlockRecord]) -> Vec<ContentBlock> {
    let mut blocks = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let kind = match row.block_type.as_str() {
            content_type::TEXT => BlockKind::Text,
            content_type::IMAGE => BlockKind::Image,
            content_type::VIDEO => BlockKind::Video,
            other => {
                tracing::warn!(block_type = other, index, "skipping unknown content block");
                continue;
            }
        };
        blocks.push(ContentBlock {
            kind,
            // Diff keys are local; reassigned from position on every load.
            key: format!("b{index}"),
            title: row.title.clone(),
            text_content: row.content.clone(),
            media_url: row.url.clone(),
        });
    }
    blocks
}

fn encode_blocks(blocks: &[ContentBlock]) -> Vec<BlockRecord> {
    blocks
        .iter()
        .map(|block| BlockRecord {
            block_type: match block.kind {
                BlockKind::Text => content_type::TEXT,
                BlockKind::Image => content_type::IMAGE,
                BlockKind::Video => content_type::VIDEO,
            }
            .to_string(),
            title: block.title.clone(),
            content: block.text_content.clone(),
            url: block.media_url.clone(),
        })
        .collect()
}

impl TryFrom<CapsuleRecord> for Capsule {
    type Error = RecordError;

    fn try_from(record: CapsuleRecord) -> Result<Self> {
        if record.is_unlocked != record.unlocked_at.is_some() {
            return Err(RecordError::UnlockStateMismatch);
        }

        let unlock_policy = match record.unlock_type.as_str() {
            unlock_type::FREE => UnlockPolicy::Free,
            unlock_type::BY_DATE => UnlockPolicy::ByDate {
                date: require(record.unlock_date, "unlock_date", "by_date")?,
                time: record.unlock_time,
            },
            unlock_type::BY_SECRET_KEY => UnlockPolicy::BySecretKey {
                key: require(record.required_key.clone(), "required_key", "by_secret_key")?,
            },
            unlock_type::SEQUENTIAL => UnlockPolicy::Sequential {
                depends_on: require(record.depends_on_id.clone(), "depends_on_id", "sequential")?,
            },
            other => return Err(RecordError::UnknownUnlockType(other.to_string())),
        };

        let content = match record.content_type.as_str() {
            content_type::TEXT => ContentPayload::Text {
                title: record.content_title.clone(),
                description: record.content_description.clone(),
                body: require(record.body.clone(), "body", "text")?,
            },
            content_type::IMAGE => ContentPayload::Image {
                title: record.content_title.clone(),
                description: record.content_description.clone(),
                image_url: require(record.image_url.clone(), "image_url", "image")?,
            },
            content_type::VIDEO => ContentPayload::Video {
                title: record.content_title.clone(),
                description: record.content_description.clone(),
                video_url: require(record.video_url.clone(), "video_url", "video")?,
            },
            content_type::INVITATION => ContentPayload::Invitation {
                title: record.content_title.clone(),
                description: record.content_description.clone(),
                body: require(record.body.clone(), "body", "invitation")?,
                event_date: record.event_date,
                place_name: record.place_name.clone(),
                map_ref: map_ref_from_record(&record),
            },
            content_type::EVENT => ContentPayload::Event {
                title: record.content_title.clone(),
                description: record.content_description.clone(),
                body: require(record.body.clone(), "body", "event")?,
                event_date: record.event_date,
                place_name: record.place_name.clone(),
                map_ref: map_ref_from_record(&record),
                activities: record.activities.clone().unwrap_or_default(),
            },
            content_type::MIXED => ContentPayload::Mixed {
                title: record.content_title.clone(),
                description: record.content_description.clone(),
                blocks: decode_blocks(&record.content_blocks),
            },
            other => return Err(RecordError::UnknownContentType(other.to_string())),
        };

        Ok(Capsule {
            id: record.id,
            title: record.title,
            order_index: record.order_index,
            unlock_policy,
            is_unlocked: record.is_unlocked,
            unlocked_at: record.unlocked_at,
            edit_secret: record.edit_secret,
            content,
            effects: CapsuleEffects {
                celebrate_on_unlock: record.celebrate_on_unlock,
            },
        })
    }
}

impl From<&Capsule> for CapsuleRecord {
    fn from(capsule: &Capsule) -> Self {
        let (unlock_type, unlock_date, unlock_time, required_key, depends_on_id) =
            match &capsule.unlock_policy {
                UnlockPolicy::Free => (unlock_type::FREE, None, None, None, None),
                UnlockPolicy::ByDate { date, time } => {
                    (unlock_type::BY_DATE, Some(*date), *time, None, None)
                }
                UnlockPolicy::BySecretKey { key } => {
                    (unlock_type::BY_SECRET_KEY, None, None, Some(key.clone()), None)
                }
                UnlockPolicy::Sequential { depends_on } => {
                    (unlock_type::SEQUENTIAL, None, None, None, Some(depends_on.clone()))
                }
            };

        let mut record = CapsuleRecord {
            id: capsule.id.clone(),
            title: capsule.title.clone(),
            order_index: capsule.order_index,
            unlock_type: unlock_type.to_string(),
            unlock_date,
            unlock_time,
            required_key,
            depends_on_id,
            is_unlocked: capsule.is_unlocked,
            unlocked_at: capsule.unlocked_at,
            edit_secret: capsule.edit_secret.clone(),
            celebrate_on_unlock: capsule.effects.celebrate_on_unlock,
            content_type: String::new(),
            content_title: capsule.content.title().to_string(),
            content_description: capsule.content.description().to_string(),
            body: None,
            image_url: None,
            video_url: None,
            event_date: None,
            place_name: None,
            map_url: None,
            lat: None,
            lon: None,
            activities: None,
            content_blocks: Vec::new(),
        };

        match &capsule.content {
            ContentPayload::Text { body, .. } => {
                record.content_type = content_type::TEXT.to_string();
                record.body = Some(body.clone());
            }
            ContentPayload::Image { image_url, .. } => {
                record.content_type = content_type::IMAGE.to_string();
                record.image_url = Some(image_url.clone());
            }
            ContentPayload::Video { video_url, .. } => {
                record.content_type = content_type::VIDEO.to_string();
                record.video_url = Some(video_url.clone());
            }
            ContentPayload::Invitation {
                body,
                event_date,
                place_name,
                map_ref,
                ..
            } => {
                record.content_type = content_type::INVITATION.to_string();
                record.body = Some(body.clone());
                record.event_date = *event_date;
                record.place_name = place_name.clone();
                if let Some(map_ref) = map_ref {
                    record.map_url = map_ref.map_url.clone();
                    record.lat = map_ref.lat;
                    record.lon = map_ref.lon;
                }
            }
            ContentPayload::Event {
                body,
                event_date,
                place_name,
                map_ref,
                activities,
                ..
            } => {
                record.content_type = content_type::EVENT.to_string();
                record.body = Some(body.clone());
                record.event_date = *event_date;
                record.place_name = place_name.clone();
                if let Some(map_ref) = map_ref {
                    record.map_url = map_ref.map_url.clone();
                    record.lat = map_ref.lat;
                    record.lon = map_ref.lon;
                }
                record.activities = Some(activities.clone());
            }
            ContentPayload::Mixed { blocks, .. } => {
                record.content_type = content_type::MIXED.to_string();
                record.content_blocks = encode_blocks(blocks);
            }
        }

        record
    }
}

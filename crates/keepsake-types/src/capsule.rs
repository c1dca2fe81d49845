//! The capsule entity and unlock policies.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentPayload;
use crate::{CapsuleId, ValidationError};

/// The rule determining when/how a capsule may transition to unlocked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "unlock_type", rename_all = "snake_case")]
pub enum UnlockPolicy {
    /// No gate; unlocked from creation.
    Free,
    /// Unlockable from a calendar moment onward (boundary inclusive).
    ByDate {
        #[ts(type = "string")]
        date: NaiveDate,
        /// Absent time means the start of the calendar day.
        #[ts(type = "string | null")]
        time: Option<NaiveTime>,
    },
    /// Unlockable with a viewer-supplied passphrase.
    ///
    /// Keys are human passphrases, not cryptographic tokens; comparison is
    /// trimmed and case-insensitive.
    BySecretKey { key: String },
    /// Unlockable once another capsule has been unlocked.
    Sequential { depends_on: CapsuleId },
}

impl UnlockPolicy {
    /// The earliest instant a `ByDate` policy becomes eligible.
    ///
    /// Returns `None` for every other policy.
    pub fn eligible_from(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::ByDate { date, time } => {
                let at: NaiveDateTime = date.and_time(time.unwrap_or(NaiveTime::MIN));
                Some(at.and_utc())
            }
            _ => None,
        }
    }
}

/// Display-only flags with no effect on gating.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct CapsuleEffects {
    /// Trigger a celebratory animation when the capsule is opened.
    #[serde(default)]
    pub celebrate_on_unlock: bool,
}

/// One gated content item in the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Capsule {
    /// Stable identifier, immutable after insert.
    pub id: CapsuleId,
    /// Display title.
    pub title: String,
    /// Catalog display order, ascending.
    pub order_index: i64,
    /// The unlock gate.
    pub unlock_policy: UnlockPolicy,
    /// Monotonic: transitions false -> true exactly once, never back.
    pub is_unlocked: bool,
    /// Set exactly once on first successful unlock. Present iff unlocked.
    #[ts(type = "string | null")]
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Shared-string credential gating edits. `None` refuses all edits.
    pub edit_secret: Option<String>,
    /// Typed content payload.
    pub content: ContentPayload,
    /// Display-only flags.
    #[serde(default)]
    pub effects: CapsuleEffects,
}

impl Capsule {
    /// Whether the monotonic unlock state and its timestamp agree.
    pub fn unlock_state_consistent(&self) -> bool {
        self.is_unlocked == self.unlocked_at.is_some()
    }
}

/// Author input for a new capsule, before the store has assigned an id.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct CapsuleDraft {
    pub title: String,
    pub order_index: i64,
    pub unlock_policy: UnlockPolicy,
    /// Author-chosen edit secret. When absent, one is generated at creation
    /// and surfaced exactly once.
    pub edit_secret: Option<String>,
    pub content: ContentPayload,
    #[serde(default)]
    pub effects: CapsuleEffects,
}

impl CapsuleDraft {
    /// Local validation. Failures here block the action before any
    /// collaborator call is made.
    ///
    /// Dependency existence/acyclicity is checked separately by the
    /// authoring flow, which has the full capsule set in hand.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.content.title().trim().is_empty() {
            return Err(ValidationError::EmptyContentTitle);
        }
        if self.content.description().trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        Ok(())
    }
}

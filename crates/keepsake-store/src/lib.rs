//! # keepsake-store
//!
//! Persistence and change-notification seams for the capsule core.
//!
//! The core never talks to a backend directly; it goes through the
//! [`CapsuleStore`] trait and re-reads full state whenever the store's
//! [`ChangeFeed`] fires. Two implementations ship with the workspace:
//! [`memory::MemoryStore`] and the rusqlite-backed [`sqlite::SqliteStore`].
//!
//! ## Modules
//!
//! - [`memory`] — in-memory reference store.
//! - [`sqlite`] — SQLite store (WAL, foreign keys, versioned schema).
//! - [`refresh`] — the single invalidate-and-reload catalog snapshot path.

pub mod memory;
pub mod refresh;
pub mod sqlite;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keepsake_types::{
    Capsule, CapsuleDraft, CapsuleEffects, CapsuleId, CapsuleRecord, ContentPayload, UnlockPolicy,
};
use tokio::sync::broadcast;

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No capsule with the given id.
    #[error("capsule not found: {0}")]
    NotFound(CapsuleId),

    /// A stored record could not be decoded into the typed model.
    #[error("record decode error: {0}")]
    Decode(#[from] keepsake_types::RecordError),

    /// Column (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// What happened to a capsule row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Inserted,
    Updated,
}

/// A change notification. Carries no payload diff; consumers re-load.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,
    /// The affected capsule.
    pub capsule_id: CapsuleId,
}

/// Broadcast feed of store changes.
///
/// Delivery is best-effort: a lagging subscriber misses events, which is
/// harmless because consumers respond to any event by re-reading full state.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
    sequence: Arc<AtomicU64>,
}

impl ChangeFeed {
    /// Create a feed with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: ChangeEvent) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Total number of events emitted so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

/// A partial capsule update.
///
/// Absent fields are left untouched. There is deliberately no way to express
/// "re-lock": the unlock transition is monotonic, so the only unlock-state
/// mutation this type can carry is the first false→true commit.
#[derive(Clone, Debug, Default)]
pub struct CapsuleUpdate {
    pub title: Option<String>,
    pub order_index: Option<i64>,
    pub unlock_policy: Option<UnlockPolicy>,
    /// Set `is_unlocked = true` with this timestamp, if not already set.
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Replace the edit secret. Secrets can be rotated, never cleared.
    pub edit_secret: Option<String>,
    pub content: Option<ContentPayload>,
    pub effects: Option<CapsuleEffects>,
}

impl CapsuleUpdate {
    /// The update committed by the unlock engine.
    pub fn unlock(at: DateTime<Utc>) -> Self {
        Self {
            unlocked_at: Some(at),
            ..Self::default()
        }
    }

    /// Apply this update to a typed capsule.
    ///
    /// The unlock transition is applied only when the capsule is still
    /// locked; an already-unlocked capsule keeps its original timestamp.
    pub fn apply(&self, capsule: &mut Capsule) {
        if let Some(title) = &self.title {
            capsule.title = title.clone();
        }
        if let Some(order_index) = self.order_index {
            capsule.order_index = order_index;
        }
        if let Some(policy) = &self.unlock_policy {
            capsule.unlock_policy = policy.clone();
        }
        if let Some(at) = self.unlocked_at {
            if !capsule.is_unlocked {
                capsule.is_unlocked = true;
                capsule.unlocked_at = Some(at);
            }
        }
        if let Some(secret) = &self.edit_secret {
            capsule.edit_secret = Some(secret.clone());
        }
        if let Some(content) = &self.content {
            capsule.content = content.clone();
        }
        if let Some(effects) = &self.effects {
            capsule.effects = effects.clone();
        }
    }
}

/// The persistence collaborator seam.
///
/// Implementations persist capsules in the flattened record shape and emit
/// a [`ChangeEvent`] on every insert/update.
#[async_trait]
pub trait CapsuleStore: Send + Sync {
    /// Load every capsule record.
    async fn load_all(&self) -> Result<Vec<CapsuleRecord>>;

    /// Load one capsule record, if present.
    async fn get(&self, id: &str) -> Result<Option<CapsuleRecord>>;

    /// Insert a record, assigning an id when the record carries none.
    ///
    /// Returns the stored id.
    async fn insert(&self, record: CapsuleRecord) -> Result<CapsuleId>;

    /// Apply a partial update to an existing capsule.
    async fn update(&self, id: &str, update: CapsuleUpdate) -> Result<()>;

    /// The store's change-notification feed.
    fn change_feed(&self) -> &ChangeFeed;
}

/// Build the initial record for a validated draft.
///
/// Capsules created with a `Free` policy start unlocked with `unlocked_at`
/// preset; every other policy starts locked.
pub fn record_for_draft(draft: &CapsuleDraft, now: DateTime<Utc>) -> CapsuleRecord {
    let is_free = matches!(draft.unlock_policy, UnlockPolicy::Free);
    let capsule = Capsule {
        id: String::new(),
        title: draft.title.clone(),
        order_index: draft.order_index,
        unlock_policy: draft.unlock_policy.clone(),
        is_unlocked: is_free,
        unlocked_at: is_free.then_some(now),
        edit_secret: draft.edit_secret.clone(),
        content: draft.content.clone(),
        effects: draft.effects.clone(),
    };
    CapsuleRecord::from(&capsule)
}

/// Generate a fresh capsule id: 16 random bytes, hex-encoded.
pub(crate) fn new_capsule_id() -> CapsuleId {
    let mut bytes = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut bytes);
    hex::encode(bytes)
}

//! In-memory reference store.
//!
//! Backs tests and previews. Semantics match the SQLite store: flattened
//! records, assigned hex ids, a change event per mutation.

use std::collections::HashMap;

use async_trait::async_trait;
use keepsake_types::{Capsule, CapsuleId, CapsuleRecord};
use tokio::sync::RwLock;

use crate::{
    new_capsule_id, CapsuleStore, CapsuleUpdate, ChangeEvent, ChangeFeed, ChangeKind, Result,
    StoreError,
};

/// HashMap-backed capsule store.
pub struct MemoryStore {
    rows: RwLock<HashMap<CapsuleId, CapsuleRecord>>,
    feed: ChangeFeed,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            feed: ChangeFeed::default(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CapsuleStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<CapsuleRecord>> {
        let rows = self.rows.read().await;
        let mut all: Vec<CapsuleRecord> = rows.values().cloned().collect();
        all.sort_by(|a, b| a.order_index.cmp(&b.order_index).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn get(&self, id: &str) -> Result<Option<CapsuleRecord>> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn insert(&self, mut record: CapsuleRecord) -> Result<CapsuleId> {
        if record.id.is_empty() {
            record.id = new_capsule_id();
        }
        let id = record.id.clone();
        self.rows.write().await.insert(id.clone(), record);
        self.feed.emit(ChangeEvent {
            kind: ChangeKind::Inserted,
            capsule_id: id.clone(),
        });
        Ok(id)
    }

    async fn update(&self, id: &str, update: CapsuleUpdate) -> Result<()> {
        {
            let mut rows = self.rows.write().await;
            let record = rows
                .get(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let mut capsule = Capsule::try_from(record.clone())?;
            update.apply(&mut capsule);
            rows.insert(id.to_string(), CapsuleRecord::from(&capsule));
        }
        self.feed.emit(ChangeEvent {
            kind: ChangeKind::Updated,
            capsule_id: id.to_string(),
        });
        Ok(())
    }

    fn change_feed(&self) -> &ChangeFeed {
        &self.feed
    }
}

//! The catalog snapshot and its single invalidate-and-reload path.
//!
//! Change-feed pushes and host-app polling are both just causes of the same
//! effect: [`CatalogRefresher::refresh`] re-reads full store state. No
//! consumer applies incremental deltas, so out-of-order or dropped
//! notifications cannot make the snapshot diverge.

use std::sync::Arc;

use keepsake_types::Capsule;
use tokio::sync::watch;

use crate::{CapsuleStore, Result};

/// Owns the decoded capsule snapshot consumed by catalog and presenter.
///
/// The snapshot is read-only for consumers; it is replaced wholesale on
/// refresh, or tentatively patched by an optimistic command that uses a
/// later `refresh()` as its compensating inverse.
pub struct CatalogRefresher {
    store: Arc<dyn CapsuleStore>,
    snapshot: watch::Sender<Vec<Capsule>>,
}

impl CatalogRefresher {
    /// Create a refresher over the given store with an empty snapshot.
    pub fn new(store: Arc<dyn CapsuleStore>) -> Self {
        let (snapshot, _) = watch::channel(Vec::new());
        Self { store, snapshot }
    }

    /// Re-read the full capsule set from the store.
    ///
    /// Records that no longer decode are skipped with a warning rather than
    /// poisoning the whole snapshot.
    pub async fn refresh(&self) -> Result<()> {
        let records = self.store.load_all().await?;
        let mut capsules = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id.clone();
            match Capsule::try_from(record) {
                Ok(capsule) => capsules.push(capsule),
                Err(e) => tracing::warn!(capsule_id = %id, error = %e, "skipping undecodable capsule"),
            }
        }
        capsules.sort_by(|a, b| a.order_index.cmp(&b.order_index).then(a.id.cmp(&b.id)));
        self.snapshot.send_replace(capsules);
        Ok(())
    }

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Capsule>> {
        self.snapshot.subscribe()
    }

    /// The current snapshot.
    pub fn current(&self) -> Vec<Capsule> {
        self.snapshot.borrow().clone()
    }

    /// Apply a tentative, local-only mutation to the snapshot.
    ///
    /// This is the optimistic half of a command: the caller then issues the
    /// real persistence call, and on failure compensates with a plain
    /// [`refresh`](Self::refresh), which restores authoritative state.
    pub fn apply_tentative(&self, mutate: impl FnOnce(&mut Vec<Capsule>)) {
        self.snapshot.send_modify(mutate);
    }

    /// Spawn a task that refreshes the snapshot on every change event.
    ///
    /// A lagging subscription is treated like any other event: one more
    /// full reload.
    pub fn listen(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let refresher = Arc::clone(self);
        let mut events = self.store.change_feed().subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                        if let Err(e) = refresher.refresh().await {
                            tracing::warn!(error = %e, "catalog refresh failed");
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::record_for_draft;
    use chrono::Utc;
    use keepsake_types::{CapsuleDraft, CapsuleEffects, ContentPayload, UnlockPolicy};

    fn draft(title: &str, order_index: i64) -> CapsuleDraft {
        CapsuleDraft {
            title: title.to_string(),
            order_index,
            unlock_policy: UnlockPolicy::Free,
            edit_secret: None,
            content: ContentPayload::Text {
                title: title.to_string(),
                description: "d".to_string(),
                body: "b".to_string(),
            },
            effects: CapsuleEffects::default(),
        }
    }

    #[tokio::test]
    async fn test_refresh_decodes_and_orders() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(record_for_draft(&draft("second", 2), Utc::now()))
            .await
            .expect("insert");
        store
            .insert(record_for_draft(&draft("first", 1), Utc::now()))
            .await
            .expect("insert");

        let refresher = CatalogRefresher::new(store);
        refresher.refresh().await.expect("refresh");

        let snapshot = refresher.current();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].title, "first");
        assert_eq!(snapshot[1].title, "second");
    }

    #[tokio::test]
    async fn test_tentative_apply_is_reverted_by_refresh() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(record_for_draft(&draft("a", 0), Utc::now()))
            .await
            .expect("insert");

        let refresher = CatalogRefresher::new(store);
        refresher.refresh().await.expect("refresh");

        refresher.apply_tentative(|capsules| {
            if let Some(capsule) = capsules.first_mut() {
                capsule.title = "tentative".to_string();
            }
        });
        assert_eq!(refresher.current()[0].title, "tentative");

        // Compensating inverse: reload authoritative state.
        refresher.refresh().await.expect("refresh");
        assert_eq!(refresher.current()[0].title, "a");
    }

    #[tokio::test]
    async fn test_listener_refreshes_on_change_events() {
        let store = Arc::new(MemoryStore::new());
        let refresher = Arc::new(CatalogRefresher::new(Arc::clone(&store) as Arc<dyn CapsuleStore>));
        let mut snapshots = refresher.subscribe();
        let _task = refresher.listen();

        store
            .insert(record_for_draft(&draft("pushed", 0), Utc::now()))
            .await
            .expect("insert");

        snapshots.changed().await.expect("snapshot updated");
        assert_eq!(refresher.current()[0].title, "pushed");
    }
}

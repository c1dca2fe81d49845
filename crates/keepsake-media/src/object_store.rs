//! The object-store collaborator seam.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{IngestError, Result};

/// Uploads raw blobs and returns public reference URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `data` under `bucket/path` and return its public URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String>;
}

/// In-memory object store for tests and previews.
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent upload fail (for failure-path tests).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }

    /// Fetch a stored object by its full `bucket/path` key.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(key).cloned()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(IngestError::UploadFailed("store offline".to_string()));
        }
        let key = format!("{bucket}/{path}");
        self.objects.lock().await.insert(key.clone(), data);
        Ok(format!("mem://{key}"))
    }
}

//! The ingestion pipeline.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::object_store::ObjectStore;
use crate::preview::{preview_seek_point, PreviewFrameExtractor};
use crate::{IngestError, MediaKind, MediaLimits, Result};

/// A raw uploaded file, exactly as received from the author.
#[derive(Clone, Debug)]
pub struct RawFile {
    /// Original file name.
    pub name: String,
    /// Declared content type (e.g. "image/jpeg").
    pub content_type: String,
    /// File bytes.
    pub data: Vec<u8>,
}

/// A stored, referenceable media asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredMediaRef {
    /// Public URL of the uploaded blob.
    pub url: String,
    /// Public URL of the derived still preview (videos only, best-effort).
    pub preview_url: Option<String>,
}

/// The media ingestion pipeline.
///
/// All collaborators are constructor-injected; the pipeline holds no global
/// state and may be shared freely.
pub struct MediaPipeline {
    store: Arc<dyn ObjectStore>,
    extractor: Arc<dyn PreviewFrameExtractor>,
    limits: MediaLimits,
    bucket: String,
}

impl MediaPipeline {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn PreviewFrameExtractor>,
        limits: MediaLimits,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            extractor,
            limits,
            bucket: bucket.into(),
        }
    }

    /// Ingest one file: validate, upload, and (for videos) derive a preview.
    pub async fn ingest(&self, file: &RawFile, kind: MediaKind) -> Result<StoredMediaRef> {
        if !file.content_type.starts_with(kind.mime_prefix()) {
            return Err(IngestError::WrongType {
                mime: file.content_type.clone(),
                expected: kind,
            });
        }
        let size = file.data.len() as u64;
        let limit = self.limits.ceiling(kind);
        if size > limit {
            return Err(IngestError::TooLarge { size, limit });
        }

        let key = storage_key(&file.name);
        let url = self
            .store
            .upload(&self.bucket, &key, file.data.clone(), &file.content_type)
            .await?;
        tracing::debug!(key = %key, size, "media uploaded");

        let preview_url = match kind {
            MediaKind::Image => None,
            MediaKind::Video => self.derive_preview(file, &key).await,
        };

        Ok(StoredMediaRef { url, preview_url })
    }

    /// Ingest many files concurrently. Each result is independent; a failed
    /// file never aborts or rolls back the others.
    pub async fn ingest_batch(
        &self,
        files: &[(RawFile, MediaKind)],
    ) -> Vec<Result<StoredMediaRef>> {
        join_all(files.iter().map(|(file, kind)| self.ingest(file, *kind))).await
    }

    /// Best-effort preview derivation. Any failure is logged and swallowed.
    async fn derive_preview(&self, file: &RawFile, key: &str) -> Option<String> {
        let duration = self
            .extractor
            .duration(&file.data)
            .await
            .unwrap_or(Duration::from_secs(10));
        let at = preview_seek_point(duration);

        let frame = match self.extractor.extract(&file.data, at).await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "video preview extraction failed");
                return None;
            }
        };

        let preview_key = format!("{key}_preview.jpg");
        match self
            .store
            .upload(&self.bucket, &preview_key, frame.data, &frame.content_type)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "video preview upload failed");
                None
            }
        }
    }
}

/// Build a collision-resistant storage key: time prefix, random suffix,
/// sanitized original name.
fn storage_key(name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut suffix = [0u8; 4];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut suffix);
    format!("{millis}_{}_{}", hex::encode(suffix), sanitize_name(name))
}

/// Keep keys portable: alphanumerics, dot, dash, underscore; everything
/// else becomes an underscore. Long names are truncated.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.chars().take(64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::MemoryObjectStore;
    use crate::preview::{NoopExtractor, PreviewError, PreviewFrame, PreviewFrameExtractor};
    use async_trait::async_trait;

    fn pipeline_with(store: Arc<MemoryObjectStore>) -> MediaPipeline {
        MediaPipeline::new(
            store,
            Arc::new(NoopExtractor),
            MediaLimits {
                max_image_bytes: 1024,
                max_video_bytes: 4096,
            },
            "capsule-media",
        )
    }

    fn image(name: &str, bytes: usize) -> RawFile {
        RawFile {
            name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0u8; bytes],
        }
    }

    #[tokio::test]
    async fn test_wrong_category_rejected() {
        let pipeline = pipeline_with(Arc::new(MemoryObjectStore::new()));
        let file = RawFile {
            name: "notes.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: vec![0u8; 16],
        };
        let err = pipeline
            .ingest(&file, MediaKind::Image)
            .await
            .expect_err("pdf is not an image");
        assert!(matches!(err, IngestError::WrongType { .. }));
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_before_upload() {
        let store = Arc::new(MemoryObjectStore::new());
        let pipeline = pipeline_with(Arc::clone(&store));
        let err = pipeline
            .ingest(&image("big.jpg", 2048), MediaKind::Image)
            .await
            .expect_err("over ceiling");
        assert!(matches!(err, IngestError::TooLarge { size: 2048, limit: 1024 }));
        assert!(store.is_empty().await, "nothing was uploaded");
    }

    #[tokio::test]
    async fn test_batch_partial_failure_is_per_file() {
        let pipeline = pipeline_with(Arc::new(MemoryObjectStore::new()));
        let files = vec![
            (image("one.jpg", 100), MediaKind::Image),
            (image("two.jpg", 9999), MediaKind::Image),
            (image("three.jpg", 100), MediaKind::Image),
        ];
        let results = pipeline.ingest_batch(&files).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(IngestError::TooLarge { .. })));
        assert!(results[2].is_ok());
    }

    #[tokio::test]
    async fn test_video_preview_failure_is_swallowed() {
        let pipeline = pipeline_with(Arc::new(MemoryObjectStore::new()));
        let video = RawFile {
            name: "clip.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            data: vec![0u8; 2048],
        };
        let stored = pipeline
            .ingest(&video, MediaKind::Video)
            .await
            .expect("ingest succeeds without preview");
        assert!(stored.preview_url.is_none());
        assert!(stored.url.starts_with("mem://capsule-media/"));
    }

    struct OneFrameExtractor;

    #[async_trait]
    impl PreviewFrameExtractor for OneFrameExtractor {
        async fn extract(
            &self,
            _video: &[u8],
            at: Duration,
        ) -> std::result::Result<PreviewFrame, PreviewError> {
            assert_eq!(at, Duration::from_secs(1), "long clip seeks to 1s");
            Ok(PreviewFrame {
                data: vec![0xFF, 0xD8],
                content_type: "image/jpeg".to_string(),
            })
        }

        async fn duration(&self, _video: &[u8]) -> Option<Duration> {
            Some(Duration::from_secs(60))
        }
    }

    #[tokio::test]
    async fn test_video_preview_uploaded_as_secondary_asset() {
        let store = Arc::new(MemoryObjectStore::new());
        let pipeline = MediaPipeline::new(
            Arc::clone(&store) as Arc<dyn ObjectStore>,
            Arc::new(OneFrameExtractor),
            MediaLimits::default(),
            "capsule-media",
        );
        let video = RawFile {
            name: "clip.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            data: vec![0u8; 2048],
        };
        let stored = pipeline.ingest(&video, MediaKind::Video).await.expect("ingest");
        let preview_url = stored.preview_url.expect("preview present");
        assert!(preview_url.ends_with("_preview.jpg"));
        assert_eq!(store.len().await, 2, "blob plus preview");
    }

    #[tokio::test]
    async fn test_offline_store_surfaces_upload_failure() {
        let store = Arc::new(MemoryObjectStore::new());
        store.set_failing(true);
        let pipeline = pipeline_with(Arc::clone(&store));
        let err = pipeline
            .ingest(&image("one.jpg", 100), MediaKind::Image)
            .await
            .expect_err("store offline");
        assert!(matches!(err, IngestError::UploadFailed(_)));
    }

    #[test]
    fn test_sanitize_name_strips_awkward_characters() {
        assert_eq!(sanitize_name("mi foto (1).jpg"), "mi_foto__1_.jpg");
        assert_eq!(sanitize_name("safe-name_01.png"), "safe-name_01.png");
    }
}

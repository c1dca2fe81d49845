//! The video preview-frame collaborator seam.
//!
//! Capturing a still from a video is a platform capability (the host app
//! decodes the video off-screen); the pipeline owns only the seek-point
//! rule and the swallow-on-failure policy.

use std::time::Duration;

use async_trait::async_trait;

/// A captured still frame.
#[derive(Clone, Debug)]
pub struct PreviewFrame {
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// Image content type (e.g. "image/jpeg").
    pub content_type: String,
}

/// Error from a preview extraction attempt. Never fatal to an ingest.
#[derive(Debug, thiserror::Error)]
#[error("preview extraction failed: {0}")]
pub struct PreviewError(pub String);

/// Extracts a still frame from an encoded video.
#[async_trait]
pub trait PreviewFrameExtractor: Send + Sync {
    /// Capture one frame at the given seek offset.
    async fn extract(
        &self,
        video: &[u8],
        at: Duration,
    ) -> std::result::Result<PreviewFrame, PreviewError>;

    /// The video's duration, when the implementation can read it cheaply.
    async fn duration(&self, video: &[u8]) -> Option<Duration>;
}

/// Where to seek for the preview still.
///
/// `min(1s, 10% of duration)` — far enough in to skip a likely black
/// opening frame, never more than a second.
pub fn preview_seek_point(duration: Duration) -> Duration {
    Duration::from_secs(1).min(duration / 10)
}

/// An extractor that never produces a frame.
///
/// Hosts without a video decoder use this; every video simply has no
/// preview and the presenter shows its generic placeholder.
pub struct NoopExtractor;

#[async_trait]
impl PreviewFrameExtractor for NoopExtractor {
    async fn extract(
        &self,
        _video: &[u8],
        _at: Duration,
    ) -> std::result::Result<PreviewFrame, PreviewError> {
        Err(PreviewError("no extractor configured".to_string()))
    }

    async fn duration(&self, _video: &[u8]) -> Option<Duration> {
        None
    }
}

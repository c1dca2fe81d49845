//! # keepsake-media
//!
//! Media ingestion for capsule content: raw uploaded files in, stable
//! reference URLs out.
//!
//! Each file is validated against a size ceiling and MIME category, uploaded
//! to the object-store collaborator under a collision-resistant key, and —
//! for videos only — given a best-effort still preview. Preview failure
//! never fails the ingest; the presenter falls back to a placeholder.
//!
//! ## Modules
//!
//! - [`ingest`] — the pipeline and concurrent batch ingestion.
//! - [`object_store`] — the upload collaborator seam.
//! - [`preview`] — the video preview-frame collaborator seam.

pub mod ingest;
pub mod object_store;
pub mod preview;

use serde::{Deserialize, Serialize};

/// Error types for ingestion. Always per-file; a batch is never aborted.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// File exceeds the configured ceiling for its kind.
    #[error("file too large: {size} of {limit} bytes allowed")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// File is not in the expected MIME category.
    #[error("wrong file type: {mime}, expected {expected}")]
    WrongType {
        /// The file's declared content type.
        mime: String,
        /// The category the author was uploading.
        expected: MediaKind,
    },

    /// The object-store collaborator failed.
    #[error("upload failed: {0}")]
    UploadFailed(String),
}

/// Convenience result type for ingestion.
pub type Result<T> = std::result::Result<T, IngestError>;

/// The media category being ingested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// The MIME prefix a file of this kind must declare.
    pub fn mime_prefix(self) -> &'static str {
        match self {
            Self::Image => "image/",
            Self::Video => "video/",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

fn default_max_image_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_video_bytes() -> u64 {
    200 * 1024 * 1024
}

/// Configured size ceilings, supplied by the host app.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaLimits {
    /// Ceiling for image uploads, in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    /// Ceiling for video uploads, in bytes.
    #[serde(default = "default_max_video_bytes")]
    pub max_video_bytes: u64,
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
            max_video_bytes: default_max_video_bytes(),
        }
    }
}

impl MediaLimits {
    /// The ceiling for a given kind.
    pub fn ceiling(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.max_image_bytes,
            MediaKind::Video => self.max_video_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default_from_empty_config() {
        let limits: MediaLimits = serde_json::from_str("{}").expect("defaults apply");
        assert_eq!(limits.max_image_bytes, 10 * 1024 * 1024);
        assert_eq!(limits.max_video_bytes, 200 * 1024 * 1024);
    }
}

//! # keepsake-types
//!
//! Shared domain types for the Keepsake capsule core.
//!
//! A *capsule* is one gated content item in the catalog: a title, an unlock
//! policy, and a typed content payload. This crate defines the entity, the
//! closed content-payload union, the ordered block list used by the mixed
//! variant, and the flattened record shape exchanged with the persistence
//! collaborator.
//!
//! ## Modules
//!
//! - [`capsule`] — the capsule entity, unlock policies, and draft validation.
//! - [`content`] — the six-variant content payload and mixed-content blocks.
//! - [`record`] — flattened persistence records and lossless conversions.

pub mod capsule;
pub mod content;
pub mod record;

pub use capsule::{Capsule, CapsuleDraft, CapsuleEffects, UnlockPolicy};
pub use content::{BlockKind, ContentBlock, ContentKind, ContentPayload, MapRef};
pub use record::{BlockRecord, CapsuleRecord};

/// Stable capsule identifier, assigned by the store on insert.
pub type CapsuleId = String;

/// Error types for draft validation.
///
/// Validation failures block the action locally; no collaborator call is
/// made for a draft that fails here.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The capsule title is missing or blank.
    #[error("capsule title must not be empty")]
    EmptyTitle,

    /// The content title is missing or blank.
    #[error("content title must not be empty")]
    EmptyContentTitle,

    /// The content description is missing or blank.
    #[error("content description must not be empty")]
    EmptyDescription,

    /// A sequential policy references a capsule that does not exist.
    #[error("unknown dependency capsule: {0}")]
    UnknownDependency(CapsuleId),

    /// A sequential policy would close a dependency cycle.
    #[error("dependency cycle through capsule: {0}")]
    DependencyCycle(CapsuleId),
}

/// Error types for record decoding.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The `unlock_type` discriminator is not one of the known values.
    #[error("unknown unlock type: {0}")]
    UnknownUnlockType(String),

    /// The `content_type` discriminator is not one of the known values.
    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    /// A field required by the discriminated variant is absent.
    #[error("missing field `{field}` for {variant} record")]
    MissingField {
        /// The absent column.
        field: &'static str,
        /// The variant that requires it.
        variant: &'static str,
    },

    /// An unlocked capsule without an unlock timestamp (or vice versa).
    #[error("unlock state and unlocked_at timestamp disagree")]
    UnlockStateMismatch,
}

/// Convenience result type for record decoding.
pub type Result<T> = std::result::Result<T, RecordError>;

#[cfg(test)]
mod tests {
    #[test]
    #[ignore] // Run manually to generate bindings
    fn export_ts_bindings() {
        use ts_rs::TS;
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../bindings");
        std::fs::create_dir_all(&dir).expect("create bindings dir");
        crate::Capsule::export_all_to(&dir).expect("export Capsule");
        crate::ContentPayload::export_all_to(&dir).expect("export ContentPayload");
        crate::CapsuleRecord::export_all_to(&dir).expect("export CapsuleRecord");
    }
}

//! # keepsake-unlock
//!
//! The unlock engine and the authoring-side gates around capsule mutation.
//!
//! Unlock eligibility is evaluated statelessly from data already loaded;
//! the engine performs no I/O of its own to decide, only to commit. The
//! commit protocol is idempotent: an already-unlocked capsule is success,
//! not conflict, so concurrent viewers need no distributed lock.
//!
//! ## Modules
//!
//! - [`engine`] — eligibility evaluation and the unlock commit protocol.
//! - [`edit_gate`] — the shared-secret gate in front of all edits.
//! - [`graph`] — sequential-dependency validation (existence, acyclicity).
//! - [`authoring`] — capsule creation and gated edits.

pub mod authoring;
pub mod edit_gate;
pub mod engine;
pub mod graph;

use keepsake_types::CapsuleId;

/// Why an unlock attempt was rejected.
///
/// Rejections carry no state change and are immediately retryable.
#[derive(Debug, thiserror::Error)]
pub enum UnlockError {
    /// Supplied key does not match the capsule's required key.
    #[error("wrong unlock key")]
    WrongKey,

    /// The capsule's date or sequential condition is not yet met.
    #[error("capsule is not yet eligible to unlock")]
    NotYetEligible,

    /// A sequential dependency references a capsule that was not loaded.
    /// Fails closed.
    #[error("dependency capsule missing: {0}")]
    DependencyMissing(CapsuleId),

    /// No capsule with the given id.
    #[error("capsule not found: {0}")]
    NotFound(CapsuleId),

    /// The persistence collaborator failed. Not retried automatically.
    #[error("store error: {0}")]
    Store(#[from] keepsake_store::StoreError),
}

/// Convenience result type for unlock operations.
pub type Result<T> = std::result::Result<T, UnlockError>;

//! The shared-secret gate in front of all capsule mutation.
//!
//! This secret is author-chosen, case-sensitive, and unrelated to the
//! viewer-facing unlock key. A capsule with no secret refuses all edits.
//! Rejections are uniform: callers cannot tell "no secret set" apart from
//! "wrong secret".

use rand::distributions::Alphanumeric;
use rand::Rng;

use keepsake_types::Capsule;

/// Length of generated edit secrets.
pub const GENERATED_SECRET_LEN: usize = 10;

/// Uniform edit rejection. Deliberately carries no detail.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("edit not authorized")]
pub struct EditUnauthorized;

/// Check a supplied secret against the capsule's edit secret.
///
/// True iff the capsule has a non-empty secret and the supplied value is an
/// exact, case-sensitive match. Every call is independent; there is no
/// lockout or attempt counting.
pub fn authorize(capsule: &Capsule, supplied: &str) -> bool {
    match capsule.edit_secret.as_deref() {
        Some(secret) if !secret.is_empty() => secret == supplied,
        _ => false,
    }
}

/// Gate an edit, rejecting uniformly.
pub fn require(capsule: &Capsule, supplied: &str) -> Result<(), EditUnauthorized> {
    if authorize(capsule, supplied) {
        Ok(())
    } else {
        Err(EditUnauthorized)
    }
}

/// Generate a short random alphanumeric edit secret.
///
/// Used when the author did not choose one at creation; the value is
/// surfaced exactly once at that point and cannot be recovered later.
pub fn generate_edit_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect()
}

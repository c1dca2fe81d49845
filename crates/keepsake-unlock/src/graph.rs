//! Sequential-dependency validation.
//!
//! The unlock engine fails closed on anything unresolved at view time; this
//! module is the authoring-time counterpart that keeps bad edges out of the
//! store in the first place. A cycle of sequential capsules would make every
//! member permanently unlockable-never, so cycles are rejected when the edge
//! is authored.

use std::collections::HashSet;

use keepsake_types::{Capsule, UnlockPolicy, ValidationError};

/// Validate a sequential edge `capsule_id -> depends_on` against the
/// existing capsule set.
///
/// `capsule_id` is `None` when the capsule is being created (it cannot be
/// part of any existing chain yet, so only existence is checked).
pub fn validate_dependency(
    capsules: &[Capsule],
    capsule_id: Option<&str>,
    depends_on: &str,
) -> Result<(), ValidationError> {
    if !capsules.iter().any(|c| c.id == depends_on) {
        return Err(ValidationError::UnknownDependency(depends_on.to_string()));
    }

    let Some(capsule_id) = capsule_id else {
        return Ok(());
    };
    if capsule_id == depends_on {
        return Err(ValidationError::DependencyCycle(depends_on.to_string()));
    }

    // Walk the chain from the proposed target; reaching the editing capsule
    // would close a cycle. The visited set guards against cycles that
    // somehow already exist in stored data.
    let mut visited: HashSet<&str> = HashSet::new();
    let mut cursor = depends_on;
    while visited.insert(cursor) {
        let Some(next) = capsules.iter().find(|c| c.id == cursor) else {
            break;
        };
        let UnlockPolicy::Sequential { depends_on: next_dep } = &next.unlock_policy else {
            break;
        };
        if next_dep == capsule_id {
            return Err(ValidationError::DependencyCycle(capsule_id.to_string()));
        }
        cursor = next_dep;
    }

    Ok(())
}

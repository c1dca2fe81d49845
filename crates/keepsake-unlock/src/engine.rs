//! Unlock eligibility and the commit protocol.

use chrono::{DateTime, Utc};
use keepsake_store::refresh::CatalogRefresher;
use keepsake_store::{CapsuleStore, CapsuleUpdate};
use keepsake_types::{Capsule, UnlockPolicy};

use crate::{Result, UnlockError};

/// Compare a viewer-supplied key against the stored one.
///
/// Keys are human passphrases: comparison is trimmed and case-insensitive.
fn key_matches(stored: &str, supplied: &str) -> bool {
    stored.trim().eq_ignore_ascii_case(supplied.trim())
}

/// Whether a policy needs a viewer-supplied key to unlock.
pub fn requires_key(policy: &UnlockPolicy) -> bool {
    matches!(policy, UnlockPolicy::BySecretKey { .. })
}

/// Evaluate whether a capsule may currently be opened.
///
/// `BySecretKey` capsules are never eligible through this path; the key is
/// only checked inside [`attempt_unlock`]. A missing sequential dependency
/// fails closed.
pub fn can_unlock(capsule: &Capsule, all: &[Capsule], now: DateTime<Utc>) -> bool {
    if capsule.is_unlocked {
        return true;
    }
    match &capsule.unlock_policy {
        UnlockPolicy::Free => true,
        UnlockPolicy::ByDate { .. } => match capsule.unlock_policy.eligible_from() {
            Some(from) => now >= from,
            None => false,
        },
        UnlockPolicy::BySecretKey { .. } => false,
        UnlockPolicy::Sequential { depends_on } => all
            .iter()
            .find(|other| &other.id == depends_on)
            .map(|dep| dep.is_unlocked)
            .unwrap_or(false),
    }
}

/// Outcome of a successful unlock attempt.
#[derive(Clone, Debug)]
pub struct UnlockOutcome {
    /// The capsule's post-commit state.
    pub capsule: Capsule,
    /// False when the capsule was already unlocked (idempotent success).
    pub newly_unlocked: bool,
}

/// Process an unlock attempt against authoritative store state.
///
/// Re-reads the capsule before committing; a capsule already unlocked by a
/// concurrent viewer (or a double-submission) returns success without a
/// second commit, preserving the original `unlocked_at`.
pub async fn attempt_unlock(
    store: &dyn CapsuleStore,
    id: &str,
    now: DateTime<Utc>,
    supplied_key: Option<&str>,
) -> Result<UnlockOutcome> {
    let record = store
        .get(id)
        .await?
        .ok_or_else(|| UnlockError::NotFound(id.to_string()))?;
    let capsule = Capsule::try_from(record).map_err(keepsake_store::StoreError::from)?;

    if capsule.is_unlocked {
        return Ok(UnlockOutcome {
            capsule,
            newly_unlocked: false,
        });
    }

    match &capsule.unlock_policy {
        UnlockPolicy::Free => {}
        UnlockPolicy::ByDate { .. } => {
            let eligible = capsule
                .unlock_policy
                .eligible_from()
                .map(|from| now >= from)
                .unwrap_or(false);
            if !eligible {
                return Err(UnlockError::NotYetEligible);
            }
        }
        UnlockPolicy::BySecretKey { key } => {
            let supplied = supplied_key.unwrap_or("");
            if !key_matches(key, supplied) {
                return Err(UnlockError::WrongKey);
            }
        }
        UnlockPolicy::Sequential { depends_on } => {
            let dep = store.get(depends_on).await?;
            match dep {
                None => return Err(UnlockError::DependencyMissing(depends_on.clone())),
                Some(dep) if !dep.is_unlocked => return Err(UnlockError::NotYetEligible),
                Some(_) => {}
            }
        }
    }

    store.update(id, CapsuleUpdate::unlock(now)).await?;
    tracing::info!(capsule_id = id, "capsule unlocked");

    let record = store
        .get(id)
        .await?
        .ok_or_else(|| UnlockError::NotFound(id.to_string()))?;
    let capsule = Capsule::try_from(record).map_err(keepsake_store::StoreError::from)?;
    Ok(UnlockOutcome {
        capsule,
        newly_unlocked: true,
    })
}

/// Unlock with an optimistic snapshot update.
///
/// Marks the capsule unlocked in the local snapshot first (the UI may start
/// its celebration immediately), then commits. Success and failure both end
/// in a full refresh: on success it is the sequenced commit-then-refresh of
/// the within-client ordering guarantee, on failure it is the compensating
/// inverse that restores authoritative state.
pub async fn attempt_unlock_optimistic(
    store: &dyn CapsuleStore,
    refresher: &CatalogRefresher,
    id: &str,
    now: DateTime<Utc>,
    supplied_key: Option<&str>,
) -> Result<UnlockOutcome> {
    refresher.apply_tentative(|capsules| {
        if let Some(capsule) = capsules.iter_mut().find(|c| c.id == id) {
            if !capsule.is_unlocked {
                capsule.is_unlocked = true;
                capsule.unlocked_at = Some(now);
            }
        }
    });

    let outcome = attempt_unlock(store, id, now, supplied_key).await;
    if let Err(refresh_err) = refresher.refresh().await {
        tracing::warn!(error = %refresh_err, "post-unlock refresh failed");
    }
    outcome
}

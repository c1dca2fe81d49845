//! Capsule creation and gated edits.
//!
//! Creation validates locally before any store call, generates an edit
//! secret when the author chose none, and presets the unlock state for
//! free capsules. Edits pass the edit gate first and re-validate the
//! dependency graph whenever the policy changes.

use chrono::{DateTime, Utc};
use keepsake_store::{record_for_draft, CapsuleStore, CapsuleUpdate};
use keepsake_types::{
    Capsule, CapsuleDraft, CapsuleEffects, CapsuleId, ContentPayload, UnlockPolicy,
    ValidationError,
};

use crate::edit_gate::{self, EditUnauthorized};
use crate::graph::validate_dependency;

/// Error types for capsule creation.
#[derive(Debug, thiserror::Error)]
pub enum AuthorError {
    /// Local validation failed; no store call was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The persistence collaborator failed.
    #[error("store error: {0}")]
    Store(#[from] keepsake_store::StoreError),
}

/// Error types for gated edits.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// The edit gate rejected the supplied secret. Uniform by design.
    #[error(transparent)]
    Unauthorized(#[from] EditUnauthorized),

    /// No capsule with the given id.
    #[error("capsule not found: {0}")]
    NotFound(CapsuleId),

    /// Local validation failed; no mutation was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The persistence collaborator failed.
    #[error("store error: {0}")]
    Store(#[from] keepsake_store::StoreError),
}

/// Result of a successful creation.
///
/// `edit_secret` is the only place a generated secret is ever surfaced; it
/// cannot be recovered afterwards.
#[derive(Clone, Debug)]
pub struct CreatedCapsule {
    /// The store-assigned id.
    pub id: CapsuleId,
    /// The capsule's edit secret (author-chosen or generated).
    pub edit_secret: String,
    /// Whether the secret was generated rather than author-chosen.
    pub secret_generated: bool,
}

/// Create a capsule from a draft.
pub async fn author_capsule(
    store: &dyn CapsuleStore,
    existing: &[Capsule],
    mut draft: CapsuleDraft,
    now: DateTime<Utc>,
) -> Result<CreatedCapsule, AuthorError> {
    draft.validate()?;
    if let UnlockPolicy::Sequential { depends_on } = &draft.unlock_policy {
        validate_dependency(existing, None, depends_on)?;
    }

    let secret_generated = !matches!(draft.edit_secret.as_deref(), Some(s) if !s.trim().is_empty());
    if secret_generated {
        draft.edit_secret = Some(edit_gate::generate_edit_secret());
    }
    let edit_secret = draft.edit_secret.clone().unwrap_or_default();

    let id = store.insert(record_for_draft(&draft, now)).await?;
    tracing::info!(capsule_id = %id, secret_generated, "capsule created");

    Ok(CreatedCapsule {
        id,
        edit_secret,
        secret_generated,
    })
}

/// The fields an author may change through the edit gate.
///
/// Unlock state is deliberately absent: it belongs to the unlock engine.
#[derive(Clone, Debug, Default)]
pub struct CapsuleEdit {
    pub title: Option<String>,
    pub order_index: Option<i64>,
    pub unlock_policy: Option<UnlockPolicy>,
    pub content: Option<ContentPayload>,
    pub effects: Option<CapsuleEffects>,
    /// Rotate the edit secret.
    pub new_edit_secret: Option<String>,
}

/// Apply a gated edit to an existing capsule.
pub async fn apply_edit(
    store: &dyn CapsuleStore,
    existing: &[Capsule],
    id: &str,
    supplied_secret: &str,
    edit: CapsuleEdit,
) -> Result<(), EditError> {
    let record = store
        .get(id)
        .await?
        .ok_or_else(|| EditError::NotFound(id.to_string()))?;
    let capsule = Capsule::try_from(record).map_err(keepsake_store::StoreError::from)?;

    edit_gate::require(&capsule, supplied_secret)?;

    if let Some(title) = &edit.title {
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
    }
    if let Some(content) = &edit.content {
        if content.title().trim().is_empty() {
            return Err(ValidationError::EmptyContentTitle.into());
        }
        if content.description().trim().is_empty() {
            return Err(ValidationError::EmptyDescription.into());
        }
    }
    if let Some(UnlockPolicy::Sequential { depends_on }) = &edit.unlock_policy {
        validate_dependency(existing, Some(id), depends_on)?;
    }

    store
        .update(
            id,
            CapsuleUpdate {
                title: edit.title,
                order_index: edit.order_index,
                unlock_policy: edit.unlock_policy,
                unlocked_at: None,
                edit_secret: edit.new_edit_secret,
                content: edit.content,
                effects: edit.effects,
            },
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_store::memory::MemoryStore;

    fn draft(title: &str, policy: UnlockPolicy, secret: Option<&str>) -> CapsuleDraft {
        CapsuleDraft {
            title: title.to_string(),
            order_index: 0,
            unlock_policy: policy,
            edit_secret: secret.map(str::to_string),
            content: ContentPayload::Text {
                title: title.to_string(),
                description: "d".to_string(),
                body: "b".to_string(),
            },
            effects: CapsuleEffects::default(),
        }
    }

    #[tokio::test]
    async fn test_creation_generates_secret_when_absent() {
        let store = MemoryStore::new();
        let created = author_capsule(
            &store,
            &[],
            draft("a", UnlockPolicy::Free, None),
            Utc::now(),
        )
        .await
        .expect("create");

        assert!(created.secret_generated);
        assert_eq!(created.edit_secret.len(), edit_gate::GENERATED_SECRET_LEN);

        let record = store.get(&created.id).await.expect("get").expect("present");
        assert_eq!(record.edit_secret.as_deref(), Some(created.edit_secret.as_str()));
    }

    #[tokio::test]
    async fn test_creation_keeps_author_secret() {
        let store = MemoryStore::new();
        let created = author_capsule(
            &store,
            &[],
            draft("a", UnlockPolicy::Free, Some("chosen")),
            Utc::now(),
        )
        .await
        .expect("create");
        assert!(!created.secret_generated);
        assert_eq!(created.edit_secret, "chosen");
    }

    #[tokio::test]
    async fn test_creation_rejects_unknown_dependency_without_insert() {
        let store = MemoryStore::new();
        let err = author_capsule(
            &store,
            &[],
            draft(
                "b",
                UnlockPolicy::Sequential {
                    depends_on: "ghost".to_string(),
                },
                None,
            ),
            Utc::now(),
        )
        .await
        .expect_err("dangling dependency");
        assert!(matches!(
            err,
            AuthorError::Validation(ValidationError::UnknownDependency(_))
        ));
        assert_eq!(store.change_feed().sequence(), 0, "nothing was inserted");
    }

    #[tokio::test]
    async fn test_edit_requires_exact_secret() {
        let store = MemoryStore::new();
        let created = author_capsule(
            &store,
            &[],
            draft("a", UnlockPolicy::Free, Some("Secret")),
            Utc::now(),
        )
        .await
        .expect("create");

        let err = apply_edit(
            &store,
            &[],
            &created.id,
            "secret",
            CapsuleEdit {
                title: Some("renamed".to_string()),
                ..CapsuleEdit::default()
            },
        )
        .await
        .expect_err("case mismatch");
        assert!(matches!(err, EditError::Unauthorized(_)));

        apply_edit(
            &store,
            &[],
            &created.id,
            "Secret",
            CapsuleEdit {
                title: Some("renamed".to_string()),
                ..CapsuleEdit::default()
            },
        )
        .await
        .expect("exact secret accepted");

        let record = store.get(&created.id).await.expect("get").expect("present");
        assert_eq!(record.title, "renamed");
    }

    #[tokio::test]
    async fn test_policy_edit_rejects_cycles() {
        let store = MemoryStore::new();
        let a = author_capsule(
            &store,
            &[],
            draft("a", UnlockPolicy::Free, Some("s")),
            Utc::now(),
        )
        .await
        .expect("create a");

        let a_capsule = Capsule::try_from(
            store.get(&a.id).await.expect("get").expect("present"),
        )
        .expect("decode");
        let b = author_capsule(
            &store,
            std::slice::from_ref(&a_capsule),
            draft(
                "b",
                UnlockPolicy::Sequential {
                    depends_on: a.id.clone(),
                },
                Some("s"),
            ),
            Utc::now(),
        )
        .await
        .expect("create b");

        // Reload both and try to point a at b.
        let all: Vec<Capsule> = store
            .load_all()
            .await
            .expect("load")
            .into_iter()
            .map(|r| Capsule::try_from(r).expect("decode"))
            .collect();

        let err = apply_edit(
            &store,
            &all,
            &a.id,
            "s",
            CapsuleEdit {
                unlock_policy: Some(UnlockPolicy::Sequential {
                    depends_on: b.id.clone(),
                }),
                ..CapsuleEdit::default()
            },
        )
        .await
        .expect_err("cycle rejected");
        assert!(matches!(
            err,
            EditError::Validation(ValidationError::DependencyCycle(_))
        ));
    }
}

//! Catalog card view models.

use chrono::{DateTime, Utc};
use keepsake_types::{Capsule, CapsuleId, ContentKind, UnlockPolicy};
use keepsake_unlock::engine::{can_unlock, requires_key};
use serde::{Deserialize, Serialize};

/// What the catalog tile offers the viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CapsuleAffordance {
    /// Nothing the viewer can do yet.
    Locked,
    /// An unlock attempt could succeed now (or a key prompt applies).
    Unlockable,
    /// Already open; tapping shows the content.
    Unlocked,
}

/// One catalog tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct CapsuleCard {
    pub id: CapsuleId,
    pub title: String,
    pub kind: ContentKind,
    pub order_index: i64,
    pub affordance: CapsuleAffordance,
    /// Show the key prompt instead of a plain unlock button.
    pub prompts_for_key: bool,
    pub celebrate_on_unlock: bool,
}

/// Affordance for one capsule against the loaded snapshot.
///
/// Key-gated capsules are always `Unlockable` while locked: eligibility
/// there is knowing the key, which only an attempt can prove.
pub fn affordance(capsule: &Capsule, all: &[Capsule], now: DateTime<Utc>) -> CapsuleAffordance {
    if capsule.is_unlocked {
        return CapsuleAffordance::Unlocked;
    }
    if requires_key(&capsule.unlock_policy) || can_unlock(capsule, all, now) {
        return CapsuleAffordance::Unlockable;
    }
    CapsuleAffordance::Locked
}

/// Build catalog cards for a loaded snapshot, preserving its order.
pub fn build_cards(snapshot: &[Capsule], now: DateTime<Utc>) -> Vec<CapsuleCard> {
    snapshot
        .iter()
        .map(|capsule| CapsuleCard {
            id: capsule.id.clone(),
            title: capsule.title.clone(),
            kind: capsule.content.kind(),
            order_index: capsule.order_index,
            affordance: affordance(capsule, snapshot, now),
            prompts_for_key: !capsule.is_unlocked
                && matches!(capsule.unlock_policy, UnlockPolicy::BySecretKey { .. }),
            celebrate_on_unlock: capsule.effects.celebrate_on_unlock,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use keepsake_types::{CapsuleEffects, ContentPayload};

    fn capsule(id: &str, order: i64, policy: UnlockPolicy, unlocked: bool) -> Capsule {
        Capsule {
            id: id.to_string(),
            title: format!("capsule {id}"),
            order_index: order,
            unlock_policy: policy,
            is_unlocked: unlocked,
            unlocked_at: unlocked.then(Utc::now),
            edit_secret: None,
            content: ContentPayload::Text {
                title: format!("capsule {id}"),
                description: "d".to_string(),
                body: "b".to_string(),
            },
            effects: CapsuleEffects::default(),
        }
    }

    fn at(date: &str) -> DateTime<Utc> {
        let date: NaiveDate = date.parse().expect("date");
        date.and_hms_opt(12, 0, 0).expect("time").and_utc()
    }

    #[test]
    fn test_affordances_across_policies() {
        let snapshot = vec![
            capsule("free", 0, UnlockPolicy::Free, false),
            capsule(
                "future",
                1,
                UnlockPolicy::ByDate {
                    date: "2030-01-01".parse().expect("date"),
                    time: None,
                },
                false,
            ),
            capsule(
                "keyed",
                2,
                UnlockPolicy::BySecretKey {
                    key: "AMOR".to_string(),
                },
                false,
            ),
            capsule(
                "chained",
                3,
                UnlockPolicy::Sequential {
                    depends_on: "free".to_string(),
                },
                false,
            ),
            capsule("open", 4, UnlockPolicy::Free, true),
        ];

        let cards = build_cards(&snapshot, at("2025-06-01"));
        let by_id = |id: &str| {
            cards
                .iter()
                .find(|c| c.id == id)
                .unwrap_or_else(|| panic!("card {id}"))
        };

        assert_eq!(by_id("free").affordance, CapsuleAffordance::Unlockable);
        assert_eq!(by_id("future").affordance, CapsuleAffordance::Locked);
        assert_eq!(by_id("keyed").affordance, CapsuleAffordance::Unlockable);
        assert!(by_id("keyed").prompts_for_key);
        assert_eq!(by_id("chained").affordance, CapsuleAffordance::Locked);
        assert_eq!(by_id("open").affordance, CapsuleAffordance::Unlocked);
        assert!(!by_id("open").prompts_for_key);
    }

    #[test]
    fn test_chained_becomes_unlockable_when_dependency_opens() {
        let snapshot = vec![
            capsule("first", 0, UnlockPolicy::Free, true),
            capsule(
                "second",
                1,
                UnlockPolicy::Sequential {
                    depends_on: "first".to_string(),
                },
                false,
            ),
        ];

        let cards = build_cards(&snapshot, at("2025-06-01"));
        assert_eq!(cards[1].affordance, CapsuleAffordance::Unlockable);
    }

    #[test]
    fn test_cards_preserve_snapshot_order() {
        let snapshot = vec![
            capsule("b", 2, UnlockPolicy::Free, false),
            capsule("a", 1, UnlockPolicy::Free, false),
        ];
        let cards = build_cards(&snapshot, at("2025-06-01"));
        assert_eq!(cards[0].id, "b");
        assert_eq!(cards[1].id, "a");
    }
}

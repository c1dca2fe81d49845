//! Integration test: the catalog read path.
//!
//! Exercises the snapshot pipeline end to end:
//! 1. Author a small set of capsules
//! 2. Start a refresher listening on the store's change feed
//! 3. Verify inserts push a fresh snapshot without polling
//! 4. Filter the snapshot and build catalog cards from it
//! 5. Render an unlocked capsule from the same snapshot

use std::sync::Arc;

use chrono::Utc;
use keepsake_catalog::{CatalogFilter, StatusFilter};
use keepsake_presenter::geocode::StaticGeocoder;
use keepsake_presenter::{build_cards, present, CachedGeocoder, CapsuleAffordance, RenderedBody};
use keepsake_store::memory::MemoryStore;
use keepsake_store::refresh::CatalogRefresher;
use keepsake_store::CapsuleStore;
use keepsake_types::{CapsuleDraft, CapsuleEffects, ContentKind, ContentPayload, UnlockPolicy};
use keepsake_unlock::authoring::author_capsule;

fn draft(title: &str, order_index: i64, policy: UnlockPolicy, content: ContentPayload) -> CapsuleDraft {
    CapsuleDraft {
        title: title.to_string(),
        order_index,
        unlock_policy: policy,
        edit_secret: None,
        content,
        effects: CapsuleEffects::default(),
    }
}

fn text(title: &str, description: &str) -> ContentPayload {
    ContentPayload::Text {
        title: title.to_string(),
        description: description.to_string(),
        body: "…".to_string(),
    }
}

#[tokio::test]
async fn test_change_feed_drives_snapshot_filter_and_cards() {
    keepsake_integration_tests::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();

    let refresher = Arc::new(CatalogRefresher::new(
        Arc::clone(&store) as Arc<dyn CapsuleStore>
    ));
    let mut snapshots = refresher.subscribe();
    let _listener = refresher.listen();

    // Step 1: three capsules, one locked behind a future date.
    author_capsule(
        &*store,
        &[],
        draft(
            "Picnic plan",
            0,
            UnlockPolicy::Free,
            ContentPayload::Event {
                title: "Picnic plan".to_string(),
                description: "lunch by the lake".to_string(),
                body: "Bring the blue blanket.".to_string(),
                event_date: None,
                place_name: Some("Lake Park".to_string()),
                map_ref: None,
                activities: vec!["swim".to_string(), "nap".to_string()],
            },
        ),
        now,
    )
    .await
    .expect("create event");

    author_capsule(
        &*store,
        &[],
        draft("Old letter", 1, UnlockPolicy::Free, text("Old letter", "from 2019")),
        now,
    )
    .await
    .expect("create letter");

    author_capsule(
        &*store,
        &[],
        draft(
            "Sealed until 2030",
            2,
            UnlockPolicy::ByDate {
                date: "2030-01-01".parse().expect("date"),
                time: None,
            },
            text("Sealed until 2030", "patience"),
        ),
        now,
    )
    .await
    .expect("create sealed");

    // Step 2/3: pushes arrive without any poll.
    while refresher.current().len() < 3 {
        snapshots.changed().await.expect("snapshot push");
    }
    let snapshot = refresher.current();
    assert_eq!(snapshot.len(), 3);

    // Step 4: conjunctive filter, then cards.
    let filter = CatalogFilter {
        query: "lake".to_string(),
        kind: Some(ContentKind::Event),
        status: StatusFilter::Unlocked,
    };
    let matched = filter.apply(&snapshot);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].title, "Picnic plan");

    let cards = build_cards(&snapshot, now);
    assert_eq!(cards[0].affordance, CapsuleAffordance::Unlocked);
    assert_eq!(cards[2].affordance, CapsuleAffordance::Locked);

    // Step 5: render the matched capsule; the place name degrades to text
    // because the geocoder knows nothing.
    let geocoder = CachedGeocoder::new(Box::new(StaticGeocoder::new(vec![])));
    let rendered = present(&matched[0], &geocoder).await;
    match rendered.content {
        RenderedBody::Event { activities, .. } => {
            assert_eq!(activities.len(), 2);
        }
        other => panic!("expected event body, got {other:?}"),
    }
}

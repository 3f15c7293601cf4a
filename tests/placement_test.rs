use binarycomp::{
    init_db, CompEngine, CompPlan, EngineError, Leg, MemberId, MemberProfile, Repository,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn setup_engine(plan: CompPlan) -> (Arc<Repository>, Arc<CompEngine>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let engine = Arc::new(CompEngine::new(repo.clone(), plan));
    (repo, engine, temp_dir)
}

fn profile(tag: &str) -> MemberProfile {
    MemberProfile {
        full_name: format!("Member {}", tag),
        email: format!("{}@example.com", tag),
        phone: format!("555-{}", tag),
        national_id: None,
    }
}

#[tokio::test]
async fn test_register_into_waiting_room() {
    let (repo, engine, _temp) = setup_engine(CompPlan::standard()).await;

    let root = engine.create_root(profile("root")).await.unwrap();
    assert_eq!(root.member_no.as_str(), "900000001");
    assert!(root.is_placed());

    let member = engine.register(profile("a"), root.id).await.unwrap();
    assert_eq!(member.member_no.as_str(), "900000002");
    assert_eq!(member.sponsor_id, Some(root.id));
    assert_eq!(member.placement_parent_id, None);
    assert_eq!(member.leg, None);
    assert!(!member.is_placed());

    assert_eq!(repo.pending_referral_count(root.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_register_duplicate_contact() {
    let (_repo, engine, _temp) = setup_engine(CompPlan::standard()).await;

    let root = engine.create_root(profile("root")).await.unwrap();
    engine.register(profile("a"), root.id).await.unwrap();

    let mut dup = profile("b");
    dup.email = "a@example.com".to_string();
    match engine.register(dup, root.id).await {
        Err(EngineError::DuplicateContact(field)) => assert_eq!(field, "email"),
        other => panic!("expected DuplicateContact, got {:?}", other.map(|m| m.id)),
    }
}

#[tokio::test]
async fn test_register_unknown_sponsor() {
    let (_repo, engine, _temp) = setup_engine(CompPlan::standard()).await;

    match engine.register(profile("a"), MemberId::new(999)).await {
        Err(EngineError::SponsorNotFound(id)) => assert_eq!(id, MemberId::new(999)),
        other => panic!("expected SponsorNotFound, got {:?}", other.map(|m| m.id)),
    }
}

#[tokio::test]
async fn test_open_slot_descends_same_leg_only() {
    let (_repo, engine, _temp) = setup_engine(CompPlan::standard()).await;

    let root = engine.create_root(profile("root")).await.unwrap();
    let a = engine.register(profile("a"), root.id).await.unwrap();
    let b = engine.register(profile("b"), root.id).await.unwrap();

    // Empty leg: the anchor itself is the open slot.
    assert_eq!(
        engine.find_open_slot(root.id, Leg::Left).await.unwrap(),
        root.id
    );

    engine.place(a.id, root.id, Leg::Left).await.unwrap();
    engine.place(b.id, a.id, Leg::Left).await.unwrap();

    // The LEFT chain ends at b, even though a's RIGHT slot is empty:
    // the resolver never crosses into the sibling leg.
    assert_eq!(
        engine.find_open_slot(root.id, Leg::Left).await.unwrap(),
        b.id
    );
    assert_eq!(
        engine.find_open_slot(root.id, Leg::Right).await.unwrap(),
        root.id
    );
}

#[tokio::test]
async fn test_open_slot_unknown_anchor() {
    let (_repo, engine, _temp) = setup_engine(CompPlan::standard()).await;

    match engine.find_open_slot(MemberId::new(404), Leg::Left).await {
        Err(EngineError::AnchorNotFound(id)) => assert_eq!(id, MemberId::new(404)),
        other => panic!("expected AnchorNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_place_errors() {
    let (_repo, engine, _temp) = setup_engine(CompPlan::standard()).await;

    let root = engine.create_root(profile("root")).await.unwrap();
    let a = engine.register(profile("a"), root.id).await.unwrap();
    let b = engine.register(profile("b"), root.id).await.unwrap();

    engine.place(a.id, root.id, Leg::Left).await.unwrap();

    match engine.place(a.id, root.id, Leg::Right).await {
        Err(EngineError::AlreadyPlaced(id)) => assert_eq!(id, a.id),
        other => panic!("expected AlreadyPlaced, got {:?}", other),
    }

    match engine.place(b.id, root.id, Leg::Left).await {
        Err(EngineError::SlotOccupied(anchor, leg)) => {
            assert_eq!(anchor, root.id);
            assert_eq!(leg, Leg::Left);
        }
        other => panic!("expected SlotOccupied, got {:?}", other),
    }

    match engine.place(b.id, MemberId::new(404), Leg::Left).await {
        Err(EngineError::AnchorNotFound(id)) => assert_eq!(id, MemberId::new(404)),
        other => panic!("expected AnchorNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slot_occupied_leaves_tree_unchanged() {
    let (repo, engine, _temp) = setup_engine(CompPlan::standard()).await;

    let root = engine.create_root(profile("root")).await.unwrap();
    let a = engine.register(profile("a"), root.id).await.unwrap();
    let b = engine.register(profile("b"), root.id).await.unwrap();

    engine.place(a.id, root.id, Leg::Left).await.unwrap();
    let root_before = repo.get_member(root.id).await.unwrap().unwrap();

    let result = engine.place(b.id, root.id, Leg::Left).await;
    assert!(matches!(result, Err(EngineError::SlotOccupied(_, _))));

    // The occupant and the anchor's volume state are untouched.
    let a_after = repo.get_member(a.id).await.unwrap().unwrap();
    assert_eq!(a_after.placement_parent_id, Some(root.id));
    assert_eq!(a_after.leg, Some(Leg::Left));
    let root_after = repo.get_member(root.id).await.unwrap().unwrap();
    assert_eq!(root_after.leg_volume_left, root_before.leg_volume_left);

    // The loser stays in the waiting room and can still be placed elsewhere.
    let b_after = repo.get_member(b.id).await.unwrap().unwrap();
    assert_eq!(b_after.placement_parent_id, None);
    engine.place(b.id, root.id, Leg::Right).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_place_resolves_to_one_winner() {
    let (_repo, engine, _temp) = setup_engine(CompPlan::standard()).await;

    let root = engine.create_root(profile("root")).await.unwrap();
    let a = engine.register(profile("a"), root.id).await.unwrap();
    let b = engine.register(profile("b"), root.id).await.unwrap();

    let (ra, rb) = tokio::join!(
        engine.place(a.id, root.id, Leg::Left),
        engine.place(b.id, root.id, Leg::Left),
    );

    let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one placement must win");

    let loser = if ra.is_ok() { rb } else { ra };
    assert!(
        matches!(loser, Err(EngineError::SlotOccupied(_, _))),
        "the loser must see SlotOccupied"
    );
}

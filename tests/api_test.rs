use axum::http::StatusCode;
use binarycomp::api::{self, AppState};
use binarycomp::config::CompPlan;
use binarycomp::db::init_db;
use binarycomp::domain::{Leg, Member, MemberProfile};
use binarycomp::engine::CompEngine;
use binarycomp::Repository;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

async fn setup_test_app() -> (axum::Router, Arc<CompEngine>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();

    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let engine = Arc::new(CompEngine::new(repo.clone(), CompPlan::standard()));
    let state = AppState::new(repo, engine.clone());

    (api::create_router(state), engine, temp_dir)
}

fn profile(tag: &str) -> MemberProfile {
    MemberProfile {
        full_name: format!("Member {}", tag),
        email: format!("{}@example.com", tag),
        phone: format!("555-{}", tag),
        national_id: None,
    }
}

async fn seed_root(engine: &CompEngine) -> Member {
    engine.create_root(profile("root")).await.unwrap()
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_and_ready() {
    let (app, _engine, _temp) = setup_test_app().await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = get(&app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_register_endpoint() {
    let (app, engine, _temp) = setup_test_app().await;
    let root = seed_root(&engine).await;

    let (status, body) = post_json(
        &app,
        "/v1/members",
        serde_json::json!({
            "fullName": "Member a",
            "email": "a@example.com",
            "phone": "555-a",
            "sponsorId": root.id.as_i64(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["memberNo"], "900000002");

    // Same email again.
    let (status, body) = post_json(
        &app,
        "/v1/members",
        serde_json::json!({
            "fullName": "Member b",
            "email": "a@example.com",
            "phone": "555-b",
            "sponsorId": root.id.as_i64(),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    // Unknown sponsor.
    let (status, _body) = post_json(
        &app,
        "/v1/members",
        serde_json::json!({
            "fullName": "Member c",
            "email": "c@example.com",
            "phone": "555-c",
            "sponsorId": 999,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_placement_endpoint() {
    let (app, engine, _temp) = setup_test_app().await;
    let root = seed_root(&engine).await;
    let a = engine.register(profile("a"), root.id).await.unwrap();
    let b = engine.register(profile("b"), root.id).await.unwrap();

    let uri = format!("/v1/members/{}/placement", a.id.as_i64());
    let (status, body) = post_json(
        &app,
        &uri,
        serde_json::json!({"anchorId": root.id.as_i64(), "leg": "LEFT"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["placed"], true);

    // Invalid leg string.
    let uri = format!("/v1/members/{}/placement", b.id.as_i64());
    let (status, _body) = post_json(
        &app,
        &uri,
        serde_json::json!({"anchorId": root.id.as_i64(), "leg": "MIDDLE"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Slot already taken.
    let (status, _body) = post_json(
        &app,
        &uri,
        serde_json::json!({"anchorId": root.id.as_i64(), "leg": "LEFT"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_open_slot_endpoint() {
    let (app, engine, _temp) = setup_test_app().await;
    let root = seed_root(&engine).await;
    let a = engine.register(profile("a"), root.id).await.unwrap();
    engine.place(a.id, root.id, Leg::Left).await.unwrap();

    let uri = format!("/v1/members/{}/open-slot?leg=LEFT", root.id.as_i64());
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["anchorId"], a.id.as_i64());
    assert_eq!(body["leg"], "LEFT");

    let uri = format!("/v1/members/{}/open-slot?leg=UP", root.id.as_i64());
    let (status, _body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_endpoint() {
    let (app, engine, _temp) = setup_test_app().await;
    let root = seed_root(&engine).await;
    let a = engine.register(profile("a"), root.id).await.unwrap();
    engine.register(profile("b"), root.id).await.unwrap();
    engine.place(a.id, root.id, Leg::Left).await.unwrap();

    let uri = format!("/v1/members/{}/summary", root.id.as_i64());
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["memberNo"], "900000001");
    assert_eq!(body["rank"], "Distributor");
    assert_eq!(body["legVolumeLeft"], 100);
    assert_eq!(body["legVolumeRight"], 0);
    assert_eq!(body["cashBalance"], 20.0);
    assert_eq!(body["teamSizeLeft"], 1);
    assert_eq!(body["teamSizeRight"], 0);
    assert_eq!(body["directReferralCount"], 2);
    assert_eq!(body["pendingReferralCount"], 1);

    let (status, _body) = get(&app, "/v1/members/999/summary").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pending_endpoint() {
    let (app, engine, _temp) = setup_test_app().await;
    let root = seed_root(&engine).await;
    let a = engine.register(profile("a"), root.id).await.unwrap();
    let b = engine.register(profile("b"), root.id).await.unwrap();
    engine.place(a.id, root.id, Leg::Left).await.unwrap();

    let uri = format!("/v1/members/{}/pending", root.id.as_i64());
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["memberId"], b.id.as_i64());
    assert_eq!(list[0]["fullName"], "Member b");
}

#[tokio::test]
async fn test_volume_event_endpoint() {
    let (app, engine, _temp) = setup_test_app().await;
    let root = seed_root(&engine).await;
    let a = engine.register(profile("a"), root.id).await.unwrap();
    engine.place(a.id, root.id, Leg::Left).await.unwrap();

    let (status, body) = post_json(
        &app,
        "/v1/volume-events",
        serde_json::json!({
            "memberId": a.id.as_i64(),
            "volumeUnits": 50,
            "monetaryValue": 25.0,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], true);

    let uri = format!("/v1/members/{}/summary", root.id.as_i64());
    let (_status, body) = get(&app, &uri).await;
    assert_eq!(body["legVolumeLeft"], 150);

    let (status, _body) = post_json(
        &app,
        "/v1/volume-events",
        serde_json::json!({"memberId": a.id.as_i64(), "volumeUnits": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _body) = post_json(
        &app,
        "/v1/volume-events",
        serde_json::json!({"memberId": 999, "volumeUnits": 10}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_statement_endpoint_newest_first() {
    let (app, engine, _temp) = setup_test_app().await;
    let root = seed_root(&engine).await;
    let a = engine.register(profile("a"), root.id).await.unwrap();
    let b = engine.register(profile("b"), root.id).await.unwrap();
    engine.place(a.id, root.id, Leg::Left).await.unwrap();
    engine.place(b.id, root.id, Leg::Right).await.unwrap();

    // Placing b settled matching between the two referral bonuses, so the
    // root's history is referral, matching, referral in write order.
    let uri = format!("/v1/members/{}/statement", root.id.as_i64());
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entryCount"], 3);

    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries[0]["category"], "REFERRAL");
    assert_eq!(entries[0]["amount"], 20.0);
    assert_eq!(entries[1]["category"], "MATCHING");
    assert_eq!(entries[1]["amount"], 13.0);
    assert_eq!(entries[2]["category"], "REFERRAL");

    let (status, _body) = get(&app, "/v1/members/999/statement").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tree_endpoint_renders_vacant_slots() {
    let (app, engine, _temp) = setup_test_app().await;
    let root = seed_root(&engine).await;
    let a = engine.register(profile("a"), root.id).await.unwrap();
    engine.place(a.id, root.id, Leg::Left).await.unwrap();

    let uri = format!("/v1/members/{}/tree?depth=2", root.id.as_i64());
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vacant"], false);
    assert_eq!(body["memberNo"], "900000001");

    let children = body["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["leg"], "LEFT");
    assert_eq!(children[0]["memberId"], a.id.as_i64());
    assert_eq!(children[1]["leg"], "RIGHT");
    assert_eq!(children[1]["vacant"], true);
    assert!(children[1].get("memberId").is_none());

    // a's own child positions render as vacant slots.
    let grandchildren = children[0]["children"].as_array().unwrap();
    assert_eq!(grandchildren.len(), 2);
    assert!(grandchildren.iter().all(|n| n["vacant"] == true));

    let (status, _body) = get(&app, "/v1/members/999/tree").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

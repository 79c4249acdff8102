//! Control API integration tests: real HTTP against a served router.

use std::time::Duration;

use header_forge::control::{setup_control_router, ControlState};
use header_forge::intercept::InterceptLayer;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};

mod common;

use common::{debug_profile, start_engine, TestRig};

const API_KEY: &str = "test-key";

async fn serve(rig: &TestRig, port: u16) -> String {
    let state = ControlState {
        engine: rig.engine.clone(),
        api_key: API_KEY.to_string(),
    };
    let app = setup_control_router(state);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    // Give the listener task a beat to start accepting.
    tokio::time::sleep(Duration::from_millis(20)).await;
    format!("http://127.0.0.1:{}", port)
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn bearer() -> String {
    format!("Bearer {}", API_KEY)
}

#[tokio::test]
async fn test_missing_or_wrong_key_is_unauthorized() {
    let rig = start_engine().await;
    let base = serve(&rig, 28780).await;

    let res = client()
        .get(format!("{}/control/status", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = client()
        .get(format!("{}/control/status", base))
        .header(AUTHORIZATION, "Bearer wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn test_update_rules_and_status() {
    let rig = start_engine().await;
    let base = serve(&rig, 28781).await;

    let mut profile = debug_profile();
    profile.add_target("*.example.com").unwrap();

    let res = client()
        .post(format!("{}/control/rules", base))
        .header(AUTHORIZATION, bearer())
        .json(&json!({ "enabled": true, "profile": profile }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);

    assert_eq!(rig.layer.active_rules().len(), 1);

    let res = client()
        .get(format!("{}/control/status", base))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["enabled"], true);
    assert_eq!(status["active_profile"], "Default");
    assert_eq!(status["active_headers"], 1);
    assert_eq!(status["targets"], 1);
    assert_eq!(status["installed_rules"], 1);
}

#[tokio::test]
async fn test_count_and_reset_endpoints() {
    let rig = start_engine().await;
    let base = serve(&rig, 28782).await;

    let res = client()
        .get(format!("{}/control/count", base))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 0);

    let res = client()
        .post(format!("{}/control/count/reset", base))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_timer_endpoints() {
    let rig = start_engine().await;
    let base = serve(&rig, 28783).await;

    let res = client()
        .post(format!("{}/control/timer", base))
        .header(AUTHORIZATION, bearer())
        .json(&json!({ "minutes": 15 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client()
        .get(format!("{}/control/status", base))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    let status: Value = res.json().await.unwrap();
    assert!(status["timer_deadline_ms"].is_u64());

    let res = client()
        .delete(format!("{}/control/timer", base))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client()
        .get(format!("{}/control/status", base))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    let status: Value = res.json().await.unwrap();
    assert!(status["timer_deadline_ms"].is_null());
}

#[tokio::test]
async fn test_export_import_endpoints() {
    let rig = start_engine().await;
    let base = serve(&rig, 28784).await;

    let mut profile = debug_profile();
    profile.add_exclude("ads.example.com").unwrap();
    client()
        .post(format!("{}/control/rules", base))
        .header(AUTHORIZATION, bearer())
        .json(&json!({ "enabled": true, "profile": profile }))
        .send()
        .await
        .unwrap();

    let res = client()
        .get(format!("{}/control/export", base))
        .header(AUTHORIZATION, bearer())
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let bundle = body["bundle"].as_str().unwrap().to_string();
    assert!(bundle.contains("activeProfile"));

    // Import into a second engine through its own API.
    let fresh = start_engine().await;
    let fresh_base = serve(&fresh, 28785).await;

    let res = client()
        .post(format!("{}/control/import", fresh_base))
        .header(AUTHORIZATION, bearer())
        .body(bundle)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    use header_forge::store::ProfileStorage;
    let saved = fresh.storage.load().unwrap();
    assert_eq!(saved.store.active().excludes, ["ads.example.com"]);
}

#[tokio::test]
async fn test_malformed_import_is_bad_request() {
    let rig = start_engine().await;
    let base = serve(&rig, 28786).await;

    let res = client()
        .post(format!("{}/control/import", base))
        .header(AUTHORIZATION, bearer())
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
}

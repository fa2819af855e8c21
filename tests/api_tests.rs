//! API integration tests
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use room_allocation::api::{build_router, AppState};
use room_allocation::config::{Settings, DEFAULT_PASSWORD};
use room_allocation::core::Workspace;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn app_with(dir: &TempDir, auth_enabled: bool) -> Router {
    let mut settings = Settings::default().with_data_file(dir.path().join("rooms.xlsx"));
    settings.auth_enabled = auth_enabled;
    let state = AppState::open(settings).unwrap();
    build_router(Arc::new(state))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "password": DEFAULT_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

// ═══════════════════════════════════════════════════════════════════════════
// PUBLIC ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_is_public() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, true);
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert!(body["request_id"].as_str().is_some());
}

#[tokio::test]
async fn test_version_reports_auth_mode() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    let (_, body) = call(&app, "GET", "/version", None, None).await;
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["data"]["auth_enabled"], false);
}

// ═══════════════════════════════════════════════════════════════════════════
// AUTHENTICATION
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_protected_routes_need_a_session() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, true);
    let (status, body) = call(&app, "GET", "/api/v1/occupancy", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(&app, "GET", "/api/v1/occupancy", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, true);
    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/login",
        None,
        Some(json!({ "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains("Incorrect password"));
}

#[tokio::test]
async fn test_login_session_logout() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, true);
    let token = login(&app).await;

    let (status, body) = call(&app, "GET", "/api/v1/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["warning"], false);

    let (_, body) = call(&app, "POST", "/api/v1/logout", Some(&token), None).await;
    assert_eq!(body["data"]["logged_out"], true);

    let (status, _) = call(&app, "GET", "/api/v1/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ═══════════════════════════════════════════════════════════════════════════
// ROOMS AND OCCUPANTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_room_and_occupant_workflow() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, true);
    let token = login(&app).await;
    let t = Some(token.as_str());

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/rooms",
        t,
        Some(json!({ "building": "HN", "office": "3.17", "capacity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "vacant");
    assert_eq!(body["data"]["floor"], "3");

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/rooms",
        t,
        Some(json!({ "building": "HN", "office": "3.17" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/occupants",
        t,
        Some(json!({
            "name": "Smith, Ann",
            "status": "Current",
            "position": "Lecturer",
            "building": "HN",
            "office": "3.17"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "GET", "/api/v1/rooms?building=HN", t, None).await;
    let rooms = body["data"].as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["occupants"], 1);
    assert_eq!(rooms[0]["percentage"], 50.0);
    assert_eq!(rooms[0]["status"], "medium");

    let (_, body) = call(&app, "GET", "/api/v1/rooms/suggest", t, None).await;
    assert_eq!(body["data"][0]["label"], "HN - 3.17 [1/2 occupants (50%)]");

    let (_, body) = call(&app, "GET", "/api/v1/occupants?search=lect", t, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/rooms/HN/3.17/capacity",
        t,
        Some(json!({ "capacity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "full");
}

#[tokio::test]
async fn test_unknown_occupant_is_not_found() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    let (status, body) = call(
        &app,
        "DELETE",
        "/api/v1/occupants/current/Nobody",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_bad_availability_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    let (status, _) = call(&app, "GET", "/api/v1/rooms?availability=roomy", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_storage_conversion_unassigns_current_occupants() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    call(
        &app,
        "POST",
        "/api/v1/occupants",
        None,
        Some(json!({ "name": "Lee, Bo", "status": "Current", "building": "HN", "office": "1.01" })),
    )
    .await;

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/rooms/HN/1.01",
        None,
        Some(json!({ "building": "HN", "office": "1.01", "capacity": 0, "kind": "storage" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["unassigned"], json!(["Lee, Bo"]));

    let (_, body) = call(&app, "GET", "/api/v1/occupants?unassigned=true", None, None).await;
    assert_eq!(body["data"][0]["name"], "Lee, Bo");

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/occupants/assign",
        None,
        Some(json!({ "name": "Lee, Bo", "building": "HN", "office": "1.01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_office_only_patch_cannot_reach_storage() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    call(
        &app,
        "POST",
        "/api/v1/rooms",
        None,
        Some(json!({ "building": "HN", "office": "0.01", "capacity": 0, "kind": "storage" })),
    )
    .await;
    call(
        &app,
        "POST",
        "/api/v1/occupants",
        None,
        Some(json!({ "name": "Lee", "status": "Current", "building": "HN", "office": "3.17" })),
    )
    .await;

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/occupants/current/Lee",
        None,
        Some(json!({ "office": "0.01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("storage room"));

    let (_, body) = call(&app, "GET", "/api/v1/occupants?building=HN", None, None).await;
    assert_eq!(body["data"][0]["office"], "3.17");

    let (status, body) = call(
        &app,
        "PUT",
        "/api/v1/occupants/current/Lee",
        None,
        Some(json!({ "office": "3.18" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["office"], "3.18");
}

#[tokio::test]
async fn test_move_out_of_past_into_storage_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    call(
        &app,
        "POST",
        "/api/v1/occupants",
        None,
        Some(json!({ "name": "Kim", "status": "Past", "building": "HN", "office": "0.01" })),
    )
    .await;
    call(
        &app,
        "POST",
        "/api/v1/rooms",
        None,
        Some(json!({ "building": "HN", "office": "0.01", "capacity": 0, "kind": "storage" })),
    )
    .await;

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/occupants/move",
        None,
        Some(json!({ "name": "Kim", "from": "Past", "to": "Current" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, "GET", "/api/v1/occupants?status=past", None, None).await;
    assert_eq!(body["data"][0]["name"], "Kim");
}

#[tokio::test]
async fn test_room_listing_defaults_to_rooms_with_space() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    for (office, capacity) in [("1.01", 1), ("2.01", 2)] {
        call(
            &app,
            "POST",
            "/api/v1/rooms",
            None,
            Some(json!({ "building": "HN", "office": office, "capacity": capacity })),
        )
        .await;
    }
    call(
        &app,
        "POST",
        "/api/v1/occupants",
        None,
        Some(json!({ "name": "Lee", "status": "Current", "building": "HN", "office": "1.01" })),
    )
    .await;

    let (_, body) = call(&app, "GET", "/api/v1/rooms", None, None).await;
    let rooms = body["data"].as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["office"], "2.01");

    let (_, body) = call(&app, "GET", "/api/v1/rooms?availability=all", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = call(&app, "GET", "/api/v1/rooms?availability=full", None, None).await;
    assert_eq!(body["data"][0]["office"], "1.01");
}

// ═══════════════════════════════════════════════════════════════════════════
// SAVE, BACKUP, EXPORT
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_save_accepts_missing_body() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    let (status, body) = call(&app, "POST", "/api/v1/save", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["request_id"].as_str().is_some());
    assert!(dir.path().join("rooms.xlsx").exists());
}

#[tokio::test]
async fn test_capacity_survives_server_restart() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    call(
        &app,
        "POST",
        "/api/v1/occupants",
        None,
        Some(json!({ "name": "Lee", "status": "Current", "building": "HN", "office": "3.17" })),
    )
    .await;
    let (status, _) = call(
        &app,
        "PUT",
        "/api/v1/rooms/HN/3.17/capacity",
        None,
        Some(json!({ "capacity": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    call(&app, "POST", "/api/v1/save", None, None).await;

    let restarted = app_with(&dir, false);
    let (_, body) = call(&restarted, "GET", "/api/v1/rooms?availability=all", None, None).await;
    assert_eq!(body["data"][0]["max_capacity"], 6);
    assert_eq!(body["data"][0]["remaining"], 5);
}

#[tokio::test]
async fn test_save_refuses_unassigned_current_occupants() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    call(
        &app,
        "POST",
        "/api/v1/occupants",
        None,
        Some(json!({ "name": "Nguyen, Tam", "status": "Current" })),
    )
    .await;

    let (status, body) = call(&app, "POST", "/api/v1/save", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("missing Building or Office"));

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/save",
        None,
        Some(json!({ "ignore_warnings": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(dir.path().join("rooms.xlsx").exists());
}

#[tokio::test]
async fn test_save_then_reload_keeps_edits() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    call(
        &app,
        "POST",
        "/api/v1/rooms",
        None,
        Some(json!({ "building": "CSIT", "office": "2.10", "capacity": 3 })),
    )
    .await;
    call(
        &app,
        "POST",
        "/api/v1/occupants",
        None,
        Some(json!({ "name": "Park, Jin", "status": "Upcoming", "planned_arrival": "2025-02-01" })),
    )
    .await;

    let (status, body) = call(&app, "POST", "/api/v1/save", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["backup"], Value::Null);

    let (_, body) = call(&app, "POST", "/api/v1/reload", None, None).await;
    assert_eq!(body["data"]["upcoming"], 1);
    assert_eq!(body["data"]["current"], 0);

    // the empty room survives as a placeholder, not as an occupant
    let settings = Settings::default().with_data_file(dir.path().join("rooms.xlsx"));
    let workspace = Workspace::open(&settings).unwrap();
    let occupancy = workspace.occupancy();
    assert_eq!(occupancy.len(), 1);
    assert_eq!(occupancy[0].max_capacity, 3);
}

#[tokio::test]
async fn test_backup_listing_after_second_save() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    call(&app, "POST", "/api/v1/save", None, Some(json!({}))).await;
    let (_, body) = call(&app, "POST", "/api/v1/save", None, Some(json!({}))).await;
    assert!(body["data"]["backup"].as_str().is_some());

    let (_, body) = call(&app, "GET", "/api/v1/backups", None, None).await;
    let backups = body["data"].as_array().unwrap();
    assert_eq!(backups.len(), 1);
    assert!(backups[0]["name"]
        .as_str()
        .unwrap()
        .starts_with("rooms_"));
}

#[tokio::test]
async fn test_export_endpoints() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    call(
        &app,
        "POST",
        "/api/v1/occupants",
        None,
        Some(json!({ "name": "Smith, Ann", "status": "Current", "building": "HN", "office": "3.17" })),
    )
    .await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/export/csv",
        None,
        Some(json!({ "data": ["current", "rooms"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["files"].as_array().unwrap().len(), 2);

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/export/csv",
        None,
        Some(json!({ "data": ["buildings"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let file = body["data"]["files"][0].as_str().unwrap();
    assert!(file.ends_with("building_summary.csv"));
    assert!(std::fs::read_to_string(file).unwrap().contains("HN,1,1,2,1,50"));

    let (status, body) = call(&app, "POST", "/api/v1/export/csv", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["files"].as_array().unwrap().len(), 3);

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/export/excel",
        None,
        Some(json!({ "report": "building", "building": "HN" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let file = body["data"]["files"][0].as_str().unwrap();
    assert!(file.contains("HN_Report_"));

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/export/excel",
        None,
        Some(json!({ "report": "building", "building": "Nowhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reports() {
    let dir = TempDir::new().unwrap();
    let app = app_with(&dir, false);
    call(
        &app,
        "POST",
        "/api/v1/occupants",
        None,
        Some(json!({ "name": "Smith, Ann", "status": "Current", "building": "HN", "office": "3.17" })),
    )
    .await;

    let (_, body) = call(&app, "GET", "/api/v1/reports/summary", None, None).await;
    assert_eq!(body["data"]["current_occupants"], 1);
    assert_eq!(body["data"]["total_rooms"], 1);

    let (_, body) = call(&app, "GET", "/api/v1/reports/buildings", None, None).await;
    assert_eq!(body["data"][0]["summary"]["building"], "HN");

    let (status, _) = call(&app, "GET", "/api/v1/reports/utilization", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, "GET", "/api/v1/reports/occupants", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["status_distribution"],
        json!([
            { "name": "Current", "count": 1 },
            { "name": "Upcoming", "count": 0 },
            { "name": "Past", "count": 0 }
        ])
    );

    let (_, body) = call(&app, "GET", "/api/v1/occupancy", None, None).await;
    assert_eq!(body["data"]["buildings"][0]["room_count"], 1);
}

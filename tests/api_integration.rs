//! HTTP API tests driving the router in-process

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{template_store, RecordingChannels};
use push_dispatch_service::config::Settings;
use push_dispatch_service::domain::schedule::MemoryScheduleStore;
use push_dispatch_service::domain::storage::StoreBackends;
use push_dispatch_service::server::{create_app, AppState};

fn app_with(settings: Settings) -> (Arc<RecordingChannels>, Router) {
    let channels = RecordingChannels::new(1);
    let stores = StoreBackends {
        templates: template_store(),
        schedules: Arc::new(MemoryScheduleStore::new()),
    };
    let state = AppState::from_parts(settings, stores, channels.clone());
    (channels, create_app(state))
}

fn app() -> (Arc<RecordingChannels>, Router) {
    app_with(Settings::default())
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_send_notification() {
    let (channels, app) = app();

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/notifications/send",
        Some(json!({
            "template_type": "order_new",
            "variables": { "order_id": "123" },
            "audience_roles": ["business_admin"],
            "tenant_id": "T1"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["deliveries"][0]["channel"], "roles");
    assert_eq!(body["deliveries"][0]["targets"], json!(["business_admin"]));
    assert_eq!(channels.calls().len(), 1);
}

#[tokio::test]
async fn test_send_error_mapping() {
    let (_, app) = app();

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/notifications/send",
        Some(json!({ "template_type": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1/notifications/send",
        Some(json!({ "template_type": "maintenance_notice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, "POST", "/api/v1/notifications/send", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_all_channels_failed_is_bad_gateway() {
    let channels = RecordingChannels::failing();
    let stores = StoreBackends {
        templates: template_store(),
        schedules: Arc::new(MemoryScheduleStore::new()),
    };
    let app = create_app(AppState::from_parts(Settings::default(), stores, channels));

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1/notifications/send",
        Some(json!({ "template_type": "order_new", "audience_user_ids": "u1" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "DELIVERY_FAILED");
}

#[tokio::test]
async fn test_schedule_lifecycle() {
    let (channels, app) = app();

    let (status, created) = call(
        &app,
        "POST",
        "/api/v1/schedules",
        Some(json!({
            "template_type": "order_new",
            "due_at": "2020-01-01T00:00:00Z",
            "audience": ["admin"],
            "payload_overrides": { "variables": { "order_id": "9" } }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, listed) = call(&app, "GET", "/api/v1/schedules?status=pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);

    let (status, report) = call(&app, "POST", "/api/v1/notifications/process-due", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["processed"], 1);
    assert_eq!(report["results"][0]["schedule_id"], id.as_str());
    assert_eq!(channels.calls().len(), 1);

    let (_, fetched) = call(&app, "GET", &format!("/api/v1/schedules/{}", id), None).await;
    assert_eq!(fetched["status"], "sent");

    let (status, body) = call(&app, "POST", &format!("/api/v1/schedules/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_schedule_cancel_and_requeue() {
    let (_, app) = app();

    let (_, created) = call(
        &app,
        "POST",
        "/api/v1/schedules",
        Some(json!({ "template_type": "welcome_user", "due_at": "2099-01-01T00:00:00Z" })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, cancelled) =
        call(&app, "POST", &format!("/api/v1/schedules/{}/cancel", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, requeued) = call(
        &app,
        "POST",
        &format!("/api/v1/schedules/{}/requeue", id),
        Some(json!({ "due_at": "2099-06-01T00:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(requeued["status"], "pending");
    assert_eq!(requeued["due_at"], "2099-06-01T00:00:00Z");

    let (status, _) = call(
        &app,
        "GET",
        "/api/v1/schedules/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_process_due_dry_run() {
    let (channels, app) = app();

    call(
        &app,
        "POST",
        "/api/v1/schedules",
        Some(json!({ "template_type": "order_new", "due_at": "2020-01-01T00:00:00Z" })),
    )
    .await;

    let (status, report) = call(
        &app,
        "POST",
        "/api/v1/notifications/process-due",
        Some(json!({ "dry_run": true })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["results"][0]["deliveries"][0]["channel"], "dry_run");
    assert!(channels.calls().is_empty());
}

#[tokio::test]
async fn test_templates_and_logs() {
    let (_, app) = app();

    let (status, list) = call(&app, "GET", "/api/v1/templates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list["total"].as_u64().unwrap() >= 15);

    let (status, template) = call(&app, "GET", "/api/v1/templates/order_new", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(template["type"], "order_new");

    let (status, _) = call(&app, "GET", "/api/v1/templates/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    call(
        &app,
        "POST",
        "/api/v1/notifications/send",
        Some(json!({ "type": "welcome_user", "user_ids": "u1", "tenant_id": "T1" })),
    )
    .await;

    let (_, stats) = call(&app, "GET", "/api/v1/notifications/logs/stats?tenant_id=T1", None).await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["sent"], 1);

    let (_, recent) = call(&app, "GET", "/api/v1/notifications/logs?limit=5", None).await;
    assert_eq!(recent["total"], 1);
    assert_eq!(recent["logs"][0]["source"], "http");
}

#[tokio::test]
async fn test_api_key_guard() {
    let mut settings = Settings::default();
    settings.api.key = Some("secret".into());
    let (_, app) = app_with(settings);

    let (status, _) = call(&app, "GET", "/api/v1/templates", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/v1/templates")
        .header("X-API-Key", "secret")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Health stays open
    let (status, health) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["delivery"]["backend"], "recording");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (_, app) = app();

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

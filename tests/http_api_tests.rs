//! End-to-end tests of the HTTP API

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use event_admission::api::create_router;
use event_admission::{AppConfig, AppState, InMemoryStore, ManualClock};

fn app() -> Router {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2030, 1, 10, 12, 0, 0).unwrap()));
    let state = AppState::new(Arc::new(InMemoryStore::new()), clock, AppConfig::default());
    create_router(Arc::new(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_from(app, method, uri, body, None).await
}

async fn send_from(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    forwarded_for: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ip) = forwarded_for {
        builder = builder.header("x-forwarded-for", ip);
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

fn new_event(limit: u32) -> Value {
    json!({
        "title": "Climbing",
        "annotation": "Bouldering for beginners",
        "description": "Shoes can be rented on site",
        "category": 5,
        "location": {"lat": 55.0, "lon": 37.0},
        "eventDate": "2030-01-20 18:00:00",
        "participantLimit": limit
    })
}

/// Create and publish an event of user 1; returns its id
async fn published_event(app: &Router, limit: u32) -> u64 {
    let (status, created) = send(app, "POST", "/users/1/events", Some(new_event(limit))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["state"], "PENDING");
    let id = created["id"].as_u64().unwrap();

    let (status, published) = send(
        app,
        "PATCH",
        &format!("/admin/events/{}", id),
        Some(json!({"stateAction": "PUBLISH_EVENT"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["state"], "PUBLISHED");
    assert_eq!(published["publishedOn"], "2030-01-10 12:00:00");
    id
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_moderation_flow() {
    let app = app();
    let event_id = published_event(&app, 2).await;

    let mut request_ids = Vec::new();
    for user in 2..=4 {
        let (status, request) = send(
            &app,
            "POST",
            &format!("/users/{}/requests?eventId={}", user, event_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(request["status"], "PENDING");
        request_ids.push(request["id"].as_u64().unwrap());
    }

    let (status, pending) = send(&app, "GET", &format!("/users/1/events/{}/requests", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 3);

    let (status, result) = send(
        &app,
        "PATCH",
        &format!("/users/1/events/{}/requests", event_id),
        Some(json!({"requestIds": request_ids, "status": "CONFIRMED"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["confirmedRequests"].as_array().unwrap().len(), 2);
    assert_eq!(result["rejectedRequests"][0]["id"], request_ids[2]);
    assert_eq!(result["rejectedRequests"][0]["status"], "REJECTED");

    let (status, event) = send(&app, "GET", &format!("/users/1/events/{}", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["confirmedRequests"], 2);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/users/1/events/{}/requests", event_id),
        Some(json!({"requestIds": [request_ids[2]], "status": "CONFIRMED"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_join_and_cancel() {
    let app = app();
    let event_id = published_event(&app, 0).await;

    let (status, body) = send(&app, "POST", &format!("/users/1/requests?eventId={}", event_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, request) = send(&app, "POST", &format!("/users/7/requests?eventId={}", event_id), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "CONFIRMED");
    let request_id = request["id"].as_u64().unwrap();

    let (status, _) = send(&app, "PATCH", &format!("/users/8/requests/{}/cancel", request_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, canceled) = send(&app, "PATCH", &format!("/users/7/requests/{}/cancel", request_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(canceled["status"], "CANCELED");

    let (status, body) = send(&app, "PATCH", &format!("/users/7/requests/{}/cancel", request_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, mine) = send(&app, "GET", "/users/7/requests", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_public_reads_are_counted() {
    let app = app();
    let event_id = published_event(&app, 0).await;
    let uri = format!("/events/{}", event_id);

    for ip in ["198.51.100.1", "198.51.100.1", "198.51.100.2"] {
        let (status, _) = send_from(&app, "GET", &uri, None, Some(ip)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, event) = send_from(&app, "GET", &uri, None, Some("198.51.100.1")).await;
    assert_eq!(event["views"], 2);

    let (status, listing) = send(&app, "GET", "/events?text=boulder&sort=VIEWS", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing[0]["id"], event_id);
    assert_eq!(listing[0]["views"], 2);

    let stats_uri = format!(
        "/stats?start=2030-01-01%2000:00:00&end=2030-02-01%2000:00:00&uris={}",
        uri
    );
    let (status, stats) = send(&app, "GET", &stats_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats[0]["uri"], uri);
    assert_eq!(stats[0]["hits"], 4);

    let (status, unique) = send(&app, "GET", &format!("{}&unique=true", stats_uri), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unique[0]["hits"], 2);
}

#[tokio::test]
async fn test_hidden_and_invalid_requests() {
    let app = app();

    let (status, body) = send(&app, "GET", "/events/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        "GET",
        "/stats?start=2030-02-01%2000:00:00&end=2030-01-01%2000:00:00",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut too_soon = new_event(0);
    too_soon["eventDate"] = json!("2030-01-10 13:00:00");
    let (status, body) = send(&app, "POST", "/users/1/events", Some(too_soon)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = send(&app, "GET", "/admin/events?states=SOMETIMES", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_hit_endpoint_and_admin_search() {
    let app = app();
    let event_id = published_event(&app, 3).await;

    let (status, hit) = send(
        &app,
        "POST",
        "/hit",
        Some(json!({
            "app": "ewm-main-service",
            "uri": "/events",
            "ip": "192.0.2.5",
            "timestamp": "2030-01-10 11:00:00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(hit["uri"], "/events");

    let (status, found) = send(&app, "GET", "/admin/events?users=1&states=PUBLISHED&from=0&size=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["id"], event_id);

    let (status, none) = send(&app, "GET", "/admin/events?states=CANCELED", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(none.as_array().unwrap().is_empty());
}

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use fleet_api::create_app;
use fleet_core::config::models::ApiConfig;
use fleet_core::models::{EventStatus, ReportStatus};
use fleet_core::traits::StopMissionResponse;
use fleet_core::RobotControlError;
use fleet_domain::{
    BookingService, EventStatusGateway, RobotService, StatusTransitionGateway,
};
use fleet_infrastructure::MetricsCollector;
use fleet_testing_utils::{EventBuilder, InMemoryStore, MockRobotControlClient, RobotBuilder};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: InMemoryStore,
    robot_client: MockRobotControlClient,
}

impl TestApp {
    fn new() -> Self {
        let store = InMemoryStore::new();
        store.insert_robot(
            RobotBuilder::new()
                .with_id(1)
                .with_address("10.0.0.7", 3000)
                .build(),
        );
        let robot_client = MockRobotControlClient::new();

        let repo = Arc::new(store.clone());
        let gateway = Arc::new(EventStatusGateway::new(repo.clone()));
        let booking_service = Arc::new(BookingService::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            gateway,
            Duration::hours(1),
        ));
        let robot_service = Arc::new(RobotService::new(repo, Arc::new(robot_client.clone())));

        let router = create_app(
            booking_service,
            robot_service,
            Arc::new(MetricsCollector::new().unwrap()),
            &ApiConfig::default(),
        );

        Self {
            router,
            store,
            robot_client,
        }
    }

    async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let (status, body) = app.request("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_event_with_default_duration() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            "POST",
            "/api/events",
            Some(json!({
                "robot_id": 1,
                "mission_id": "inspect-pump",
                "start_time": "2030-05-01T10:00:00+02:00",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["estimated_duration_ms"], 3_600_000);

    let event = &app.store.events()[0];
    assert_eq!(
        event.start_time,
        Utc.with_ymd_and_hms(2030, 5, 1, 8, 0, 0).unwrap()
    );
    assert_eq!(
        event.end_time,
        Utc.with_ymd_and_hms(2030, 5, 1, 9, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_create_overlapping_event_returns_conflicting_ids() {
    let app = TestApp::new();
    let existing = app.store.insert_event(
        EventBuilder::new()
            .with_robot_id(1)
            .with_start_time(Utc.with_ymd_and_hms(2030, 5, 1, 10, 0, 0).unwrap())
            .build(),
    );

    let (status, body) = app
        .request(
            "POST",
            "/api/events",
            Some(json!({
                "robot_id": 1,
                "mission_id": "second",
                "start_time": "2030-05-01T10:30:00Z",
                "estimated_duration_seconds": 600,
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "EVENT_CONFLICT");
    assert_eq!(
        body["error"]["details"]["conflicting_event_ids"],
        json!([existing.id])
    );
    assert_eq!(app.store.events().len(), 1);
}

#[tokio::test]
async fn test_create_event_rejects_timestamp_without_offset() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            "POST",
            "/api/events",
            Some(json!({
                "robot_id": 1,
                "mission_id": "m",
                "start_time": "2030-05-01T10:00:00",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "VALIDATION_ERROR");
    assert!(app.store.events().is_empty());
}

#[tokio::test]
async fn test_create_event_rejects_non_positive_duration() {
    let app = TestApp::new();

    let (status, _) = app
        .request(
            "POST",
            "/api/events",
            Some(json!({
                "robot_id": 1,
                "mission_id": "m",
                "start_time": "2030-05-01T10:00:00Z",
                "estimated_duration_seconds": 0,
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_event_rejects_duration_past_time_range() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            "POST",
            "/api/events",
            Some(json!({
                "robot_id": 1,
                "mission_id": "m",
                "start_time": "2024-05-01T08:00:00Z",
                "estimated_duration_seconds": 100_000_000_000_000i64,
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(app.store.events().is_empty());
}

#[tokio::test]
async fn test_create_event_for_unknown_robot() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            "POST",
            "/api/events",
            Some(json!({
                "robot_id": 99,
                "mission_id": "m",
                "start_time": "2030-05-01T10:00:00Z",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "ROBOT_NOT_FOUND");
}

#[tokio::test]
async fn test_get_event_and_missing_event() {
    let app = TestApp::new();
    let event = app
        .store
        .insert_event(EventBuilder::new().with_mission_id("lookup").build());

    let (status, body) = app
        .request("GET", &format!("/api/events/{}", event.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mission_id"], "lookup");

    let (status, _) = app.request("GET", "/api/events/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_pending_event() {
    let app = TestApp::new();
    let event = app.store.insert_event(EventBuilder::new().build());

    let (status, _) = app
        .request("DELETE", &format!("/api/events/{}", event.id), None)
        .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.store.event(event.id).is_none());
}

#[tokio::test]
async fn test_cancel_started_event_is_conflict() {
    let app = TestApp::new();
    let event = app
        .store
        .insert_event(EventBuilder::new().with_status(EventStatus::Started).build());

    let (status, body) = app
        .request("DELETE", &format!("/api/events/{}", event.id), None)
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "STALE_STATE");
    assert!(app.store.event(event.id).is_some());
}

#[tokio::test]
async fn test_complete_started_event_updates_report() {
    let app = TestApp::new();
    let pending = app.store.insert_event(EventBuilder::new().build());
    let gateway = EventStatusGateway::new(Arc::new(app.store.clone()));
    let (_, report) = gateway
        .start_with_report(&pending, "isar-42")
        .await
        .unwrap();

    let (status, body) = app
        .request(
            "POST",
            &format!("/api/events/{}/complete", pending.id),
            Some(json!({ "outcome": "completed" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["event"]["status"], "COMPLETED");
    assert_eq!(body["data"]["report"]["id"], report.id);
    assert_eq!(app.store.reports()[0].status, ReportStatus::Completed);

    let (status, body) = app
        .request("GET", &format!("/api/reports/{}", report.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["external_mission_id"], "isar-42");
}

#[tokio::test]
async fn test_complete_pending_event_is_conflict() {
    let app = TestApp::new();
    let event = app.store.insert_event(EventBuilder::new().build());

    let (status, _) = app
        .request(
            "POST",
            &format!("/api/events/{}/complete", event.id),
            Some(json!({ "outcome": "failed" })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.store.event(event.id).unwrap().status, EventStatus::Pending);
}

#[tokio::test]
async fn test_disable_robot_blocks_booking() {
    let app = TestApp::new();

    let (status, body) = app
        .request("PUT", "/api/robots/1/enabled", Some(json!({ "enabled": false })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enabled"], false);

    let (status, _) = app
        .request(
            "POST",
            "/api/events",
            Some(json!({
                "robot_id": 1,
                "mission_id": "m",
                "start_time": "2030-05-01T10:00:00Z",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stop_robot_forwards_to_robot() {
    let app = TestApp::new();
    app.robot_client.stop_with(Ok(StopMissionResponse {
        message: "Mission stopping".to_string(),
        stopped: true,
    }));

    let (status, body) = app.request("POST", "/api/robots/1/stop", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Mission stopping");
    assert_eq!(body["data"]["stopped"], true);
    assert_eq!(
        app.robot_client.stop_calls(),
        vec![("10.0.0.7".to_string(), 3000)]
    );
}

#[tokio::test]
async fn test_stop_robot_unreachable_is_bad_gateway() {
    let app = TestApp::new();
    app.robot_client
        .stop_with(Err(RobotControlError::Connection("refused".to_string())));

    let (status, body) = app.request("POST", "/api/robots/1/stop", None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "ROBOT_CONTROL_ERROR");
}

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use fleet_core::models::EventStatus;
use fleet_domain::{
    BookingRequest, BookingService, EventStatusGateway, StatusTransitionGateway,
};
use fleet_testing_utils::{InMemoryStore, RobotBuilder};

fn build_service(store: &InMemoryStore) -> Arc<BookingService> {
    let repo = Arc::new(store.clone());
    Arc::new(BookingService::new(
        repo.clone(),
        repo.clone(),
        repo.clone(),
        Arc::new(EventStatusGateway::new(repo)),
        Duration::hours(1),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overlapping_bookings_admit_only_one() {
    let store = InMemoryStore::new();
    store.insert_robot(RobotBuilder::new().build());
    let service = build_service(&store);
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .book_event(BookingRequest {
                    robot_id: 1,
                    mission_id: format!("mission-{i}"),
                    start_time: base + Duration::minutes(i),
                    estimated_duration: None,
                })
                .await
        }));
    }

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(e) => {
                assert!(e.is_conflict(), "unexpected error: {e}");
                rejected += 1;
            }
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(rejected, 15);
    assert_eq!(store.events().len(), 1);
}

#[tokio::test]
async fn test_persisted_events_never_overlap() {
    let store = InMemoryStore::new();
    store.insert_robot(RobotBuilder::new().build());
    store.insert_robot(RobotBuilder::new().with_id(2).build());
    let service = build_service(&store);
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

    // 步长 37 分钟、时长 50 分钟，一半左右的请求会冲突
    for i in 0..40 {
        let _ = service
            .book_event(BookingRequest {
                robot_id: 1 + (i % 2),
                mission_id: format!("mission-{i}"),
                start_time: base + Duration::minutes(37 * i),
                estimated_duration: Some(Duration::minutes(50)),
            })
            .await;
    }

    let events = store.events();
    assert!(!events.is_empty());
    for a in &events {
        assert_eq!(a.end_time, a.start_time + a.estimated_duration);
        for b in &events {
            if a.id != b.id && a.robot_id == b.robot_id {
                assert!(
                    !a.window().overlaps(&b.window()),
                    "events {} and {} overlap",
                    a.id,
                    b.id
                );
            }
        }
    }
}

#[tokio::test]
async fn test_cancel_races_with_start() {
    let store = InMemoryStore::new();
    store.insert_robot(RobotBuilder::new().build());
    let service = build_service(&store);
    let gateway = EventStatusGateway::new(Arc::new(store.clone()));

    let event = service
        .book_event(BookingRequest {
            robot_id: 1,
            mission_id: "inspect".to_string(),
            start_time: Utc::now() - Duration::seconds(1),
            estimated_duration: None,
        })
        .await
        .unwrap();

    gateway.start_with_report(&event, "isar-1").await.unwrap();
    let err = service.cancel_event(event.id).await.unwrap_err();

    assert!(err.is_stale());
    assert_eq!(store.event(event.id).unwrap().status, EventStatus::Started);
    assert_eq!(store.report_count(), 1);
}

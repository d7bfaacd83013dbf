//! # 预约服务
//!
//! 事件的创建、查询、取消与完成回报。预约时先做冲突检测，
//! 存储层在插入时还会再检查一次，两次检测之间的并发预约也无法同时成功。

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use fleet_core::models::{Event, MissionOutcome, NewEvent, Report};
use fleet_core::traits::{EventRepository, ReportRepository, RobotRepository};
use fleet_core::{SchedulerError, SchedulerResult};
use tracing::{info, instrument, warn};

use crate::conflict_checker::ConflictChecker;
use crate::status_gateway::StatusTransitionGateway;

/// 预约请求
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub robot_id: i64,
    pub mission_id: String,
    pub start_time: DateTime<Utc>,
    /// 未指定时使用配置的默认时长
    pub estimated_duration: Option<Duration>,
}

pub struct BookingService {
    robot_repo: Arc<dyn RobotRepository>,
    event_repo: Arc<dyn EventRepository>,
    report_repo: Arc<dyn ReportRepository>,
    conflict_checker: ConflictChecker,
    gateway: Arc<dyn StatusTransitionGateway>,
    default_duration: Duration,
}

impl BookingService {
    pub fn new(
        robot_repo: Arc<dyn RobotRepository>,
        event_repo: Arc<dyn EventRepository>,
        report_repo: Arc<dyn ReportRepository>,
        gateway: Arc<dyn StatusTransitionGateway>,
        default_duration: Duration,
    ) -> Self {
        Self {
            robot_repo,
            conflict_checker: ConflictChecker::new(event_repo.clone()),
            event_repo,
            report_repo,
            gateway,
            default_duration,
        }
    }

    #[instrument(skip(self), fields(robot_id = request.robot_id, mission_id = %request.mission_id))]
    pub async fn book_event(&self, request: BookingRequest) -> SchedulerResult<Event> {
        let robot = self
            .robot_repo
            .get_by_id(request.robot_id)
            .await?
            .ok_or_else(|| SchedulerError::robot_not_found(request.robot_id))?;

        if !robot.enabled {
            return Err(SchedulerError::validation_error(format!(
                "机器人 {} 已停用，不能预约",
                robot.id
            )));
        }

        let new_event = NewEvent::new(
            request.robot_id,
            request.mission_id,
            request.start_time,
            request.estimated_duration.unwrap_or(self.default_duration),
        )?;

        self.conflict_checker
            .ensure_available(new_event.robot_id, &new_event.window())
            .await?;

        let event = self.event_repo.create(&new_event).await?;

        info!(
            event.id = event.id,
            robot.id = event.robot_id,
            start_time = %event.start_time,
            end_time = %event.end_time,
            "事件预约成功"
        );
        Ok(event)
    }

    pub async fn get_event(&self, id: i64) -> SchedulerResult<Event> {
        self.event_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| SchedulerError::event_not_found(id))
    }

    pub async fn get_report(&self, id: i64) -> SchedulerResult<Report> {
        self.report_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| SchedulerError::report_not_found(id))
    }

    /// 取消预约，只允许取消尚未下发的事件
    pub async fn cancel_event(&self, id: i64) -> SchedulerResult<()> {
        self.gateway.cancel(id).await?;
        info!(event.id = id, "事件已取消");
        Ok(())
    }

    /// 回报已启动事件的最终结果，同步更新对应的执行报告
    #[instrument(skip(self))]
    pub async fn complete_event(
        &self,
        id: i64,
        outcome: MissionOutcome,
    ) -> SchedulerResult<(Event, Option<Report>)> {
        let (event, report) = self.gateway.complete(id, outcome).await?;
        if report.is_none() {
            warn!(event.id = id, "已启动的事件没有关联的执行报告");
        }

        info!(event.id = id, status = %event.status, "事件执行结果已记录");
        Ok((event, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_gateway::EventStatusGateway;
    use chrono::TimeZone;
    use fleet_core::models::{EventStatus, ReportStatus};
    use fleet_testing_utils::{EventBuilder, InMemoryStore, RobotBuilder};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    fn service_with(store: &InMemoryStore) -> BookingService {
        let repo = Arc::new(store.clone());
        BookingService::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            Arc::new(EventStatusGateway::new(repo)),
            Duration::hours(1),
        )
    }

    fn request(start_time: DateTime<Utc>, duration: Option<Duration>) -> BookingRequest {
        BookingRequest {
            robot_id: 1,
            mission_id: "inspect-pump".to_string(),
            start_time,
            estimated_duration: duration,
        }
    }

    #[tokio::test]
    async fn test_book_event_uses_default_duration() {
        let store = InMemoryStore::new();
        store.insert_robot(RobotBuilder::new().build());
        let service = service_with(&store);

        let event = service.book_event(request(at(8, 0), None)).await.unwrap();

        assert_eq!(event.status, EventStatus::Pending);
        assert_eq!(event.estimated_duration, Duration::hours(1));
        assert_eq!(event.end_time, at(9, 0));
    }

    #[tokio::test]
    async fn test_end_time_is_derived_from_duration() {
        let store = InMemoryStore::new();
        store.insert_robot(RobotBuilder::new().build());
        let service = service_with(&store);

        let event = service
            .book_event(request(at(8, 0), Some(Duration::minutes(25))))
            .await
            .unwrap();

        assert_eq!(event.end_time, event.start_time + event.estimated_duration);
        assert_eq!(event.end_time, at(8, 25));
    }

    #[tokio::test]
    async fn test_overlapping_booking_is_rejected_with_ids() {
        let store = InMemoryStore::new();
        store.insert_robot(RobotBuilder::new().build());
        let service = service_with(&store);

        let first = service.book_event(request(at(8, 0), None)).await.unwrap();
        let err = service
            .book_event(request(at(8, 30), None))
            .await
            .unwrap_err();

        match err {
            SchedulerError::EventConflict {
                conflicting_ids, ..
            } => assert_eq!(conflicting_ids, vec![first.id]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.events().len(), 1);
    }

    #[tokio::test]
    async fn test_back_to_back_booking_succeeds() {
        let store = InMemoryStore::new();
        store.insert_robot(RobotBuilder::new().build());
        let service = service_with(&store);

        service.book_event(request(at(8, 0), None)).await.unwrap();
        let second = service.book_event(request(at(9, 0), None)).await;

        assert!(second.is_ok());
        assert_eq!(store.events().len(), 2);
    }

    #[tokio::test]
    async fn test_third_booking_overlapping_either_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_robot(RobotBuilder::new().build());
        let service = service_with(&store);

        let a = service.book_event(request(at(8, 0), None)).await.unwrap();
        let b = service.book_event(request(at(9, 0), None)).await.unwrap();

        let err = service
            .book_event(request(at(8, 45), Some(Duration::minutes(30))))
            .await
            .unwrap_err();

        match err {
            SchedulerError::EventConflict {
                conflicting_ids, ..
            } => assert_eq!(conflicting_ids, vec![a.id, b.id]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_booking_unknown_robot() {
        let store = InMemoryStore::new();
        let service = service_with(&store);

        let err = service.book_event(request(at(8, 0), None)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::RobotNotFound { id: 1 }));
    }

    #[tokio::test]
    async fn test_booking_disabled_robot() {
        let store = InMemoryStore::new();
        store.insert_robot(RobotBuilder::new().disabled().build());
        let service = service_with(&store);

        let err = service.book_event(request(at(8, 0), None)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_booking_rejects_non_positive_duration() {
        let store = InMemoryStore::new();
        store.insert_robot(RobotBuilder::new().build());
        let service = service_with(&store);

        let err = service
            .book_event(request(at(8, 0), Some(Duration::zero())))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_booking_rejects_duration_past_time_range() {
        let store = InMemoryStore::new();
        store.insert_robot(RobotBuilder::new().build());
        let service = service_with(&store);

        let huge = Duration::try_seconds(100_000_000_000_000).unwrap();
        let err = service
            .book_event(request(at(8, 0), Some(huge)))
            .await
            .unwrap_err();

        assert!(matches!(err, SchedulerError::ValidationError(_)));
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_get_event_and_report_not_found() {
        let store = InMemoryStore::new();
        let service = service_with(&store);

        assert!(service.get_event(5).await.unwrap_err().is_not_found());
        assert!(service.get_report(5).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_cancel_pending_event() {
        let store = InMemoryStore::new();
        store.insert_robot(RobotBuilder::new().build());
        let service = service_with(&store);
        let event = service.book_event(request(at(8, 0), None)).await.unwrap();

        service.cancel_event(event.id).await.unwrap();

        assert!(service.get_event(event.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_complete_started_event_updates_report() {
        let store = InMemoryStore::new();
        let event = store.insert_event(EventBuilder::new().build());
        let repo: Arc<InMemoryStore> = Arc::new(store.clone());
        let gateway = EventStatusGateway::new(repo);
        gateway.start_with_report(&event, "isar-1").await.unwrap();
        let service = service_with(&store);

        let (completed, report) = service
            .complete_event(event.id, MissionOutcome::Completed)
            .await
            .unwrap();

        assert_eq!(completed.status, EventStatus::Completed);
        assert_eq!(report.unwrap().status, ReportStatus::Completed);
    }

    #[tokio::test]
    async fn test_complete_pending_event_is_stale() {
        let store = InMemoryStore::new();
        let event = store.insert_event(EventBuilder::new().build());
        let service = service_with(&store);

        let err = service
            .complete_event(event.id, MissionOutcome::Failed)
            .await
            .unwrap_err();

        assert!(err.is_stale());
        assert_eq!(store.event(event.id).unwrap().status, EventStatus::Pending);
    }
}

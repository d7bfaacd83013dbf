//! # 状态转换网关
//!
//! 所有改变事件状态的写操作都经过这里。写入是条件写：
//! 只有在当前状态属于允许集合、且读取后没有其他写者改动过（版本号一致）时才会生效，
//! 否则返回 `StaleState`，绝不盲写。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fleet_core::models::{Event, EventStatus, MissionOutcome, NewReport, Report};
use fleet_core::traits::EventRepository;
use fleet_core::{SchedulerError, SchedulerResult};
use tracing::{debug, warn};

#[async_trait]
pub trait StatusTransitionGateway: Send + Sync {
    /// 把事件从 `allowed_from` 中的某个状态转换到 `to`
    async fn transition(
        &self,
        event_id: i64,
        allowed_from: &[EventStatus],
        to: EventStatus,
    ) -> SchedulerResult<Event>;

    /// `Pending -> Started` 并在同一原子操作中创建执行报告
    ///
    /// 前置条件以调用方读到的 `event`（含版本号）为准。
    async fn start_with_report(
        &self,
        event: &Event,
        external_mission_id: &str,
    ) -> SchedulerResult<(Event, Report)>;

    /// `Started -> Completed | Failed`，关联报告的状态在同一原子操作中更新
    async fn complete(
        &self,
        event_id: i64,
        outcome: MissionOutcome,
    ) -> SchedulerResult<(Event, Option<Report>)>;

    /// 删除仍处于 `Pending` 的事件
    async fn cancel(&self, event_id: i64) -> SchedulerResult<()>;
}

pub struct EventStatusGateway {
    event_repo: Arc<dyn EventRepository>,
}

impl EventStatusGateway {
    pub fn new(event_repo: Arc<dyn EventRepository>) -> Self {
        Self { event_repo }
    }

    /// 条件写失败后重新读取，区分事件已被删除与状态已变化
    async fn explain_lost_race(
        &self,
        event_id: i64,
        expected: &[EventStatus],
    ) -> SchedulerError {
        match self.event_repo.get_by_id(event_id).await {
            Ok(Some(current)) => {
                warn!(
                    event.id = event_id,
                    expected = ?expected,
                    actual = %current.status,
                    "事件状态已被并发修改"
                );
                SchedulerError::stale_state(event_id, expected, current.status)
            }
            Ok(None) => SchedulerError::event_not_found(event_id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl StatusTransitionGateway for EventStatusGateway {
    async fn transition(
        &self,
        event_id: i64,
        allowed_from: &[EventStatus],
        to: EventStatus,
    ) -> SchedulerResult<Event> {
        if let Some(from) = allowed_from.iter().find(|from| !from.can_transition_to(to)) {
            return Err(SchedulerError::InvalidTransition { from: *from, to });
        }

        let current = self
            .event_repo
            .get_by_id(event_id)
            .await?
            .ok_or_else(|| SchedulerError::event_not_found(event_id))?;

        if !allowed_from.contains(&current.status) {
            return Err(SchedulerError::stale_state(
                event_id,
                allowed_from,
                current.status,
            ));
        }

        match self
            .event_repo
            .compare_and_set_status(event_id, current.version, to)
            .await?
        {
            Some(updated) => {
                debug!(
                    event.id = event_id,
                    from = %current.status,
                    to = %updated.status,
                    "事件状态已更新"
                );
                Ok(updated)
            }
            None => Err(self.explain_lost_race(event_id, allowed_from).await),
        }
    }

    async fn start_with_report(
        &self,
        event: &Event,
        external_mission_id: &str,
    ) -> SchedulerResult<(Event, Report)> {
        if event.status != EventStatus::Pending {
            return Err(SchedulerError::stale_state(
                event.id,
                &[EventStatus::Pending],
                event.status,
            ));
        }

        let report = NewReport {
            robot_id: event.robot_id,
            external_mission_id: external_mission_id.to_string(),
            mission_id: event.mission_id.clone(),
            start_time: Utc::now(),
        };

        match self
            .event_repo
            .start_with_report(event.id, event.version, &report)
            .await?
        {
            Some(started) => Ok(started),
            None => Err(self
                .explain_lost_race(event.id, &[EventStatus::Pending])
                .await),
        }
    }

    async fn complete(
        &self,
        event_id: i64,
        outcome: MissionOutcome,
    ) -> SchedulerResult<(Event, Option<Report>)> {
        let current = self
            .event_repo
            .get_by_id(event_id)
            .await?
            .ok_or_else(|| SchedulerError::event_not_found(event_id))?;

        if current.status != EventStatus::Started {
            return Err(SchedulerError::stale_state(
                event_id,
                &[EventStatus::Started],
                current.status,
            ));
        }

        match self
            .event_repo
            .complete_with_report(event_id, current.version, outcome)
            .await?
        {
            Some(completed) => Ok(completed),
            None => Err(self
                .explain_lost_race(event_id, &[EventStatus::Started])
                .await),
        }
    }

    async fn cancel(&self, event_id: i64) -> SchedulerResult<()> {
        if self
            .event_repo
            .delete_if_status(event_id, EventStatus::Pending)
            .await?
        {
            return Ok(());
        }
        Err(self
            .explain_lost_race(event_id, &[EventStatus::Pending])
            .await)
    }
}

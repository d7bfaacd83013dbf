//! # 事件调度引擎
//!
//! 单一的轮询循环。每个 tick：
//! 1. 读取全部 `Pending` 事件，保留 `start_time <= now` 的
//! 2. 逐个处理：机器人不存在则失败；机器人不可用则留待下次；
//!    下发成功则经网关原子地置为 `Started` 并创建报告；下发失败则置为 `Failed`
//!
//! 单个事件的失败只记录日志，不影响同一 tick 中的其他事件。
//! 同一机器人的事件按开始时间顺序处理，不同机器人之间可以并行。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fleet_core::config::models::DispatcherConfig;
use fleet_core::models::{Event, EventStatus, RobotStatus};
use fleet_core::traits::{EventRepository, RobotRepository};
use fleet_core::{is_due, SchedulerResult};
use fleet_domain::StatusTransitionGateway;
use fleet_infrastructure::{MetricsCollector, StructuredLogger};
use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument};

use crate::dispatch_client::{DispatchClientAdapter, DispatchOutcome};

/// 单个事件在一个 tick 中的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Started { report_id: i64 },
    /// 机器人不存在，事件已失败
    RobotNotFound,
    /// 机器人不可用，事件保持 Pending
    RobotUnavailable { status: RobotStatus },
    /// 控制服务不可达，事件已失败
    DispatchUnavailable { reason: String },
    /// 机器人拒绝启动任务，事件已失败
    DispatchRejected { reason: String },
    /// 事件已被其他写者修改或删除，本 tick 放弃处理
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub started: usize,
    pub failed: usize,
    pub deferred: usize,
    pub stale: usize,
    pub errored: usize,
}

impl TickSummary {
    fn record(&mut self, result: &SchedulerResult<EventOutcome>) {
        match result {
            Ok(EventOutcome::Started { .. }) => self.started += 1,
            Ok(EventOutcome::RobotNotFound)
            | Ok(EventOutcome::DispatchUnavailable { .. })
            | Ok(EventOutcome::DispatchRejected { .. }) => self.failed += 1,
            Ok(EventOutcome::RobotUnavailable { .. }) => self.deferred += 1,
            Ok(EventOutcome::Stale) => self.stale += 1,
            Err(_) => self.errored += 1,
        }
    }
}

pub struct EventDispatchEngine {
    event_repo: Arc<dyn EventRepository>,
    robot_repo: Arc<dyn RobotRepository>,
    gateway: Arc<dyn StatusTransitionGateway>,
    dispatcher: DispatchClientAdapter,
    metrics: Arc<MetricsCollector>,
    poll_interval: Duration,
    max_concurrent_dispatches: usize,
}

impl EventDispatchEngine {
    pub fn new(
        event_repo: Arc<dyn EventRepository>,
        robot_repo: Arc<dyn RobotRepository>,
        gateway: Arc<dyn StatusTransitionGateway>,
        dispatcher: DispatchClientAdapter,
        metrics: Arc<MetricsCollector>,
        config: &DispatcherConfig,
    ) -> Self {
        Self {
            event_repo,
            robot_repo,
            gateway,
            dispatcher,
            metrics,
            poll_interval: config.poll_interval(),
            max_concurrent_dispatches: config.max_concurrent_dispatches.max(1),
        }
    }

    /// 运行轮询循环直到收到关闭信号
    ///
    /// 关闭信号只在两个 tick 之间生效，正在进行的 tick 会完整执行。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            max_concurrent_dispatches = self.max_concurrent_dispatches,
            "事件调度引擎已启动"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        StructuredLogger::log_system_error("dispatcher", "tick", &e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("事件调度引擎收到关闭信号");
                    break;
                }
            }
        }
    }

    pub async fn tick(&self) -> SchedulerResult<TickSummary> {
        self.tick_at(Utc::now()).await
    }

    /// 以给定时刻为“现在”执行一次调度
    #[instrument(skip(self))]
    pub async fn tick_at(&self, now: DateTime<Utc>) -> SchedulerResult<TickSummary> {
        let started_at = Instant::now();

        let due: Vec<Event> = self
            .event_repo
            .get_by_status(EventStatus::Pending)
            .await?
            .into_iter()
            .filter(|event| is_due(event.start_time, now))
            .collect();

        let mut summary = TickSummary {
            due: due.len(),
            ..TickSummary::default()
        };

        // 按机器人分组，组内保持开始时间顺序
        let mut per_robot: BTreeMap<i64, Vec<Event>> = BTreeMap::new();
        for event in due {
            per_robot.entry(event.robot_id).or_default().push(event);
        }

        let results: Vec<Vec<SchedulerResult<EventOutcome>>> = stream::iter(per_robot.into_values())
            .map(|events| self.process_robot_events(events))
            .buffer_unordered(self.max_concurrent_dispatches)
            .collect()
            .await;

        for result in results.iter().flatten() {
            summary.record(result);
        }

        let elapsed = started_at.elapsed();
        self.metrics.record_tick(summary.due, elapsed.as_secs_f64());
        StructuredLogger::log_tick_summary(
            summary.due,
            summary.started,
            summary.failed,
            summary.deferred,
            summary.stale,
            summary.errored,
            elapsed.as_millis() as u64,
        );

        Ok(summary)
    }

    async fn process_robot_events(&self, events: Vec<Event>) -> Vec<SchedulerResult<EventOutcome>> {
        let mut results = Vec::with_capacity(events.len());
        for event in &events {
            let result = self.process_event(event).await;
            if let Err(e) = &result {
                StructuredLogger::log_system_error("dispatcher", "process_event", e);
            }
            results.push(result);
        }
        results
    }

    /// 处理单个到期事件
    pub async fn process_event(&self, event: &Event) -> SchedulerResult<EventOutcome> {
        let robot = match self.robot_repo.get_by_id(event.robot_id).await? {
            Some(robot) => robot,
            None => {
                return self
                    .mark_failed(event, "robot_not_found", EventOutcome::RobotNotFound)
                    .await;
            }
        };

        if !robot.is_available() {
            StructuredLogger::log_event_deferred(event.id, robot.id, robot.status.as_str());
            self.metrics.record_event_deferred();
            return Ok(EventOutcome::RobotUnavailable {
                status: robot.status,
            });
        }

        match self
            .dispatcher
            .dispatch(&robot.host, robot.port, &event.mission_id)
            .await
        {
            DispatchOutcome::Started {
                external_mission_id,
            } => match self
                .gateway
                .start_with_report(event, &external_mission_id)
                .await
            {
                Ok((started, report)) => {
                    StructuredLogger::log_event_dispatched(
                        started.id,
                        started.robot_id,
                        &started.mission_id,
                        &report.external_mission_id,
                        report.id,
                    );
                    self.metrics.record_event_dispatched();
                    Ok(EventOutcome::Started {
                        report_id: report.id,
                    })
                }
                Err(e) if e.is_stale() || e.is_not_found() => {
                    // 机器人已开始执行但事件已被修改，不创建报告
                    self.record_stale(event, &e.to_string());
                    Ok(EventOutcome::Stale)
                }
                Err(e) => Err(e),
            },
            DispatchOutcome::Unavailable { reason } => {
                self.mark_failed(
                    event,
                    "dispatch_unavailable",
                    EventOutcome::DispatchUnavailable { reason },
                )
                .await
            }
            DispatchOutcome::Rejected { reason } => {
                self.mark_failed(
                    event,
                    "dispatch_rejected",
                    EventOutcome::DispatchRejected { reason },
                )
                .await
            }
        }
    }

    /// 经网关把事件置为 Failed；事件已被修改时返回 `Stale`
    async fn mark_failed(
        &self,
        event: &Event,
        reason: &str,
        outcome: EventOutcome,
    ) -> SchedulerResult<EventOutcome> {
        match self
            .gateway
            .transition(event.id, &[EventStatus::Pending], EventStatus::Failed)
            .await
        {
            Ok(_) => {
                let detail = match &outcome {
                    EventOutcome::DispatchUnavailable { reason }
                    | EventOutcome::DispatchRejected { reason } => reason.as_str(),
                    _ => reason,
                };
                StructuredLogger::log_event_failed(event.id, event.robot_id, detail);
                self.metrics.record_event_failed(reason);
                Ok(outcome)
            }
            Err(e) if e.is_stale() || e.is_not_found() => {
                self.record_stale(event, &e.to_string());
                Ok(EventOutcome::Stale)
            }
            Err(e) => Err(e),
        }
    }

    fn record_stale(&self, event: &Event, detail: &str) {
        StructuredLogger::log_event_stale(event.id, detail);
        self.metrics.record_event_stale();
    }
}

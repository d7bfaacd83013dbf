//! # 冲突检测
//!
//! 判断某台机器人在候选时间窗 `[start, end)` 内是否已有预约。
//! 只做判定，不合并、拆分或平移任何事件。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_core::traits::EventRepository;
use fleet_core::{SchedulerError, SchedulerResult, TimeWindow};
use tracing::debug;

pub struct ConflictChecker {
    event_repo: Arc<dyn EventRepository>,
}

impl ConflictChecker {
    pub fn new(event_repo: Arc<dyn EventRepository>) -> Self {
        Self { event_repo }
    }

    /// 候选时间窗是否与该机器人的任一事件重叠
    pub async fn conflicts(
        &self,
        robot_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> SchedulerResult<bool> {
        let window = TimeWindow::new(start, end)?;
        Ok(!self.find_conflicts(robot_id, &window).await?.is_empty())
    }

    /// 与候选时间窗重叠的事件ID，按升序返回
    ///
    /// 仓储返回的结果会按 `existing.start < end && existing.end > start`
    /// 再过滤一遍，不依赖存储层的比较语义。
    pub async fn find_conflicts(
        &self,
        robot_id: i64,
        window: &TimeWindow,
    ) -> SchedulerResult<Vec<i64>> {
        let mut ids: Vec<i64> = self
            .event_repo
            .get_overlapping(robot_id, window)
            .await?
            .into_iter()
            .filter(|event| event.robot_id == robot_id && event.window().overlaps(window))
            .map(|event| event.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();

        debug!(
            robot_id = robot_id,
            start = %window.start,
            end = %window.end,
            conflicts = ids.len(),
            "冲突检测完成"
        );
        Ok(ids)
    }

    /// 有冲突时返回 `EventConflict`，携带所有冲突事件ID
    pub async fn ensure_available(&self, robot_id: i64, window: &TimeWindow) -> SchedulerResult<()> {
        let ids = self.find_conflicts(robot_id, window).await?;
        if ids.is_empty() {
            Ok(())
        } else {
            Err(SchedulerError::conflict(robot_id, ids))
        }
    }
}

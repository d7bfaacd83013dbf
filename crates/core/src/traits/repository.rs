//! 数据仓储层接口定义
//!
//! - `EventRepository` - 预约事件的存取，以及带前置条件的状态写入
//! - `RobotRepository` - 机器人信息
//! - `ReportRepository` - 执行报告
//!
//! 所有会改变事件状态的写入都是条件写入：调用方给出读到的 `version`，
//! 只有存储中的版本一致时才会生效，否则返回 `None`，由上层决定如何处理。
//! 实现必须是 `Send + Sync`，以便以 `Arc<dyn ...>` 的形式在任务间共享。

use async_trait::async_trait;

use crate::models::{
    Event, EventStatus, MissionOutcome, NewEvent, NewReport, Report, ReportStatus, Robot,
    RobotStatus,
};
use crate::time_window::TimeWindow;
use crate::SchedulerResult;

/// 事件仓储接口
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// 创建事件
    ///
    /// 实现必须在同一个原子操作中重新检查同一机器人的时间窗重叠，
    /// 存在重叠时返回 `SchedulerError::EventConflict`，不写入任何数据。
    async fn create(&self, event: &NewEvent) -> SchedulerResult<Event>;

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Event>>;

    /// 按开始时间升序返回
    async fn get_by_status(&self, status: EventStatus) -> SchedulerResult<Vec<Event>>;

    /// 返回该机器人所有与 `window` 重叠的事件（不区分状态）
    async fn get_overlapping(
        &self,
        robot_id: i64,
        window: &TimeWindow,
    ) -> SchedulerResult<Vec<Event>>;

    /// 仅当当前版本等于 `expected_version` 时写入新状态并递增版本
    async fn compare_and_set_status(
        &self,
        id: i64,
        expected_version: i64,
        status: EventStatus,
    ) -> SchedulerResult<Option<Event>>;

    /// 原子地将 Pending 事件置为 Started 并创建对应报告
    ///
    /// 前置条件（版本一致且仍为 Pending）不满足时不创建报告，返回 `None`。
    async fn start_with_report(
        &self,
        id: i64,
        expected_version: i64,
        report: &NewReport,
    ) -> SchedulerResult<Option<(Event, Report)>>;

    /// 原子地将 Started 事件置为最终状态并同步关联报告的状态
    ///
    /// 前置条件（版本一致且仍为 Started）不满足时不做任何修改，返回 `None`。
    /// 关联的报告不存在时整体回滚并返回 `ReportNotFound`。
    async fn complete_with_report(
        &self,
        id: i64,
        expected_version: i64,
        outcome: MissionOutcome,
    ) -> SchedulerResult<Option<(Event, Option<Report>)>>;

    /// 仅当事件处于 `status` 时删除，返回是否删除成功
    async fn delete_if_status(&self, id: i64, status: EventStatus) -> SchedulerResult<bool>;
}

/// 机器人仓储接口
#[async_trait]
pub trait RobotRepository: Send + Sync {
    async fn create(&self, robot: &Robot) -> SchedulerResult<Robot>;
    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Robot>>;
    async fn update_status(&self, id: i64, status: RobotStatus) -> SchedulerResult<Robot>;
    async fn set_enabled(&self, id: i64, enabled: bool) -> SchedulerResult<Robot>;
}

/// 报告仓储接口
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Report>>;
    async fn get_by_robot_id(&self, robot_id: i64) -> SchedulerResult<Vec<Report>>;
    async fn update_status(&self, id: i64, status: ReportStatus) -> SchedulerResult<Report>;
}

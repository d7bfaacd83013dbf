use std::sync::Arc;

use fleet_core::models::Robot;
use fleet_core::traits::{RobotControlClient, RobotRepository, StopMissionResponse};
use fleet_core::{SchedulerError, SchedulerResult};
use tracing::{info, warn};

/// 机器人管理：查询、启停预约资格、急停当前任务
pub struct RobotService {
    robot_repo: Arc<dyn RobotRepository>,
    control_client: Arc<dyn RobotControlClient>,
}

impl RobotService {
    pub fn new(
        robot_repo: Arc<dyn RobotRepository>,
        control_client: Arc<dyn RobotControlClient>,
    ) -> Self {
        Self {
            robot_repo,
            control_client,
        }
    }

    pub async fn get_robot(&self, id: i64) -> SchedulerResult<Robot> {
        self.robot_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| SchedulerError::robot_not_found(id))
    }

    /// 停用后不能再预约新事件，已有事件照常下发
    pub async fn set_enabled(&self, id: i64, enabled: bool) -> SchedulerResult<Robot> {
        let robot = self.robot_repo.set_enabled(id, enabled).await?;
        info!(robot.id = id, enabled = enabled, "机器人预约状态已更新");
        Ok(robot)
    }

    /// 请求机器人停止当前任务
    pub async fn stop_robot(&self, id: i64) -> SchedulerResult<StopMissionResponse> {
        let robot = self.get_robot(id).await?;

        let response = self
            .control_client
            .stop_mission(&robot.host, robot.port)
            .await
            .map_err(|e| {
                warn!(robot.id = id, error = %e, "停止机器人任务失败");
                SchedulerError::from(e)
            })?;

        info!(
            robot.id = id,
            stopped = response.stopped,
            message = %response.message,
            "已请求机器人停止任务"
        );
        Ok(response)
    }
}

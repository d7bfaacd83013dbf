use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::RobotControlError;

/// `POST /schedule/start-mission` 的响应体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartMissionResponse {
    pub message: String,
    pub started: bool,
    #[serde(default)]
    pub mission_id: Option<String>,
}

/// `POST /schedule/stop-mission` 的响应体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopMissionResponse {
    pub message: String,
    pub stopped: bool,
}

/// 机器人控制服务客户端
///
/// 每台机器人在自己的 `host:port` 上运行控制服务。实现不做重试。
#[async_trait]
pub trait RobotControlClient: Send + Sync {
    async fn start_mission(
        &self,
        host: &str,
        port: u16,
        mission_id: &str,
    ) -> Result<StartMissionResponse, RobotControlError>;

    async fn stop_mission(
        &self,
        host: &str,
        port: u16,
    ) -> Result<StopMissionResponse, RobotControlError>;
}

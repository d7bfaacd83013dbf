use thiserror::Error;

use crate::models::EventStatus;

/// 调度器错误类型定义
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("事件未找到: {id}")]
    EventNotFound { id: i64 },

    #[error("机器人未找到: {id}")]
    RobotNotFound { id: i64 },

    #[error("报告未找到: {id}")]
    ReportNotFound { id: i64 },

    #[error("与已存在的事件时间冲突, 机器人: {robot_id}, 冲突事件ID: {}", join_ids(.conflicting_ids))]
    EventConflict {
        robot_id: i64,
        conflicting_ids: Vec<i64>,
    },

    #[error("事件 {event_id} 状态已变化: 期望 {expected:?}, 实际 {actual}")]
    StaleState {
        event_id: i64,
        expected: Vec<EventStatus>,
        actual: EventStatus,
    },

    #[error("非法的状态转换: {from} -> {to}")]
    InvalidTransition { from: EventStatus, to: EventStatus },

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("机器人控制服务错误: {0}")]
    RobotControl(#[from] RobotControlError),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 机器人控制服务调用失败
///
/// 除 `Status` 外均属于传输层失败，调度引擎将其视为机器人不可达。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RobotControlError {
    #[error("请求机器人控制服务超时")]
    Timeout,

    #[error("无法连接机器人控制服务: {0}")]
    Connection(String),

    #[error("机器人控制服务重定向次数过多")]
    TooManyRedirects,

    #[error("机器人控制服务返回错误状态 {status}: {message}")]
    Status { status: u16, message: String },

    #[error("机器人控制服务响应格式错误: {0}")]
    MalformedResponse(String),

    #[error("请求机器人控制服务失败: {0}")]
    Request(String),
}

impl RobotControlError {
    pub fn is_transport(&self) -> bool {
        !matches!(self, RobotControlError::Status { .. })
    }
}

/// 统一的Result类型
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    pub fn event_not_found(id: i64) -> Self {
        Self::EventNotFound { id }
    }
    pub fn robot_not_found(id: i64) -> Self {
        Self::RobotNotFound { id }
    }
    pub fn report_not_found(id: i64) -> Self {
        Self::ReportNotFound { id }
    }
    pub fn conflict(robot_id: i64, mut conflicting_ids: Vec<i64>) -> Self {
        conflicting_ids.sort_unstable();
        conflicting_ids.dedup();
        Self::EventConflict {
            robot_id,
            conflicting_ids,
        }
    }
    pub fn stale_state(event_id: i64, expected: &[EventStatus], actual: EventStatus) -> Self {
        Self::StaleState {
            event_id,
            expected: expected.to_vec(),
            actual,
        }
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// 并发写入导致的前置条件失效，调用方应放弃本次操作
    pub fn is_stale(&self) -> bool {
        matches!(self, SchedulerError::StaleState { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SchedulerError::EventConflict { .. }
                | SchedulerError::StaleState { .. }
                | SchedulerError::InvalidTransition { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SchedulerError::EventNotFound { .. }
                | SchedulerError::RobotNotFound { .. }
                | SchedulerError::ReportNotFound { .. }
        )
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            SchedulerError::Database(_) => true,
            SchedulerError::RobotControl(e) => e.is_transport(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for SchedulerError {
    fn from(err: anyhow::Error) -> Self {
        SchedulerError::Internal(err.to_string())
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

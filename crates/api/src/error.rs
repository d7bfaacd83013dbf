use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fleet_core::{RobotControlError, SchedulerError};
use serde_json::{json, Value};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("调度器错误: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("内部服务器错误: {0}")]
    Internal(String),
}

struct ErrorBody {
    status: StatusCode,
    message: String,
    error_type: &'static str,
    suggestions: Vec<String>,
    details: Option<Value>,
}

impl ErrorBody {
    fn new(status: StatusCode, message: String, error_type: &'static str) -> Self {
        Self {
            status,
            message,
            error_type,
            suggestions: Vec::new(),
            details: None,
        }
    }

    fn suggest(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

fn scheduler_error_body(err: &SchedulerError) -> ErrorBody {
    match err {
        SchedulerError::EventNotFound { id } => ErrorBody::new(
            StatusCode::NOT_FOUND,
            format!("事件 ID {} 不存在", id),
            "EVENT_NOT_FOUND",
        )
        .suggest("请检查事件ID是否正确"),
        SchedulerError::RobotNotFound { id } => ErrorBody::new(
            StatusCode::NOT_FOUND,
            format!("机器人 ID {} 不存在", id),
            "ROBOT_NOT_FOUND",
        )
        .suggest("请检查机器人ID是否正确"),
        SchedulerError::ReportNotFound { id } => ErrorBody::new(
            StatusCode::NOT_FOUND,
            format!("报告 ID {} 不存在", id),
            "REPORT_NOT_FOUND",
        )
        .suggest("报告只在事件成功下发后创建"),
        SchedulerError::EventConflict {
            robot_id,
            conflicting_ids,
        } => ErrorBody::new(StatusCode::CONFLICT, err.to_string(), "EVENT_CONFLICT")
            .suggest("请选择与已有事件不重叠的时间段")
            .with_details(json!({
                "robot_id": robot_id,
                "conflicting_event_ids": conflicting_ids,
            })),
        SchedulerError::StaleState {
            event_id, actual, ..
        } => ErrorBody::new(StatusCode::CONFLICT, err.to_string(), "STALE_STATE")
            .suggest("事件状态已被其他操作修改，请重新查询后再试")
            .with_details(json!({
                "event_id": event_id,
                "actual_status": actual,
            })),
        SchedulerError::InvalidTransition { .. } => {
            ErrorBody::new(StatusCode::CONFLICT, err.to_string(), "INVALID_TRANSITION")
        }
        SchedulerError::ValidationError(msg) => {
            ErrorBody::new(StatusCode::BAD_REQUEST, msg.clone(), "VALIDATION_ERROR")
                .suggest("时间戳需为带时区偏移的 RFC 3339 格式，例如 2024-05-01T10:00:00+02:00")
        }
        SchedulerError::RobotControl(RobotControlError::Timeout) => ErrorBody::new(
            StatusCode::GATEWAY_TIMEOUT,
            err.to_string(),
            "ROBOT_CONTROL_TIMEOUT",
        )
        .suggest("请检查机器人网络连接"),
        SchedulerError::RobotControl(_) => ErrorBody::new(
            StatusCode::BAD_GATEWAY,
            err.to_string(),
            "ROBOT_CONTROL_ERROR",
        )
        .suggest("请检查机器人控制服务是否在线"),
        _ => {
            error!(error = %err, "请求处理失败");
            ErrorBody::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR",
            )
            .suggest("系统遇到内部错误，请稍后重试")
            .suggest("查看 GET /health 检查系统状态")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Scheduler(err) => scheduler_error_body(err),
            ApiError::BadRequest(msg) => ErrorBody::new(
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {}", msg),
                "BAD_REQUEST",
            )
            .suggest("请检查请求格式和参数"),
            ApiError::Internal(msg) => {
                error!(error = %msg, "请求处理失败");
                ErrorBody::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "系统内部错误".to_string(),
                    "INTERNAL_ERROR",
                )
                .suggest("系统遇到内部错误，请稍后重试")
            }
        };

        let mut error = json!({
            "message": body.message,
            "type": body.error_type,
            "code": body.status.as_u16(),
            "suggestions": body.suggestions,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        if let Some(details) = body.details {
            error["details"] = details;
        }

        (body.status, Json(json!({ "error": error }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

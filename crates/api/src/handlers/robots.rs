use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::ApiResult,
    response::{success, ApiResponse},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

/// 获取机器人信息
pub async fn get_robot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let robot = state.robot_service.get_robot(id).await?;
    Ok(success(robot))
}

/// 启用或停用机器人的预约资格
pub async fn set_robot_enabled(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<SetEnabledRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let robot = state.robot_service.set_enabled(id, request.enabled).await?;
    Ok(success(robot))
}

/// 请求机器人停止当前任务
pub async fn stop_robot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let response = state.robot_service.stop_robot(id).await?;
    let message = response.message.clone();
    Ok(ApiResponse::success_with_message(response, message))
}

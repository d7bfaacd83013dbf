use axum::extract::{Path, State};

use crate::{error::ApiResult, response::success, routes::AppState};

/// 获取执行报告
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let report = state.booking_service.get_report(id).await?;
    Ok(success(report))
}

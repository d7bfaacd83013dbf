use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Duration;
use fleet_core::models::{Event, MissionOutcome, Report};
use fleet_core::{parse_booking_timestamp, SchedulerError};
use fleet_domain::BookingRequest;
use fleet_infrastructure::StructuredLogger;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    response::{created, no_content, success},
    routes::AppState,
};

/// 事件预约请求
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub robot_id: i64,
    pub mission_id: String,
    /// RFC 3339 时间戳，必须带时区偏移
    pub start_time: String,
    /// 未提供时使用默认时长
    pub estimated_duration_seconds: Option<i64>,
}

impl CreateEventRequest {
    fn into_booking_request(self) -> ApiResult<BookingRequest> {
        let start_time = parse_booking_timestamp(&self.start_time)?;
        let estimated_duration = self
            .estimated_duration_seconds
            .map(|seconds| {
                Duration::try_seconds(seconds).ok_or_else(|| {
                    ApiError::BadRequest(format!("预估时长超出范围: {} 秒", seconds))
                })
            })
            .transpose()?;

        Ok(BookingRequest {
            robot_id: self.robot_id,
            mission_id: self.mission_id,
            start_time,
            estimated_duration,
        })
    }
}

/// 事件结果回报请求
#[derive(Debug, Deserialize)]
pub struct CompleteEventRequest {
    pub outcome: MissionOutcome,
}

#[derive(Debug, Serialize)]
pub struct CompletedEvent {
    pub event: Event,
    pub report: Option<Report>,
}

/// 预约事件
pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEventRequest>,
) -> ApiResult<impl IntoResponse> {
    let booking = request.into_booking_request()?;

    match state.booking_service.book_event(booking).await {
        Ok(event) => {
            StructuredLogger::log_event_booked(
                event.id,
                event.robot_id,
                &event.mission_id,
                event.start_time,
                event.end_time,
            );
            state.metrics.record_event_booked();
            Ok(created(event))
        }
        Err(err) => {
            if let SchedulerError::EventConflict {
                robot_id,
                conflicting_ids,
            } = &err
            {
                StructuredLogger::log_booking_conflict(*robot_id, conflicting_ids);
                state.metrics.record_booking_conflict();
            }
            Err(err.into())
        }
    }
}

/// 获取单个事件
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let event = state.booking_service.get_event(id).await?;
    Ok(success(event))
}

/// 取消尚未下发的事件
pub async fn cancel_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.booking_service.cancel_event(id).await?;
    StructuredLogger::log_event_cancelled(id);
    Ok(no_content())
}

/// 回报已启动事件的执行结果
pub async fn complete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<CompleteEventRequest>,
) -> ApiResult<impl IntoResponse> {
    let (event, report) = state
        .booking_service
        .complete_event(id, request.outcome)
        .await?;
    StructuredLogger::log_event_completed(
        event.id,
        event.status.as_str(),
        report.as_ref().map(|r| r.id),
    );
    Ok(success(CompletedEvent { event, report }))
}

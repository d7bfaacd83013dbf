//! # Fleet API
//!
//! 机器人任务调度系统的 REST API，基于 Axum 构建。
//!
//! ## API 端点
//!
//! ### 事件
//! - `POST /api/events` - 预约事件，未指定时长时默认一小时
//! - `GET /api/events/{id}` - 获取事件详情
//! - `DELETE /api/events/{id}` - 取消尚未下发的事件
//! - `POST /api/events/{id}/complete` - 回报已启动事件的执行结果
//! - `GET /api/reports/{id}` - 获取执行报告
//!
//! ### 机器人
//! - `GET /api/robots/{id}` - 获取机器人信息
//! - `PUT /api/robots/{id}/enabled` - 启用或停用预约资格
//! - `POST /api/robots/{id}/stop` - 停止机器人当前任务
//!
//! ### 系统
//! - `GET /health` - 健康检查
//!
//! 错误统一返回 `{"error": {message, type, code, suggestions, timestamp}}`，
//! 时间冲突时 `details.conflicting_event_ids` 列出冲突的事件。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;

use fleet_core::config::models::ApiConfig;
use fleet_domain::{BookingService, RobotService};
use fleet_infrastructure::MetricsCollector;
use middleware::{cors_layer, request_logging, trace_layer};
use routes::create_routes;

pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use routes::AppState;

/// 创建完整的API应用
pub fn create_app(
    booking_service: Arc<BookingService>,
    robot_service: Arc<RobotService>,
    metrics: Arc<MetricsCollector>,
    api_config: &ApiConfig,
) -> Router {
    let state = AppState {
        booking_service,
        robot_service,
        metrics,
    };

    let app = create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if api_config.cors_enabled {
        app.layer(cors_layer())
    } else {
        app
    }
}

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use fleet_domain::{BookingService, RobotService};
use fleet_infrastructure::MetricsCollector;

use crate::handlers::{
    events::{cancel_event, complete_event, create_event, get_event},
    health::health_check,
    reports::get_report,
    robots::{get_robot, set_robot_enabled, stop_robot},
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub booking_service: Arc<BookingService>,
    pub robot_service: Arc<RobotService>,
    pub metrics: Arc<MetricsCollector>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 事件预约API
        .route("/api/events", post(create_event))
        .route("/api/events/{id}", get(get_event).delete(cancel_event))
        .route("/api/events/{id}/complete", post(complete_event))
        .route("/api/reports/{id}", get(get_report))
        // 机器人管理API
        .route("/api/robots/{id}", get(get_robot))
        .route("/api/robots/{id}/enabled", put(set_robot_enabled))
        .route("/api/robots/{id}/stop", post(stop_robot))
        .with_state(state)
}

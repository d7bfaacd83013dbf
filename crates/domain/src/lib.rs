//! # Fleet Domain
//!
//! 预约与状态流转的业务规则：冲突检测、状态转换网关、预约服务和机器人管理。
//! 只依赖 `fleet-core` 中的仓储与控制接口，不关心具体存储和传输实现。

pub mod booking_service;
pub mod conflict_checker;
pub mod robot_service;
pub mod status_gateway;

pub use booking_service::{BookingRequest, BookingService};
pub use conflict_checker::ConflictChecker;
pub use fleet_core::{SchedulerError, SchedulerResult};
pub use robot_service::RobotService;
pub use status_gateway::{EventStatusGateway, StatusTransitionGateway};

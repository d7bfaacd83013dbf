//! # Fleet Core
//!
//! 机器人任务调度系统的基础库：错误类型、配置、数据模型、
//! 仓储与机器人控制接口，以及时间窗运算。

pub mod config;
pub mod errors;
pub mod models;
pub mod time_window;
pub mod traits;

pub use config::*;
pub use errors::*;
pub use time_window::{is_due, parse_booking_timestamp, TimeWindow};

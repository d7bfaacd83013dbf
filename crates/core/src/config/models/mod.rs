pub mod api_observability;
pub mod app_config;
pub mod booking;
pub mod database;
pub mod dispatcher_robot;

// Re-export main types for easier imports
pub use api_observability::{ApiConfig, ObservabilityConfig};
pub use app_config::AppConfig;
pub use booking::BookingConfig;
pub use database::DatabaseConfig;
pub use dispatcher_robot::{DispatcherConfig, RobotControlConfig};

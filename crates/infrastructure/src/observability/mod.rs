//! Observability module
//!
//! - Metrics collection (`metrics` facade, exported by the binary)
//! - Structured logging helpers

pub mod metrics_collector;
pub mod structured_logger;

pub use metrics_collector::MetricsCollector;
pub use structured_logger::StructuredLogger;

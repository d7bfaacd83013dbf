//! Structured logging utilities
//!
//! One function per scheduling event so every log line for the same event
//! carries the same field names (`event.id`, `robot.id`, ...).

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

/// Structured logging utilities
pub struct StructuredLogger;

impl StructuredLogger {
    /// Log a new booking
    pub fn log_event_booked(
        event_id: i64,
        robot_id: i64,
        mission_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) {
        info!(
            event = "event_booked",
            event.id = event_id,
            robot.id = robot_id,
            mission.id = mission_id,
            event.start_time = %start_time,
            event.end_time = %end_time,
            "Event booked"
        );
    }

    /// Log a rejected booking
    pub fn log_booking_conflict(robot_id: i64, conflicting_ids: &[i64]) {
        warn!(
            event = "booking_conflict",
            robot.id = robot_id,
            conflicting_ids = ?conflicting_ids,
            "Booking rejected: time window overlaps existing events"
        );
    }

    /// Log a cancelled booking
    pub fn log_event_cancelled(event_id: i64) {
        info!(
            event = "event_cancelled",
            event.id = event_id,
            "Pending event cancelled"
        );
    }

    /// Log a successful dispatch
    pub fn log_event_dispatched(
        event_id: i64,
        robot_id: i64,
        mission_id: &str,
        external_mission_id: &str,
        report_id: i64,
    ) {
        info!(
            event = "event_dispatched",
            event.id = event_id,
            robot.id = robot_id,
            mission.id = mission_id,
            mission.external_id = external_mission_id,
            report.id = report_id,
            "Mission started on robot"
        );
    }

    /// Log an event left Pending for the next tick
    pub fn log_event_deferred(event_id: i64, robot_id: i64, robot_status: &str) {
        debug!(
            event = "event_deferred",
            event.id = event_id,
            robot.id = robot_id,
            robot.status = robot_status,
            "Robot not available, event stays pending"
        );
    }

    /// Log an event marked Failed
    pub fn log_event_failed(event_id: i64, robot_id: i64, reason: &str) {
        warn!(
            event = "event_failed",
            event.id = event_id,
            robot.id = robot_id,
            failure.reason = reason,
            "Event marked as failed"
        );
    }

    /// Log an event whose status changed under us
    pub fn log_event_stale(event_id: i64, detail: &str) {
        info!(
            event = "event_stale",
            event.id = event_id,
            stale.detail = detail,
            "Event changed concurrently, skipped for this tick"
        );
    }

    /// Log the final outcome of a started event
    pub fn log_event_completed(event_id: i64, status: &str, report_id: Option<i64>) {
        info!(
            event = "event_completed",
            event.id = event_id,
            event.status = status,
            report.id = report_id,
            "Event outcome recorded"
        );
    }

    /// Log the result of one dispatch tick
    pub fn log_tick_summary(
        due: usize,
        started: usize,
        failed: usize,
        deferred: usize,
        stale: usize,
        errored: usize,
        duration_ms: u64,
    ) {
        if due == 0 {
            debug!(event = "dispatch_tick", tick.duration_ms = duration_ms, "No due events");
            return;
        }

        info!(
            event = "dispatch_tick",
            tick.due = due,
            tick.started = started,
            tick.failed = failed,
            tick.deferred = deferred,
            tick.stale = stale,
            tick.errored = errored,
            tick.duration_ms = duration_ms,
            "Dispatch tick completed"
        );
    }

    /// Log system error
    pub fn log_system_error(component: &str, operation: &str, error: &dyn std::error::Error) {
        error!(
            event = "system_error",
            error.component = component,
            error.operation = operation,
            error.message = %error,
            "System error occurred"
        );
    }
}

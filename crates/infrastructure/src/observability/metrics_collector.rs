//! Metrics collector for the robot mission scheduler
//!
//! Handles are registered against the global `metrics` recorder. Without an
//! installed recorder (tests, exporter disabled) every call is a no-op.

use anyhow::Result;
use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use tracing::debug;

/// Metrics collector for booking and dispatch
pub struct MetricsCollector {
    // Booking metrics
    events_booked_total: Counter,
    booking_conflicts_total: Counter,

    // Dispatch metrics
    events_dispatched_total: Counter,
    events_failed_total: Counter,
    events_deferred_total: Counter,
    events_stale_total: Counter,
    due_events: Gauge,

    // Timing
    tick_duration: Histogram,
    robot_control_latency: Histogram,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let events_booked_total = counter!("fleet_events_booked_total");
        let booking_conflicts_total = counter!("fleet_booking_conflicts_total");

        let events_dispatched_total = counter!("fleet_events_dispatched_total");
        let events_failed_total = counter!("fleet_events_failed_total");
        let events_deferred_total = counter!("fleet_events_deferred_total");
        let events_stale_total = counter!("fleet_events_stale_total");
        let due_events = gauge!("fleet_due_events");

        let tick_duration = histogram!("fleet_dispatch_tick_duration_seconds");
        let robot_control_latency = histogram!("fleet_robot_control_latency_seconds");

        Ok(Self {
            events_booked_total,
            booking_conflicts_total,
            events_dispatched_total,
            events_failed_total,
            events_deferred_total,
            events_stale_total,
            due_events,
            tick_duration,
            robot_control_latency,
        })
    }

    // Booking metrics

    pub fn record_event_booked(&self) {
        self.events_booked_total.increment(1);
    }

    pub fn record_booking_conflict(&self) {
        self.booking_conflicts_total.increment(1);
    }

    // Dispatch metrics

    /// Record a successful dispatch (event moved to Started)
    pub fn record_event_dispatched(&self) {
        self.events_dispatched_total.increment(1);
    }

    /// Record an event marked Failed, labelled by reason
    pub fn record_event_failed(&self, reason: &str) {
        self.events_failed_total.increment(1);
        counter!("fleet_events_failed_by_reason_total", "reason" => reason.to_string())
            .increment(1);
    }

    /// Record an event left Pending because its robot was not available
    pub fn record_event_deferred(&self) {
        self.events_deferred_total.increment(1);
    }

    /// Record an event skipped because another writer changed it first
    pub fn record_event_stale(&self) {
        self.events_stale_total.increment(1);
    }

    // Timing

    /// Record one dispatch tick
    pub fn record_tick(&self, due: usize, duration_seconds: f64) {
        self.due_events.set(due as f64);
        self.tick_duration.record(duration_seconds);

        debug!(
            due = due,
            duration_seconds = duration_seconds,
            "Dispatch tick recorded"
        );
    }

    /// Record latency of a robot control call
    pub fn record_robot_control_latency(&self, duration_seconds: f64) {
        self.robot_control_latency.record(duration_seconds);
    }
}

//! Test data builders for creating test entities
//!
//! Builders fill in sensible defaults; only what a test cares about needs to be set.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use fleet_core::models::{Event, EventStatus, Robot, RobotStatus};

/// Builder for creating test Robot entities
pub struct RobotBuilder {
    robot: Robot,
}

impl RobotBuilder {
    pub fn new() -> Self {
        Self {
            robot: Robot {
                id: 1,
                name: "test_robot".to_string(),
                host: "127.0.0.1".to_string(),
                port: 3000,
                status: RobotStatus::Available,
                enabled: true,
                created_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.robot.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.robot.name = name.to_string();
        self
    }

    pub fn with_address(mut self, host: &str, port: u16) -> Self {
        self.robot.host = host.to_string();
        self.robot.port = port;
        self
    }

    pub fn with_status(mut self, status: RobotStatus) -> Self {
        self.robot.status = status;
        self
    }

    pub fn busy(self) -> Self {
        self.with_status(RobotStatus::Busy)
    }

    pub fn disabled(mut self) -> Self {
        self.robot.enabled = false;
        self
    }

    pub fn build(self) -> Robot {
        self.robot
    }
}

impl Default for RobotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Event entities
///
/// `end_time` is always derived from start time and duration on `build()`.
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn new() -> Self {
        let start_time = Utc::now().trunc_subsecs(3);
        let estimated_duration = Duration::hours(1);
        Self {
            event: Event {
                id: 0,
                robot_id: 1,
                mission_id: "test_mission".to_string(),
                start_time,
                estimated_duration,
                end_time: start_time + estimated_duration,
                status: EventStatus::Pending,
                report_id: None,
                version: 0,
                created_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.event.id = id;
        self
    }

    pub fn with_robot_id(mut self, robot_id: i64) -> Self {
        self.event.robot_id = robot_id;
        self
    }

    pub fn with_mission_id(mut self, mission_id: &str) -> Self {
        self.event.mission_id = mission_id.to_string();
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.event.start_time = start_time.trunc_subsecs(3);
        self
    }

    /// Start time relative to now, e.g. `starting_in(Duration::seconds(-1))`
    pub fn starting_in(self, offset: Duration) -> Self {
        self.with_start_time(Utc::now() + offset)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.event.estimated_duration = duration;
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.event.status = status;
        self
    }

    pub fn with_report_id(mut self, report_id: i64) -> Self {
        self.event.report_id = Some(report_id);
        self
    }

    pub fn build(mut self) -> Event {
        self.event.end_time = self.event.start_time + self.event.estimated_duration;
        self.event
    }
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

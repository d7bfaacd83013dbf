use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::impl_sqlite_text_enum;
use crate::time_window::TimeWindow;
use crate::{SchedulerError, SchedulerResult};

/// 预约事件
///
/// 表示一次已预订的（机器人、任务、时间窗）组合。
///
/// # 字段说明
///
/// - `start_time`: 计划开始时间，带时区，存储精度为毫秒
/// - `estimated_duration`: 预估执行时长，必须为正
/// - `end_time`: 始终等于 `start_time + estimated_duration`，只在创建时推导
/// - `status`: 只能通过状态转换网关修改
/// - `report_id`: 成功下发后关联的报告
/// - `version`: 乐观并发控制版本号，每次状态写入递增
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub robot_id: i64,
    pub mission_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(rename = "estimated_duration_ms", with = "duration_ms")]
    pub estimated_duration: Duration,
    pub end_time: DateTime<Utc>,
    pub status: EventStatus,
    pub report_id: Option<i64>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// 事件占用的半开时间窗 `[start_time, end_time)`
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == EventStatus::Pending
    }
}

/// 待创建的事件
///
/// 构造时完成时间归一化，`end_time` 由此推导，不能单独设置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub robot_id: i64,
    pub mission_id: String,
    pub start_time: DateTime<Utc>,
    pub estimated_duration: Duration,
    end_time: DateTime<Utc>,
}

impl NewEvent {
    pub fn new(
        robot_id: i64,
        mission_id: impl Into<String>,
        start_time: DateTime<Utc>,
        estimated_duration: Duration,
    ) -> SchedulerResult<Self> {
        let mission_id = mission_id.into();
        if mission_id.trim().is_empty() {
            return Err(SchedulerError::validation_error("任务ID不能为空"));
        }

        let estimated_duration = Duration::milliseconds(estimated_duration.num_milliseconds());
        if estimated_duration <= Duration::zero() {
            return Err(SchedulerError::validation_error(format!(
                "预估时长必须大于0, 实际: {}ms",
                estimated_duration.num_milliseconds()
            )));
        }

        let start_time = start_time.trunc_subsecs(3);
        let end_time = start_time
            .checked_add_signed(estimated_duration)
            .ok_or_else(|| {
                SchedulerError::validation_error(format!(
                    "预估时长过长, 结束时间超出范围: {}ms",
                    estimated_duration.num_milliseconds()
                ))
            })?;

        Ok(Self {
            robot_id,
            mission_id,
            start_time,
            estimated_duration,
            end_time,
        })
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time(),
        }
    }
}

/// 事件状态
///
/// 合法的转换只有 `Pending -> Started | Failed` 与 `Started -> Completed | Failed`，
/// 状态永不回退。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "STARTED")]
    Started,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "COMPLETED")]
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "PENDING",
            EventStatus::Started => "STARTED",
            EventStatus::Failed => "FAILED",
            EventStatus::Completed => "COMPLETED",
        }
    }

    pub fn can_transition_to(&self, to: EventStatus) -> bool {
        matches!(
            (self, to),
            (EventStatus::Pending, EventStatus::Started)
                | (EventStatus::Pending, EventStatus::Failed)
                | (EventStatus::Started, EventStatus::Completed)
                | (EventStatus::Started, EventStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Failed | EventStatus::Completed)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(EventStatus::Pending),
            "STARTED" => Ok(EventStatus::Started),
            "FAILED" => Ok(EventStatus::Failed),
            "COMPLETED" => Ok(EventStatus::Completed),
            _ => Err(format!("Invalid event status: {s}")),
        }
    }
}

impl_sqlite_text_enum!(EventStatus);

/// 外部上报的任务执行结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MissionOutcome {
    Completed,
    Failed,
}

impl MissionOutcome {
    pub fn event_status(&self) -> EventStatus {
        match self {
            MissionOutcome::Completed => EventStatus::Completed,
            MissionOutcome::Failed => EventStatus::Failed,
        }
    }
}

mod duration_ms {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = i64::deserialize(deserializer)?;
        Ok(Duration::milliseconds(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_event_derives_end_time() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let event = NewEvent::new(1, "mission-1", start, Duration::minutes(45)).unwrap();

        assert_eq!(event.end_time(), start + Duration::minutes(45));
        assert_eq!(event.window().duration(), Duration::minutes(45));
    }

    #[test]
    fn test_new_event_truncates_to_milliseconds() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
            + Duration::nanoseconds(1_234_567);
        let event = NewEvent::new(1, "m", start, Duration::nanoseconds(90_000_999_999)).unwrap();

        assert_eq!(event.start_time.timestamp_subsec_nanos(), 1_000_000);
        assert_eq!(event.estimated_duration, Duration::milliseconds(90_000));
    }

    #[test]
    fn test_new_event_rejects_non_positive_duration() {
        let start = Utc::now();
        assert!(NewEvent::new(1, "m", start, Duration::zero()).is_err());
        assert!(NewEvent::new(1, "m", start, Duration::seconds(-5)).is_err());
        assert!(NewEvent::new(1, "m", start, Duration::microseconds(10)).is_err());
    }

    #[test]
    fn test_new_event_rejects_end_time_overflow() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let huge = Duration::try_seconds(100_000_000_000_000).unwrap();

        let err = NewEvent::new(1, "m", start, huge).unwrap_err();
        assert!(matches!(err, SchedulerError::ValidationError(_)));
    }

    #[test]
    fn test_new_event_rejects_blank_mission() {
        assert!(NewEvent::new(1, "  ", Utc::now(), Duration::hours(1)).is_err());
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        use EventStatus::*;

        assert!(Pending.can_transition_to(Started));
        assert!(Pending.can_transition_to(Failed));
        assert!(Started.can_transition_to(Completed));
        assert!(Started.can_transition_to(Failed));

        assert!(!Started.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Started));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_event_serializes_duration_in_milliseconds() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let event = Event {
            id: 3,
            robot_id: 1,
            mission_id: "m".to_string(),
            start_time: start,
            estimated_duration: Duration::minutes(1),
            end_time: start + Duration::minutes(1),
            status: EventStatus::Pending,
            report_id: None,
            version: 0,
            created_at: start,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["estimated_duration_ms"], 60_000);
        assert_eq!(json["status"], "PENDING");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_mission_outcome_maps_to_status() {
        assert_eq!(MissionOutcome::Completed.event_status(), EventStatus::Completed);
        assert_eq!(MissionOutcome::Failed.event_status(), EventStatus::Failed);
    }
}

//! 半开时间区间运算
//!
//! 事件占用的时间窗是 `[start, end)`：结束时刻不属于该区间，
//! 因此首尾相接的两个事件互不冲突。

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{SchedulerError, SchedulerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> SchedulerResult<Self> {
        if end <= start {
            return Err(SchedulerError::validation_error(format!(
                "结束时间 {end} 必须晚于开始时间 {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> SchedulerResult<Self> {
        Self::new(start, start + duration)
    }

    /// `a.start < b.end && a.end > b.start`
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// 开始时间已到（含恰好等于当前时刻）
pub fn is_due(start_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start_time <= now
}

/// 解析预约接口传入的时间戳
///
/// 只接受带时区偏移的 RFC 3339 时间，不带偏移的本地时间会被拒绝，
/// 而不是按某个默认时区解释。结果截断到毫秒。
pub fn parse_booking_timestamp(raw: &str) -> SchedulerResult<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| {
        SchedulerError::validation_error(format!(
            "时间戳 '{raw}' 无效, 必须是带时区偏移的RFC 3339格式 (例如 2024-05-01T08:00:00Z): {e}"
        ))
    })?;
    Ok(parsed.with_timezone(&Utc).trunc_subsecs(3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
        TimeWindow::new(at(start.0, start.1), at(end.0, end.1)).unwrap()
    }

    #[test]
    fn test_touching_windows_do_not_overlap() {
        let a = window((8, 0), (9, 0));
        let b = window((9, 0), (10, 0));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_overlapping_windows() {
        let a = window((8, 0), (9, 0));
        assert!(a.overlaps(&window((8, 59), (10, 0))));
        assert!(a.overlaps(&window((7, 0), (8, 1))));
        // 包含与被包含
        assert!(a.overlaps(&window((8, 15), (8, 30))));
        assert!(a.overlaps(&window((7, 0), (10, 0))));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_contains_is_half_open() {
        let a = window((8, 0), (9, 0));
        assert!(a.contains(at(8, 0)));
        assert!(a.contains(at(8, 59)));
        assert!(!a.contains(at(9, 0)));
    }

    #[test]
    fn test_empty_window_rejected() {
        assert!(TimeWindow::new(at(8, 0), at(8, 0)).is_err());
        assert!(TimeWindow::new(at(9, 0), at(8, 0)).is_err());
        assert!(TimeWindow::from_duration(at(8, 0), Duration::zero()).is_err());
    }

    #[test]
    fn test_is_due() {
        let now = at(8, 0);
        assert!(is_due(now - Duration::seconds(1), now));
        assert!(is_due(now, now));
        assert!(!is_due(now + Duration::milliseconds(1), now));
    }

    #[test]
    fn test_parse_booking_timestamp_with_offset() {
        let parsed = parse_booking_timestamp("2024-05-01T10:00:00+02:00").unwrap();
        assert_eq!(parsed, at(8, 0));

        let parsed = parse_booking_timestamp("2024-05-01T08:00:00.123456Z").unwrap();
        assert_eq!(parsed, at(8, 0) + Duration::milliseconds(123));
    }

    #[test]
    fn test_parse_booking_timestamp_rejects_naive() {
        let err = parse_booking_timestamp("2024-05-01T08:00:00").unwrap_err();
        assert!(matches!(err, SchedulerError::ValidationError(_)));
        assert!(parse_booking_timestamp("not a time").is_err());
    }
}

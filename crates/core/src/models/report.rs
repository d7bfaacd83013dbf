use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{impl_sqlite_text_enum, MissionOutcome};

/// 执行报告
///
/// 任务成功下发到机器人后创建，每个已启动的事件恰好对应一条。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub id: i64,
    pub robot_id: i64,
    /// 机器人控制服务返回的任务ID
    pub external_mission_id: String,
    pub mission_id: String,
    pub status: ReportStatus,
    pub start_time: DateTime<Utc>,
}

/// 待创建的报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub robot_id: i64,
    pub external_mission_id: String,
    pub mission_id: String,
    pub start_time: DateTime<Utc>,
}

/// 报告状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReportStatus {
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::InProgress => "IN_PROGRESS",
            ReportStatus::Completed => "COMPLETED",
            ReportStatus::Failed => "FAILED",
        }
    }
}

impl From<MissionOutcome> for ReportStatus {
    fn from(outcome: MissionOutcome) -> Self {
        match outcome {
            MissionOutcome::Completed => ReportStatus::Completed,
            MissionOutcome::Failed => ReportStatus::Failed,
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(ReportStatus::InProgress),
            "COMPLETED" => Ok(ReportStatus::Completed),
            "FAILED" => Ok(ReportStatus::Failed),
            _ => Err(format!("Invalid report status: {s}")),
        }
    }
}

impl_sqlite_text_enum!(ReportStatus);

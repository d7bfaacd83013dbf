use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::impl_sqlite_text_enum;

/// 机器人
///
/// 对调度器而言是只读实体：`status` 由外部遥测维护，`enabled` 由运维开关控制。
/// 通过 `host:port` 访问该机器人的控制服务。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Robot {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub status: RobotStatus,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl Robot {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: 0, // 将由存储层生成
            name: name.into(),
            host: host.into(),
            port,
            status: RobotStatus::Available,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    /// 只有处于 Available 状态的机器人可以接收新任务
    pub fn is_available(&self) -> bool {
        self.status == RobotStatus::Available
    }
}

/// 机器人状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RobotStatus {
    #[serde(rename = "AVAILABLE")]
    Available,
    #[serde(rename = "BUSY")]
    Busy,
    #[serde(rename = "OFFLINE")]
    Offline,
}

impl RobotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotStatus::Available => "AVAILABLE",
            RobotStatus::Busy => "BUSY",
            RobotStatus::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RobotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(RobotStatus::Available),
            "BUSY" => Ok(RobotStatus::Busy),
            "OFFLINE" => Ok(RobotStatus::Offline),
            _ => Err(format!("Invalid robot status: {s}")),
        }
    }
}

impl_sqlite_text_enum!(RobotStatus);

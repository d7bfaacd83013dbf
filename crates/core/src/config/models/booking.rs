use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// 预约请求未给出预估时长时使用
    pub default_event_duration_minutes: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            default_event_duration_minutes: 60,
        }
    }
}

impl BookingConfig {
    pub fn default_event_duration(&self) -> Duration {
        Duration::minutes(self.default_event_duration_minutes)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_event_duration_minutes <= 0 {
            return Err(anyhow::anyhow!("默认事件时长必须大于0"));
        }
        Ok(())
    }
}

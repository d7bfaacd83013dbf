use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
    /// 每个tick内并行处理的事件数，1 表示逐个处理
    pub max_concurrent_dispatches: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 1000,
            max_concurrent_dispatches: 1,
        }
    }
}

impl DispatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("轮询间隔必须大于0"));
        }

        if self.max_concurrent_dispatches == 0 {
            return Err(anyhow::anyhow!("最大并发调度数必须大于0"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotControlConfig {
    pub scheme: String,
    pub request_timeout_seconds: u64,
    pub max_redirects: usize,
    /// 访问机器人控制服务使用的Bearer令牌
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for RobotControlConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            request_timeout_seconds: 10,
            max_redirects: 5,
            access_token: None,
        }
    }
}

impl RobotControlConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_schemes = ["http", "https"];
        if !valid_schemes.contains(&self.scheme.as_str()) {
            return Err(anyhow::anyhow!(
                "无效的协议: {}，支持的协议: {:?}",
                self.scheme,
                valid_schemes
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("请求超时时间必须大于0"));
        }

        if matches!(&self.access_token, Some(token) if token.trim().is_empty()) {
            return Err(anyhow::anyhow!("访问令牌不能为空字符串"));
        }

        Ok(())
    }
}

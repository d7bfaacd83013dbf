//! 机器人控制服务的 HTTP 客户端
//!
//! 每台机器人在 `{scheme}://{host}:{port}` 上提供控制接口：
//! - `POST /schedule/start-mission?ID={mission_id}` → `{message, started, mission_id}`
//! - `POST /schedule/stop-mission` → `{message, stopped}`
//!
//! 请求整体受超时约束，不做重试。

use anyhow::{Context, Result};
use async_trait::async_trait;
use fleet_core::config::models::RobotControlConfig;
use fleet_core::traits::{RobotControlClient, StartMissionResponse, StopMissionResponse};
use fleet_core::RobotControlError;
use reqwest::{redirect, Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

pub struct HttpRobotControlClient {
    client: Client,
    scheme: String,
    access_token: Option<String>,
}

impl HttpRobotControlClient {
    pub fn new(config: &RobotControlConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .context("创建机器人控制HTTP客户端失败")?;

        Ok(Self {
            client,
            scheme: config.scheme.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn endpoint(&self, host: &str, port: u16, path: &str) -> String {
        format!("{}://{}:{}{}", self.scheme, host, port, path)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RobotControlError> {
        let mut request = self.client.post(url).query(query);
        if let Some(token) = self.access_token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_error)?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(
        response: Response,
    ) -> Result<T, RobotControlError> {
        let status = response.status();
        let body = response.bytes().await.map_err(classify_error)?;

        if !status.is_success() {
            return Err(RobotControlError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }

        serde_json::from_slice(&body).map_err(|e| RobotControlError::MalformedResponse(e.to_string()))
    }
}

/// 把 reqwest 错误归类为传输层失败
fn classify_error(err: reqwest::Error) -> RobotControlError {
    if err.is_timeout() {
        RobotControlError::Timeout
    } else if err.is_redirect() {
        RobotControlError::TooManyRedirects
    } else if err.is_connect() {
        RobotControlError::Connection(err.to_string())
    } else if err.is_decode() || err.is_body() {
        RobotControlError::MalformedResponse(err.to_string())
    } else {
        RobotControlError::Request(err.to_string())
    }
}

#[async_trait]
impl RobotControlClient for HttpRobotControlClient {
    async fn start_mission(
        &self,
        host: &str,
        port: u16,
        mission_id: &str,
    ) -> Result<StartMissionResponse, RobotControlError> {
        let url = self.endpoint(host, port, "/schedule/start-mission");
        debug!(url = %url, mission_id = mission_id, "请求机器人启动任务");
        self.post(&url, &[("ID", mission_id)]).await
    }

    async fn stop_mission(
        &self,
        host: &str,
        port: u16,
    ) -> Result<StopMissionResponse, RobotControlError> {
        let url = self.endpoint(host, port, "/schedule/stop-mission");
        debug!(url = %url, "请求机器人停止任务");
        self.post(&url, &[]).await
    }
}

//! 任务下发适配器
//!
//! 把机器人控制服务的响应与失败归为三类结果，供调度引擎穷尽匹配：
//! 成功拿到外部任务ID、传输层不可用、机器人在应用层拒绝。
//! 调用受超时约束，不做重试。

use std::sync::Arc;
use std::time::{Duration, Instant};

use fleet_core::traits::RobotControlClient;
use fleet_core::RobotControlError;
use fleet_infrastructure::MetricsCollector;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 2xx 且带有任务ID
    Started { external_mission_id: String },
    /// 超时、连接失败、重定向过多、响应格式错误
    Unavailable { reason: String },
    /// 机器人返回错误状态码或 `started: false`
    Rejected { reason: String },
}

pub struct DispatchClientAdapter {
    client: Arc<dyn RobotControlClient>,
    timeout: Duration,
    metrics: Arc<MetricsCollector>,
}

impl DispatchClientAdapter {
    pub fn new(
        client: Arc<dyn RobotControlClient>,
        timeout: Duration,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            client,
            timeout,
            metrics,
        }
    }

    pub async fn dispatch(&self, host: &str, port: u16, mission_id: &str) -> DispatchOutcome {
        let started_at = Instant::now();
        let result = tokio::time::timeout(
            self.timeout,
            self.client.start_mission(host, port, mission_id),
        )
        .await;
        self.metrics
            .record_robot_control_latency(started_at.elapsed().as_secs_f64());

        let outcome = match result {
            Err(_) => DispatchOutcome::Unavailable {
                reason: RobotControlError::Timeout.to_string(),
            },
            Ok(Err(e)) if e.is_transport() => DispatchOutcome::Unavailable {
                reason: e.to_string(),
            },
            Ok(Err(e)) => DispatchOutcome::Rejected {
                reason: e.to_string(),
            },
            Ok(Ok(response)) if !response.started => DispatchOutcome::Rejected {
                reason: format!("机器人拒绝启动任务: {}", response.message),
            },
            Ok(Ok(response)) => match response.mission_id.filter(|id| !id.trim().is_empty()) {
                Some(external_mission_id) => DispatchOutcome::Started {
                    external_mission_id,
                },
                None => DispatchOutcome::Unavailable {
                    reason: RobotControlError::MalformedResponse(
                        "响应中缺少mission_id".to_string(),
                    )
                    .to_string(),
                },
            },
        };

        debug!(
            host = host,
            port = port,
            mission_id = mission_id,
            outcome = ?outcome,
            "任务下发完成"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::traits::StartMissionResponse;
    use fleet_testing_utils::MockRobotControlClient;

    fn adapter(client: &MockRobotControlClient, timeout: Duration) -> DispatchClientAdapter {
        DispatchClientAdapter::new(
            Arc::new(client.clone()),
            timeout,
            Arc::new(MetricsCollector::new().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_success_returns_external_mission_id() {
        let client = MockRobotControlClient::new();
        let outcome = adapter(&client, Duration::from_secs(1))
            .dispatch("10.0.0.1", 3000, "inspect")
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Started {
                external_mission_id: "isar-inspect".to_string()
            }
        );
        let calls = client.start_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].host, "10.0.0.1");
        assert_eq!(calls[0].port, 3000);
    }

    #[tokio::test]
    async fn test_transport_failures_are_unavailable() {
        let client = MockRobotControlClient::new();
        let adapter = adapter(&client, Duration::from_secs(1));

        for error in [
            RobotControlError::Timeout,
            RobotControlError::Connection("refused".to_string()),
            RobotControlError::TooManyRedirects,
            RobotControlError::MalformedResponse("eof".to_string()),
        ] {
            client.fail_with(error);
            let outcome = adapter.dispatch("h", 1, "m").await;
            assert!(
                matches!(outcome, DispatchOutcome::Unavailable { .. }),
                "unexpected outcome: {outcome:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_error_status_is_rejection() {
        let client = MockRobotControlClient::new();
        client.fail_with(RobotControlError::Status {
            status: 409,
            message: "robot is busy".to_string(),
        });

        let outcome = adapter(&client, Duration::from_secs(1))
            .dispatch("h", 1, "m")
            .await;

        assert!(matches!(outcome, DispatchOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_not_started_is_rejection() {
        let client = MockRobotControlClient::new();
        client.respond_with(StartMissionResponse {
            message: "Robot not ready".to_string(),
            started: false,
            mission_id: None,
        });

        let outcome = adapter(&client, Duration::from_secs(1))
            .dispatch("h", 1, "m")
            .await;

        match outcome {
            DispatchOutcome::Rejected { reason } => assert!(reason.contains("Robot not ready")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_mission_id_is_unavailable() {
        let client = MockRobotControlClient::new();
        client.respond_with(StartMissionResponse {
            message: "Mission started".to_string(),
            started: true,
            mission_id: None,
        });

        let outcome = adapter(&client, Duration::from_secs(1))
            .dispatch("h", 1, "m")
            .await;

        assert!(matches!(outcome, DispatchOutcome::Unavailable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_client_is_bounded_by_timeout() {
        let client = MockRobotControlClient::new().with_delay(Duration::from_secs(30));

        let outcome = adapter(&client, Duration::from_secs(2))
            .dispatch("h", 1, "m")
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Unavailable {
                reason: RobotControlError::Timeout.to_string()
            }
        );
    }
}

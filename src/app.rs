use std::sync::Arc;

use anyhow::{Context, Result};
use fleet_api::create_app;
use fleet_core::config::AppConfig;
use fleet_core::traits::RobotControlClient;
use fleet_dispatcher::{DispatchClientAdapter, EventDispatchEngine};
use fleet_domain::{BookingService, EventStatusGateway, RobotService};
use fleet_infrastructure::{
    DatabaseManager, HttpRobotControlClient, MetricsCollector, SqliteEventRepository,
    SqliteReportRepository, SqliteRobotRepository,
};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info};

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// 仅运行事件调度引擎
    Dispatcher,
    /// 仅运行API服务器
    Api,
    /// 运行所有组件
    All,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    database: DatabaseManager,
    booking_service: Arc<BookingService>,
    robot_service: Arc<RobotService>,
    engine: Arc<EventDispatchEngine>,
    metrics: Arc<MetricsCollector>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        let robot_client: Arc<dyn RobotControlClient> = Arc::new(
            HttpRobotControlClient::new(&config.robot_control)
                .context("创建机器人控制客户端失败")?,
        );
        Self::with_robot_client(config, mode, robot_client).await
    }

    /// 使用指定的机器人控制客户端创建应用实例
    pub async fn with_robot_client(
        config: AppConfig,
        mode: AppMode,
        robot_client: Arc<dyn RobotControlClient>,
    ) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);

        info!("连接数据库: {}", mask_database_url(&config.database.url));
        let database = DatabaseManager::new(&config.database).await?;
        database.migrate().await?;
        info!("数据库连接成功");

        let pool = database.pool().clone();
        let event_repo = Arc::new(SqliteEventRepository::new(pool.clone()));
        let robot_repo = Arc::new(SqliteRobotRepository::new(pool.clone()));
        let report_repo = Arc::new(SqliteReportRepository::new(pool));

        let gateway = Arc::new(EventStatusGateway::new(event_repo.clone()));
        let metrics = Arc::new(MetricsCollector::new().context("创建指标收集器失败")?);

        let booking_service = Arc::new(BookingService::new(
            robot_repo.clone(),
            event_repo.clone(),
            report_repo,
            gateway.clone(),
            config.booking.default_event_duration(),
        ));
        let robot_service = Arc::new(RobotService::new(robot_repo.clone(), robot_client.clone()));

        let dispatcher = DispatchClientAdapter::new(
            robot_client,
            config.robot_control.request_timeout(),
            Arc::clone(&metrics),
        );
        let engine = Arc::new(EventDispatchEngine::new(
            event_repo,
            robot_repo,
            gateway,
            dispatcher,
            Arc::clone(&metrics),
            &config.dispatcher,
        ));

        Ok(Self {
            config,
            mode,
            database,
            booking_service,
            robot_service,
            engine,
            metrics,
        })
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.database
    }

    pub fn booking_service(&self) -> Arc<BookingService> {
        Arc::clone(&self.booking_service)
    }

    /// 运行应用程序直到收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        let result = match self.mode {
            AppMode::Dispatcher => {
                self.run_dispatcher(shutdown_rx).await;
                Ok(())
            }
            AppMode::Api => self.run_api(shutdown_rx).await,
            AppMode::All => self.run_all_components(shutdown_rx).await,
        };

        self.database.close().await;
        info!("数据库连接已关闭");
        result
    }

    /// 运行事件调度引擎
    async fn run_dispatcher(&self, shutdown_rx: broadcast::Receiver<()>) {
        info!("启动事件调度引擎");
        self.engine.run(shutdown_rx).await;
        info!("事件调度引擎已停止");
    }

    /// 运行API服务器
    async fn run_api(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let app = create_app(
            Arc::clone(&self.booking_service),
            Arc::clone(&self.robot_service),
            Arc::clone(&self.metrics),
            &self.config.api,
        );

        let listener = TcpListener::bind(&self.config.api.bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {}", self.config.api.bind_address))?;

        info!("API服务器启动在 http://{}", self.config.api.bind_address);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败")?;

        info!("API服务器已停止");
        Ok(())
    }

    /// 运行所有已启用的组件
    async fn run_all_components(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动所有组件");

        let dispatcher = async {
            if self.config.dispatcher.enabled {
                self.run_dispatcher(shutdown_rx.resubscribe()).await;
            }
        };

        let api = async {
            if self.config.api.enabled {
                if let Err(e) = self.run_api(shutdown_rx.resubscribe()).await {
                    error!("API服务器运行失败: {:#}", e);
                    return Err(e);
                }
            }
            Ok(())
        };

        let ((), api_result) = tokio::join!(dispatcher, api);

        info!("所有组件已停止");
        api_result
    }
}

/// 屏蔽数据库URL中的敏感信息
pub fn mask_database_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let mut masked = url.to_string();
            masked.replace_range(colon_pos + 1..at_pos, "***");
            return masked;
        }
    }
    url.to_string()
}

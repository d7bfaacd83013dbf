pub mod sqlite_event_repository;
pub mod sqlite_report_repository;
pub mod sqlite_robot_repository;

pub use sqlite_event_repository::SqliteEventRepository;
pub use sqlite_report_repository::SqliteReportRepository;
pub use sqlite_robot_repository::SqliteRobotRepository;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fleet_core::config::models::DatabaseConfig;
use fleet_core::{SchedulerError, SchedulerResult};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::time::Duration;
use tracing::info;

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut options = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connection_timeout());

        // 内存库随连接关闭而消失，连接不能被回收
        options = if config.url.contains(":memory:") {
            options.idle_timeout(None::<Duration>).max_lifetime(None::<Duration>)
        } else {
            options
                .idle_timeout(config.idle_timeout())
                .max_lifetime(Duration::from_secs(1800)) // 30分钟默认生命周期
        };

        let pool = options
            .connect(&config.url)
            .await
            .with_context(|| format!("连接数据库失败: {}", config.url))?;

        Ok(Self { pool })
    }
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("执行数据库迁移失败")?;
        info!("数据库迁移完成");
        Ok(())
    }
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub type DbPool = Pool<Sqlite>;

/// 时间统一以 UTC 毫秒时间戳存储
pub(crate) fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> SchedulerResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| SchedulerError::internal(format!("数据库中的时间戳超出范围: {millis}")))
}

use async_trait::async_trait;
use fleet_core::{
    models::{Robot, RobotStatus},
    traits::RobotRepository,
    SchedulerError, SchedulerResult,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, instrument};

use super::{from_millis, to_millis};

pub struct SqliteRobotRepository {
    pool: SqlitePool,
}

impl SqliteRobotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_robot(row: &SqliteRow) -> SchedulerResult<Robot> {
        let port: i64 = row.try_get("port")?;
        let port = u16::try_from(port)
            .map_err(|_| SchedulerError::internal(format!("数据库中的端口号无效: {port}")))?;

        Ok(Robot {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            host: row.try_get("host")?,
            port,
            status: row.try_get("status")?,
            enabled: row.try_get("enabled")?,
            created_at: from_millis(row.try_get("created_at_ms")?)?,
        })
    }
}

#[async_trait]
impl RobotRepository for SqliteRobotRepository {
    #[instrument(skip(self, robot), fields(name = %robot.name, host = %robot.host, port = robot.port))]
    async fn create(&self, robot: &Robot) -> SchedulerResult<Robot> {
        let row = sqlx::query(
            r#"
            INSERT INTO robots (name, host, port, status, enabled, created_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, name, host, port, status, enabled, created_at_ms
            "#,
        )
        .bind(&robot.name)
        .bind(&robot.host)
        .bind(i64::from(robot.port))
        .bind(robot.status)
        .bind(robot.enabled)
        .bind(to_millis(robot.created_at))
        .fetch_one(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        let created = Self::row_to_robot(&row)?;
        debug!("创建机器人成功: ID {}", created.id);
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Robot>> {
        let row = sqlx::query(
            "SELECT id, name, host, port, status, enabled, created_at_ms FROM robots WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_robot(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: i64, status: RobotStatus) -> SchedulerResult<Robot> {
        let row = sqlx::query(
            r#"
            UPDATE robots SET status = ?1 WHERE id = ?2
            RETURNING id, name, host, port, status, enabled, created_at_ms
            "#,
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        match row {
            Some(row) => Self::row_to_robot(&row),
            None => Err(SchedulerError::robot_not_found(id)),
        }
    }

    async fn set_enabled(&self, id: i64, enabled: bool) -> SchedulerResult<Robot> {
        let row = sqlx::query(
            r#"
            UPDATE robots SET enabled = ?1 WHERE id = ?2
            RETURNING id, name, host, port, status, enabled, created_at_ms
            "#,
        )
        .bind(enabled)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        match row {
            Some(row) => Self::row_to_robot(&row),
            None => Err(SchedulerError::robot_not_found(id)),
        }
    }
}

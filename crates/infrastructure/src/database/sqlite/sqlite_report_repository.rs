use async_trait::async_trait;
use fleet_core::{
    models::{Report, ReportStatus},
    traits::ReportRepository,
    SchedulerError, SchedulerResult,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, instrument};

use super::from_millis;

pub struct SqliteReportRepository {
    pool: SqlitePool,
}

impl SqliteReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn row_to_report(row: &SqliteRow) -> SchedulerResult<Report> {
        Ok(Report {
            id: row.try_get("id")?,
            robot_id: row.try_get("robot_id")?,
            external_mission_id: row.try_get("external_mission_id")?,
            mission_id: row.try_get("mission_id")?,
            status: row.try_get("status")?,
            start_time: from_millis(row.try_get("start_time_ms")?)?,
        })
    }
}

#[async_trait]
impl ReportRepository for SqliteReportRepository {
    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Report>> {
        let row = sqlx::query(
            "SELECT id, robot_id, external_mission_id, mission_id, status, start_time_ms
             FROM reports WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_report(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_robot_id(&self, robot_id: i64) -> SchedulerResult<Vec<Report>> {
        let rows = sqlx::query(
            "SELECT id, robot_id, external_mission_id, mission_id, status, start_time_ms
             FROM reports WHERE robot_id = ?1 ORDER BY id ASC",
        )
        .bind(robot_id)
        .fetch_all(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        rows.iter().map(Self::row_to_report).collect()
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: i64, status: ReportStatus) -> SchedulerResult<Report> {
        let row = sqlx::query(
            r#"
            UPDATE reports SET status = ?1 WHERE id = ?2
            RETURNING id, robot_id, external_mission_id, mission_id, status, start_time_ms
            "#,
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        match row {
            Some(row) => {
                debug!("更新报告状态成功: ID {}, 状态 {}", id, status);
                Self::row_to_report(&row)
            }
            None => Err(SchedulerError::report_not_found(id)),
        }
    }
}

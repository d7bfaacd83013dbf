use async_trait::async_trait;
use chrono::{Duration, Utc};
use fleet_core::{
    models::{Event, EventStatus, MissionOutcome, NewEvent, NewReport, Report, ReportStatus},
    traits::EventRepository,
    SchedulerError, SchedulerResult, TimeWindow,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, instrument};

use super::{from_millis, sqlite_report_repository::SqliteReportRepository, to_millis};

pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: &SqliteRow) -> SchedulerResult<Event> {
        Ok(Event {
            id: row.try_get("id")?,
            robot_id: row.try_get("robot_id")?,
            mission_id: row.try_get("mission_id")?,
            start_time: from_millis(row.try_get("start_time_ms")?)?,
            estimated_duration: Duration::milliseconds(row.try_get("estimated_duration_ms")?),
            end_time: from_millis(row.try_get("end_time_ms")?)?,
            status: row.try_get("status")?,
            report_id: row.try_get("report_id")?,
            version: row.try_get("version")?,
            created_at: from_millis(row.try_get("created_at_ms")?)?,
        })
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    /// 重叠检查与插入在同一条语句中完成
    #[instrument(skip(self, event), fields(
        robot_id = event.robot_id,
        mission_id = %event.mission_id,
        start_time = %event.start_time,
    ))]
    async fn create(&self, event: &NewEvent) -> SchedulerResult<Event> {
        let start_ms = to_millis(event.start_time);
        let end_ms = to_millis(event.end_time());

        let row = sqlx::query(
            r#"
            INSERT INTO events (robot_id, mission_id, start_time_ms, estimated_duration_ms,
                                end_time_ms, status, version, created_at_ms)
            SELECT ?1, ?2, ?3, ?4, ?5, 'PENDING', 0, ?6
            WHERE NOT EXISTS (
                SELECT 1 FROM events
                WHERE robot_id = ?1 AND start_time_ms < ?5 AND end_time_ms > ?3
            )
            RETURNING id, robot_id, mission_id, start_time_ms, estimated_duration_ms,
                      end_time_ms, status, report_id, version, created_at_ms
            "#,
        )
        .bind(event.robot_id)
        .bind(&event.mission_id)
        .bind(start_ms)
        .bind(event.estimated_duration.num_milliseconds())
        .bind(end_ms)
        .bind(to_millis(Utc::now()))
        .fetch_optional(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        match row {
            Some(row) => {
                let created = Self::row_to_event(&row)?;
                debug!("创建事件成功: ID {}", created.id);
                Ok(created)
            }
            None => {
                let conflicts = self.get_overlapping(event.robot_id, &event.window()).await?;
                Err(SchedulerError::conflict(
                    event.robot_id,
                    conflicts.iter().map(|e| e.id).collect(),
                ))
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> SchedulerResult<Option<Event>> {
        let row = sqlx::query(
            "SELECT id, robot_id, mission_id, start_time_ms, estimated_duration_ms,
                    end_time_ms, status, report_id, version, created_at_ms
             FROM events WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_event(&row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn get_by_status(&self, status: EventStatus) -> SchedulerResult<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT id, robot_id, mission_id, start_time_ms, estimated_duration_ms,
                    end_time_ms, status, report_id, version, created_at_ms
             FROM events WHERE status = ?1 ORDER BY start_time_ms ASC, id ASC",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        rows.iter().map(Self::row_to_event).collect()
    }

    async fn get_overlapping(
        &self,
        robot_id: i64,
        window: &TimeWindow,
    ) -> SchedulerResult<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT id, robot_id, mission_id, start_time_ms, estimated_duration_ms,
                    end_time_ms, status, report_id, version, created_at_ms
             FROM events
             WHERE robot_id = ?1 AND start_time_ms < ?2 AND end_time_ms > ?3
             ORDER BY start_time_ms ASC, id ASC",
        )
        .bind(robot_id)
        .bind(to_millis(window.end))
        .bind(to_millis(window.start))
        .fetch_all(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        rows.iter().map(Self::row_to_event).collect()
    }

    #[instrument(skip(self))]
    async fn compare_and_set_status(
        &self,
        id: i64,
        expected_version: i64,
        status: EventStatus,
    ) -> SchedulerResult<Option<Event>> {
        let row = sqlx::query(
            r#"
            UPDATE events SET status = ?1, version = version + 1
            WHERE id = ?2 AND version = ?3
            RETURNING id, robot_id, mission_id, start_time_ms, estimated_duration_ms,
                      end_time_ms, status, report_id, version, created_at_ms
            "#,
        )
        .bind(status)
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(SchedulerError::Database)?;

        row.as_ref().map(Self::row_to_event).transpose()
    }

    /// 报告插入与状态更新在同一事务中，前置条件不满足时整体回滚
    #[instrument(skip(self, report), fields(external_mission_id = %report.external_mission_id))]
    async fn start_with_report(
        &self,
        id: i64,
        expected_version: i64,
        report: &NewReport,
    ) -> SchedulerResult<Option<(Event, Report)>> {
        let mut tx = self.pool.begin().await.map_err(SchedulerError::Database)?;

        let report_row = sqlx::query(
            r#"
            INSERT INTO reports (robot_id, external_mission_id, mission_id, status, start_time_ms)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, robot_id, external_mission_id, mission_id, status, start_time_ms
            "#,
        )
        .bind(report.robot_id)
        .bind(&report.external_mission_id)
        .bind(&report.mission_id)
        .bind(ReportStatus::InProgress)
        .bind(to_millis(report.start_time))
        .fetch_one(&mut *tx)
        .await
        .map_err(SchedulerError::Database)?;
        let created_report = SqliteReportRepository::row_to_report(&report_row)?;

        let event_row = sqlx::query(
            r#"
            UPDATE events SET status = ?1, report_id = ?2, version = version + 1
            WHERE id = ?3 AND version = ?4 AND status = ?5
            RETURNING id, robot_id, mission_id, start_time_ms, estimated_duration_ms,
                      end_time_ms, status, report_id, version, created_at_ms
            "#,
        )
        .bind(EventStatus::Started)
        .bind(created_report.id)
        .bind(id)
        .bind(expected_version)
        .bind(EventStatus::Pending)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SchedulerError::Database)?;

        match event_row {
            Some(row) => {
                let started = Self::row_to_event(&row)?;
                tx.commit().await.map_err(SchedulerError::Database)?;
                debug!(
                    "事件已启动: ID {}, 报告 ID {}",
                    started.id, created_report.id
                );
                Ok(Some((started, created_report)))
            }
            None => {
                tx.rollback().await.map_err(SchedulerError::Database)?;
                debug!("事件 {} 前置条件不满足，已回滚", id);
                Ok(None)
            }
        }
    }

    /// 事件终态与报告状态在同一事务中写入
    #[instrument(skip(self))]
    async fn complete_with_report(
        &self,
        id: i64,
        expected_version: i64,
        outcome: MissionOutcome,
    ) -> SchedulerResult<Option<(Event, Option<Report>)>> {
        let mut tx = self.pool.begin().await.map_err(SchedulerError::Database)?;

        let event_row = sqlx::query(
            r#"
            UPDATE events SET status = ?1, version = version + 1
            WHERE id = ?2 AND version = ?3 AND status = ?4
            RETURNING id, robot_id, mission_id, start_time_ms, estimated_duration_ms,
                      end_time_ms, status, report_id, version, created_at_ms
            "#,
        )
        .bind(outcome.event_status())
        .bind(id)
        .bind(expected_version)
        .bind(EventStatus::Started)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SchedulerError::Database)?;

        let completed = match event_row {
            Some(row) => Self::row_to_event(&row)?,
            None => {
                tx.rollback().await.map_err(SchedulerError::Database)?;
                debug!("事件 {} 前置条件不满足，已回滚", id);
                return Ok(None);
            }
        };

        let report = match completed.report_id {
            Some(report_id) => {
                let report_row = sqlx::query(
                    r#"
                    UPDATE reports SET status = ?1 WHERE id = ?2
                    RETURNING id, robot_id, external_mission_id, mission_id, status, start_time_ms
                    "#,
                )
                .bind(ReportStatus::from(outcome))
                .bind(report_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(SchedulerError::Database)?;

                match report_row {
                    Some(row) => Some(SqliteReportRepository::row_to_report(&row)?),
                    None => {
                        tx.rollback().await.map_err(SchedulerError::Database)?;
                        return Err(SchedulerError::report_not_found(report_id));
                    }
                }
            }
            None => None,
        };

        tx.commit().await.map_err(SchedulerError::Database)?;
        debug!("事件已结束: ID {}, 状态 {}", completed.id, completed.status);
        Ok(Some((completed, report)))
    }

    async fn delete_if_status(&self, id: i64, status: EventStatus) -> SchedulerResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?1 AND status = ?2")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(SchedulerError::Database)?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            debug!("删除事件成功: ID {}", id);
        }
        Ok(deleted)
    }
}

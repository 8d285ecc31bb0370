//! Service bays repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::service_bay::{ScheduleDetails, ServiceBay, ServiceBaySchedule},
    repository::violated_constraint,
};

#[derive(Clone)]
pub struct ServiceBaysRepository {
    pool: Pool<Postgres>,
}

impl ServiceBaysRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Active bay by id within a dealership
    pub async fn get_active_bay(&self, bay_id: i64, dn: &str) -> AppResult<ServiceBay> {
        sqlx::query_as::<_, ServiceBay>(
            "SELECT * FROM service_bays WHERE id = $1 AND dn = $2 AND active",
        )
        .bind(bay_id)
        .bind(dn)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::ServiceBayNotFound(bay_id))
    }

    /// Whether another active schedule on this bay overlaps [start, end)
    pub async fn overlap_exists(
        &self,
        bay_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM service_bay_schedules
                WHERE service_bay_id = $1 AND active
                  AND tstzrange(start_date, end_date) && tstzrange($2, $3)
            )
            "#,
        )
        .bind(bay_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Whether the occurrence already has an active schedule
    pub async fn active_exists_for_occurrence(&self, occurrence_uuid: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM service_bay_schedules WHERE occurrence_uuid = $1 AND active)",
        )
        .bind(occurrence_uuid)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a new active schedule. The exclusion/unique constraints are
    /// the authoritative guard; their violations map to the same domain
    /// errors the check-then-act path raises.
    pub async fn insert_schedule(
        &self,
        bay_id: i64,
        occurrence_uuid: Uuid,
        dn: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actor: Option<&str>,
    ) -> AppResult<ServiceBaySchedule> {
        let inserted = sqlx::query_as::<_, ServiceBaySchedule>(
            r#"
            INSERT INTO service_bay_schedules
                (service_bay_id, occurrence_uuid, dn, start_date, end_date, active, created_by)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            RETURNING *
            "#,
        )
        .bind(bay_id)
        .bind(occurrence_uuid)
        .bind(dn)
        .bind(start)
        .bind(end)
        .bind(actor)
        .fetch_one(&self.pool)
        .await;

        inserted.map_err(|e| match violated_constraint(&e).as_deref() {
            Some("schedules_no_bay_overlap") => AppError::ServiceBayConflict,
            Some("schedules_one_active_per_occurrence") => {
                AppError::ServiceBayWithOccurrenceExists
            }
            _ => e.into(),
        })
    }

    /// Schedules overlapping [start, end) for a dealership, optionally
    /// restricted to a bay subset, joined with the linked occurrence's
    /// vehicle identity and open/closed state.
    pub async fn list(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        dn: &str,
        bay_ids: Option<&[i64]>,
    ) -> AppResult<Vec<ScheduleDetails>> {
        let mut qb = sqlx::QueryBuilder::<Postgres>::new(
            r#"
            SELECT sch.id, sch.service_bay_id, b.name AS bay_name, sch.dn,
                   sch.start_date, sch.end_date, sch.active,
                   o.uuid AS occurrence_uuid, o.chassis,
                   o.vehicle->>'plate' AS plate, o.vehicle->>'model' AS model,
                   (o.end_date IS NOT NULL) AS occurrence_closed
            FROM service_bay_schedules sch
            JOIN service_bays b ON b.id = sch.service_bay_id
            JOIN occurrences o ON o.uuid = sch.occurrence_uuid
            WHERE sch.dn = "#,
        );
        qb.push_bind(dn);
        qb.push(" AND tstzrange(sch.start_date, sch.end_date) && tstzrange(");
        qb.push_bind(start);
        qb.push(", ");
        qb.push_bind(end);
        qb.push(")");
        if let Some(bay_ids) = bay_ids {
            qb.push(" AND sch.service_bay_id = ANY(");
            qb.push_bind(bay_ids.to_vec());
            qb.push(")");
        }
        qb.push(" ORDER BY sch.start_date, sch.service_bay_id");

        let rows = qb.build().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| ScheduleDetails {
                id: row.get("id"),
                service_bay_id: row.get("service_bay_id"),
                bay_name: row.get("bay_name"),
                dn: row.get("dn"),
                start_date: row.get("start_date"),
                end_date: row.get("end_date"),
                active: row.get("active"),
                occurrence_uuid: row.get("occurrence_uuid"),
                chassis: row.get("chassis"),
                plate: row.get("plate"),
                model: row.get("model"),
                occurrence_closed: row.get("occurrence_closed"),
            })
            .collect())
    }

    /// Deactivate a schedule for a dealership
    pub async fn cancel(&self, schedule_id: i64, dn: &str) -> AppResult<ServiceBaySchedule> {
        sqlx::query_as::<_, ServiceBaySchedule>(
            r#"
            UPDATE service_bay_schedules
            SET active = FALSE
            WHERE id = $1 AND dn = $2 AND active
            RETURNING *
            "#,
        )
        .bind(schedule_id)
        .bind(dn)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::ScheduleNotFound(schedule_id.to_string()))
    }

    /// Active schedule of an occurrence within a dealership
    pub async fn get_by_occurrence(
        &self,
        occurrence_uuid: Uuid,
        dn: &str,
    ) -> AppResult<ServiceBaySchedule> {
        sqlx::query_as::<_, ServiceBaySchedule>(
            "SELECT * FROM service_bay_schedules WHERE occurrence_uuid = $1 AND dn = $2 AND active",
        )
        .bind(occurrence_uuid)
        .bind(dn)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::ScheduleNotFound(occurrence_uuid.to_string()))
    }

    /// Active schedule of an occurrence, if any (details view)
    pub async fn find_active_for_occurrence(
        &self,
        occurrence_uuid: Uuid,
    ) -> AppResult<Option<ServiceBaySchedule>> {
        let schedule = sqlx::query_as::<_, ServiceBaySchedule>(
            "SELECT * FROM service_bay_schedules WHERE occurrence_uuid = $1 AND active",
        )
        .bind(occurrence_uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(schedule)
    }
}

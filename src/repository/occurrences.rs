//! Occurrences repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{occurrence::Occurrence, step::StepId},
    repository::violated_constraint,
};

/// Patch applied to the current step during an aggregate update.
#[derive(Debug, Clone, Default)]
pub struct StepPatch {
    pub report: Option<String>,
    pub estimated_time: Option<i32>,
    pub observation: Option<String>,
}

impl StepPatch {
    pub fn is_empty(&self) -> bool {
        self.report.is_none() && self.estimated_time.is_none() && self.observation.is_none()
    }
}

#[derive(Clone)]
pub struct OccurrencesRepository {
    pool: Pool<Postgres>,
}

impl OccurrencesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get occurrence by uuid
    pub async fn get_by_uuid(&self, uuid: Uuid) -> AppResult<Occurrence> {
        sqlx::query_as::<_, Occurrence>("SELECT * FROM occurrences WHERE uuid = $1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::OccurrenceNotFound(uuid.to_string()))
    }

    /// Get occurrence by external occurrence number, if present
    pub async fn find_by_os_number(&self, os_number: &str) -> AppResult<Option<Occurrence>> {
        let occurrence =
            sqlx::query_as::<_, Occurrence>("SELECT * FROM occurrences WHERE os_number = $1")
                .bind(os_number)
                .fetch_optional(&self.pool)
                .await?;
        Ok(occurrence)
    }

    /// Whether the chassis already has an open occurrence
    pub async fn has_open_for_chassis(&self, chassis: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM occurrences WHERE chassis = $1 AND end_date IS NULL)",
        )
        .bind(chassis)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert the aggregate row together with its first step, atomically.
    ///
    /// The partial unique index on open chassis backs up the service-level
    /// uniqueness check; a violation maps to `OccurrenceNotFinished`.
    pub async fn create(&self, occ: &Occurrence) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO occurrences (
                uuid, os_number, protocol_number, chassis, current_step, criticality,
                status, observation, report, solution_proposed, country,
                occurrence_type, main_occurrence, source, campaign,
                vehicle, driver, dealership, part_order, dtcs, extra_lists,
                dn, asset_id, account_id, schedule_uuid,
                created_by, updated_by, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29
            )
            "#,
        )
        .bind(occ.uuid)
        .bind(&occ.os_number)
        .bind(&occ.protocol_number)
        .bind(&occ.chassis)
        .bind(&occ.current_step)
        .bind(occ.criticality)
        .bind(&occ.status)
        .bind(&occ.observation)
        .bind(&occ.report)
        .bind(&occ.solution_proposed)
        .bind(&occ.country)
        .bind(&occ.occurrence_type)
        .bind(&occ.main_occurrence)
        .bind(&occ.source)
        .bind(occ.campaign)
        .bind(&occ.vehicle)
        .bind(&occ.driver)
        .bind(&occ.dealership)
        .bind(&occ.part_order)
        .bind(&occ.dtcs)
        .bind(&occ.extra_lists)
        .bind(&occ.dn)
        .bind(&occ.asset_id)
        .bind(&occ.account_id)
        .bind(occ.schedule_uuid)
        .bind(&occ.created_by)
        .bind(&occ.updated_by)
        .bind(occ.created_at)
        .bind(occ.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if violated_constraint(&e).as_deref() == Some("occurrences_open_chassis") {
                return Err(AppError::OccurrenceNotFinished(occ.chassis.clone()));
            }
            return Err(e.into());
        }

        sqlx::query(
            r#"
            INSERT INTO occurrence_steps
                (occurrence_uuid, step_id, dt_start, latest, created_by)
            VALUES ($1, $2, $3, 1, $4)
            "#,
        )
        .bind(occ.uuid)
        .bind(StepId::Ticke.code())
        .bind(occ.created_at)
        .bind(&occ.created_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Store the protocol number returned by the ticketing integration
    pub async fn set_protocol_number(&self, uuid: Uuid, protocol_number: &str) -> AppResult<()> {
        sqlx::query("UPDATE occurrences SET protocol_number = $1, updated_at = NOW() WHERE uuid = $2")
            .bind(protocol_number)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Write back the merged mutable fields of the aggregate, together with
    /// the optional patch to the current step, atomically.
    pub async fn update(&self, occ: &Occurrence, step_patch: &StepPatch) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE occurrences SET
                criticality = $2, status = $3, observation = $4, report = $5,
                solution_proposed = $6, occurrence_type = $7, main_occurrence = $8,
                source = $9, campaign = $10, vehicle = $11, driver = $12,
                dealership = $13, part_order = $14, dtcs = $15, extra_lists = $16,
                dn = $17, updated_by = $18, updated_at = $19
            WHERE uuid = $1
            "#,
        )
        .bind(occ.uuid)
        .bind(occ.criticality)
        .bind(&occ.status)
        .bind(&occ.observation)
        .bind(&occ.report)
        .bind(&occ.solution_proposed)
        .bind(&occ.occurrence_type)
        .bind(&occ.main_occurrence)
        .bind(&occ.source)
        .bind(occ.campaign)
        .bind(&occ.vehicle)
        .bind(&occ.driver)
        .bind(&occ.dealership)
        .bind(&occ.part_order)
        .bind(&occ.dtcs)
        .bind(&occ.extra_lists)
        .bind(&occ.dn)
        .bind(&occ.updated_by)
        .bind(occ.updated_at)
        .execute(&mut *tx)
        .await?;

        if !step_patch.is_empty() {
            sqlx::query(
                r#"
                UPDATE occurrence_steps SET
                    report = COALESCE($2, report),
                    estimated_time = COALESCE($3, estimated_time),
                    observation = COALESCE($4, observation),
                    updated_by = $5,
                    updated_at = $6
                WHERE occurrence_uuid = $1 AND latest = 1
                "#,
            )
            .bind(occ.uuid)
            .bind(&step_patch.report)
            .bind(step_patch.estimated_time)
            .bind(&step_patch.observation)
            .bind(&occ.updated_by)
            .bind(occ.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Close the occurrence: stamp dt_end on the current step and end_date
    /// on the aggregate, with the same instant, atomically.
    pub async fn finalize(
        &self,
        uuid: Uuid,
        now: DateTime<Utc>,
        reason_type: Option<&str>,
        reason_description: Option<&str>,
    ) -> AppResult<DateTime<Utc>> {
        let mut tx = self.pool.begin().await?;

        let step_id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM occurrence_steps WHERE occurrence_uuid = $1 AND latest = 1 FOR UPDATE",
        )
        .bind(uuid)
        .fetch_optional(&mut *tx)
        .await?;

        let step_id = step_id.ok_or(AppError::NoCurrentStep)?;

        sqlx::query("UPDATE occurrence_steps SET dt_end = $1, updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(step_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE occurrences SET
                end_date = $2,
                finalization_reason_type = $3,
                finalization_reason_description = $4,
                updated_at = $2
            WHERE uuid = $1
            "#,
        )
        .bind(uuid)
        .bind(now)
        .bind(reason_type)
        .bind(reason_description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(now)
    }

    /// Hard delete; child records cascade.
    pub async fn delete_by_uuid(&self, uuid: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM occurrences WHERE uuid = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::OccurrenceNotFound(uuid.to_string()));
        }
        Ok(())
    }

    /// Occurrences created inside the window that still have zero steps.
    /// Selection query of the background reconciliation job.
    pub async fn find_stepless_in_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<Uuid>> {
        let uuids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT o.uuid
            FROM occurrences o
            WHERE o.created_at >= $1 AND o.created_at <= $2
              AND NOT EXISTS (
                  SELECT 1 FROM occurrence_steps s WHERE s.occurrence_uuid = o.uuid
              )
            ORDER BY o.created_at
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(uuids)
    }
}

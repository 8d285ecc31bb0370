//! Steps repository: step history and transition transactions

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::step::{Step, StepId, TransitionResult},
};

/// Seed copied from the most recent prior visit to a step.
#[derive(Debug, Clone, Default)]
struct StepSeed {
    estimated_time: Option<i32>,
    report: Option<String>,
    observation: Option<String>,
    expected_dt_end: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct StepsRepository {
    pool: Pool<Postgres>,
}

impl StepsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Current step of an occurrence (the one with latest = 1)
    pub async fn latest(&self, occurrence_uuid: Uuid) -> AppResult<Option<Step>> {
        let step = sqlx::query_as::<_, Step>(
            "SELECT * FROM occurrence_steps WHERE occurrence_uuid = $1 AND latest = 1",
        )
        .bind(occurrence_uuid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(step)
    }

    /// Full step history, oldest first
    pub async fn list(&self, occurrence_uuid: Uuid) -> AppResult<Vec<Step>> {
        let steps = sqlx::query_as::<_, Step>(
            "SELECT * FROM occurrence_steps WHERE occurrence_uuid = $1 ORDER BY dt_start, id",
        )
        .bind(occurrence_uuid)
        .fetch_all(&self.pool)
        .await?;
        Ok(steps)
    }

    /// Whether a step of this id has been closed at least once
    pub async fn has_closed(&self, occurrence_uuid: Uuid, step: StepId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM occurrence_steps
                WHERE occurrence_uuid = $1 AND step_id = $2 AND dt_end IS NOT NULL
            )
            "#,
        )
        .bind(occurrence_uuid)
        .bind(step.code())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn seed_from_last_visit<'e, E>(
        executor: E,
        occurrence_uuid: Uuid,
        step: StepId,
    ) -> AppResult<StepSeed>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query(
            r#"
            SELECT estimated_time, report, observation, expected_dt_end
            FROM occurrence_steps
            WHERE occurrence_uuid = $1 AND step_id = $2
            ORDER BY dt_start DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(occurrence_uuid)
        .bind(step.code())
        .fetch_optional(executor)
        .await?;

        Ok(match row {
            Some(row) => StepSeed {
                estimated_time: row.get("estimated_time"),
                report: row.get("report"),
                observation: row.get("observation"),
                expected_dt_end: row.get("expected_dt_end"),
            },
            None => StepSeed::default(),
        })
    }

    /// Move the occurrence to a new step.
    ///
    /// Closes the current step (latest = 0, dt_end stamped if unset), seeds
    /// the new step from the most recent prior visit to the target id, and
    /// mirrors the target onto the aggregate's current_step. When the
    /// occurrence is closed and sitting on the terminal step, leaving it
    /// reopens the occurrence by clearing end_date.
    pub async fn transition(
        &self,
        occurrence_uuid: Uuid,
        target: StepId,
        was_closed_on_terminal: bool,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<TransitionResult> {
        let mut tx = self.pool.begin().await?;

        let current_id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM occurrence_steps WHERE occurrence_uuid = $1 AND latest = 1 FOR UPDATE",
        )
        .bind(occurrence_uuid)
        .fetch_optional(&mut *tx)
        .await?;

        let current_id = current_id.ok_or(AppError::NoCurrentStep)?;

        if was_closed_on_terminal {
            sqlx::query("UPDATE occurrences SET end_date = NULL WHERE uuid = $1")
                .bind(occurrence_uuid)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            UPDATE occurrence_steps
            SET latest = 0, dt_end = COALESCE(dt_end, $2), updated_by = $3, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(current_id)
        .bind(now)
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        let seed = Self::seed_from_last_visit(&mut *tx, occurrence_uuid, target).await?;

        sqlx::query(
            r#"
            INSERT INTO occurrence_steps
                (occurrence_uuid, step_id, dt_start, estimated_time, expected_dt_end,
                 report, observation, latest, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8)
            "#,
        )
        .bind(occurrence_uuid)
        .bind(target.code())
        .bind(now)
        .bind(seed.estimated_time)
        .bind(seed.expected_dt_end)
        .bind(&seed.report)
        .bind(&seed.observation)
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE occurrences SET current_step = $2, updated_at = $3 WHERE uuid = $1")
            .bind(occurrence_uuid)
            .bind(target.code())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(TransitionResult {
            step_id: target,
            estimated_time: seed.estimated_time,
            report: seed.report,
            observation: seed.observation,
            dt_start: now,
            expected_dt_end: seed.expected_dt_end,
        })
    }

    /// Lower-level variant used by the scheduling integration: closes one
    /// specific step record by its own id (when given), then opens a new
    /// step of the target id.
    pub async fn change_step_by_ids(
        &self,
        occurrence_uuid: Uuid,
        from_step_record_id: Option<i64>,
        target: StepId,
        actor: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<TransitionResult> {
        let mut tx = self.pool.begin().await?;

        if let Some(from_id) = from_step_record_id {
            let result = sqlx::query(
                r#"
                UPDATE occurrence_steps
                SET dt_end = COALESCE(dt_end, $3), updated_by = $4, updated_at = $3
                WHERE id = $1 AND occurrence_uuid = $2
                "#,
            )
            .bind(from_id)
            .bind(occurrence_uuid)
            .bind(now)
            .bind(actor)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::StepRecordNotFound(from_id));
            }
        }

        sqlx::query("UPDATE occurrence_steps SET latest = 0 WHERE occurrence_uuid = $1 AND latest = 1")
            .bind(occurrence_uuid)
            .execute(&mut *tx)
            .await?;

        let seed = Self::seed_from_last_visit(&mut *tx, occurrence_uuid, target).await?;

        sqlx::query(
            r#"
            INSERT INTO occurrence_steps
                (occurrence_uuid, step_id, dt_start, estimated_time, expected_dt_end,
                 report, observation, latest, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8)
            "#,
        )
        .bind(occurrence_uuid)
        .bind(target.code())
        .bind(now)
        .bind(seed.estimated_time)
        .bind(seed.expected_dt_end)
        .bind(&seed.report)
        .bind(&seed.observation)
        .bind(actor)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE occurrences SET current_step = $2, updated_at = $3 WHERE uuid = $1")
            .bind(occurrence_uuid)
            .bind(target.code())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(TransitionResult {
            step_id: target,
            estimated_time: seed.estimated_time,
            report: seed.report,
            observation: seed.observation,
            dt_start: now,
            expected_dt_end: seed.expected_dt_end,
        })
    }

    /// Open the initial step for a stepless occurrence. Idempotent: the
    /// partial unique index on (occurrence_uuid) WHERE latest = 1 turns a
    /// concurrent create-time insert into a no-op here.
    pub async fn open_initial(&self, occurrence_uuid: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO occurrence_steps (occurrence_uuid, step_id, dt_start, latest)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (occurrence_uuid) WHERE latest = 1 DO NOTHING
            "#,
        )
        .bind(occurrence_uuid)
        .bind(StepId::Ticke.code())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let opened = result.rows_affected() > 0;
        if opened {
            sqlx::query("UPDATE occurrences SET current_step = $2, updated_at = $3 WHERE uuid = $1")
                .bind(occurrence_uuid)
                .bind(StepId::Ticke.code())
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(opened)
    }
}

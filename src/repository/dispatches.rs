//! Dispatches repository for database operations
//!
//! Every transition is a single guarded UPDATE scoped to the expected
//! current status; zero affected rows means the dispatch either does not
//! exist or is not in that status, and both yield `DispatchNotFound`.

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::dispatch::{Dispatch, DispatchStatus},
};

#[derive(Clone)]
pub struct DispatchesRepository {
    pool: Pool<Postgres>,
}

impl DispatchesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new dispatch and overwrite the occurrence's dealership dn
    /// with the dispatch target, atomically.
    pub async fn create(&self, dispatch: &Dispatch) -> AppResult<Dispatch> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Dispatch>(
            r#"
            INSERT INTO dispatches
                (dispatch_uuid, occurrence_uuid, status, occurrence_type, payer,
                 authorize_payment, route, dn, driver)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(dispatch.dispatch_uuid)
        .bind(dispatch.occurrence_uuid)
        .bind(&dispatch.status)
        .bind(&dispatch.occurrence_type)
        .bind(&dispatch.payer)
        .bind(dispatch.authorize_payment)
        .bind(&dispatch.route)
        .bind(&dispatch.dn)
        .bind(&dispatch.driver)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE occurrences
            SET dn = $2,
                dealership = jsonb_set(COALESCE(dealership, '{}'::jsonb), '{dn}', to_jsonb($2::text)),
                updated_at = NOW()
            WHERE uuid = $1
            "#,
        )
        .bind(dispatch.occurrence_uuid)
        .bind(&dispatch.dn)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// All dispatches of an occurrence, newest first
    pub async fn list(&self, occurrence_uuid: Uuid) -> AppResult<Vec<Dispatch>> {
        let dispatches = sqlx::query_as::<_, Dispatch>(
            "SELECT * FROM dispatches WHERE occurrence_uuid = $1 ORDER BY created_at DESC",
        )
        .bind(occurrence_uuid)
        .fetch_all(&self.pool)
        .await?;
        Ok(dispatches)
    }

    /// Cancel: WAITING_DEALERSHIP -> UNAVAILABLE with a refusal reason
    pub async fn cancel(
        &self,
        occurrence_uuid: Uuid,
        dispatch_uuid: Uuid,
        reason_refusal: &str,
        description_refusal: Option<&str>,
    ) -> AppResult<Dispatch> {
        sqlx::query_as::<_, Dispatch>(
            r#"
            UPDATE dispatches
            SET status = $4, reason_refusal = $5, description_refusal = $6, updated_at = NOW()
            WHERE dispatch_uuid = $1 AND occurrence_uuid = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(dispatch_uuid)
        .bind(occurrence_uuid)
        .bind(DispatchStatus::WaitingDealership.code())
        .bind(DispatchStatus::Unavailable.code())
        .bind(reason_refusal)
        .bind(description_refusal)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::DispatchNotFound)
    }

    /// Make available: WAITING_DEALERSHIP -> AVAILABLE
    pub async fn make_available(
        &self,
        occurrence_uuid: Uuid,
        dispatch_uuid: Uuid,
    ) -> AppResult<Dispatch> {
        sqlx::query_as::<_, Dispatch>(
            r#"
            UPDATE dispatches
            SET status = $4, updated_at = NOW()
            WHERE dispatch_uuid = $1 AND occurrence_uuid = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(dispatch_uuid)
        .bind(occurrence_uuid)
        .bind(DispatchStatus::WaitingDealership.code())
        .bind(DispatchStatus::Available.code())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::DispatchNotFound)
    }

    /// Assign a driver to an AVAILABLE dispatch; status is unchanged
    pub async fn assign_driver(
        &self,
        occurrence_uuid: Uuid,
        dispatch_uuid: Uuid,
        driver: &str,
    ) -> AppResult<Dispatch> {
        sqlx::query_as::<_, Dispatch>(
            r#"
            UPDATE dispatches
            SET driver = $4, updated_at = NOW()
            WHERE dispatch_uuid = $1 AND occurrence_uuid = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(dispatch_uuid)
        .bind(occurrence_uuid)
        .bind(DispatchStatus::Available.code())
        .bind(driver)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::DispatchNotFound)
    }
}

//! Dealerships repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::occurrence::Dealership,
};

/// Sentinel used for placeholder dealerships auto-created by the import path.
pub const NOT_INFORMED: &str = "NOT INFORMED";

#[derive(Clone)]
pub struct DealershipsRepository {
    pool: Pool<Postgres>,
}

impl DealershipsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get dealership by dn, if present
    pub async fn find_by_dn(&self, dn: &str) -> AppResult<Option<Dealership>> {
        let dealership = sqlx::query_as::<_, Dealership>("SELECT * FROM dealerships WHERE dn = $1")
            .bind(dn)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dealership)
    }

    /// Get dealership by dn, failing when it does not resolve
    pub async fn require_by_dn(&self, dn: &str) -> AppResult<Dealership> {
        self.find_by_dn(dn)
            .await?
            .ok_or_else(|| AppError::DealershipNotFound(dn.to_string()))
    }

    /// Ensure a dealership exists, creating a placeholder record with
    /// sentinel fields when absent. Deliberate upsert used by the importer.
    pub async fn ensure_exists(&self, dn: &str) -> AppResult<Dealership> {
        sqlx::query(
            r#"
            INSERT INTO dealerships (dn, company_name, fantasy_name)
            VALUES ($1, $2, $2)
            ON CONFLICT (dn) DO NOTHING
            "#,
        )
        .bind(dn)
        .bind(NOT_INFORMED)
        .execute(&self.pool)
        .await?;

        self.require_by_dn(dn).await
    }
}

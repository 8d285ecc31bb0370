//! Reviews repository for database operations

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::review::Review,
    repository::violated_constraint,
};

#[derive(Clone)]
pub struct ReviewsRepository {
    pool: Pool<Postgres>,
}

impl ReviewsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a review; one per (occurrence, step)
    pub async fn create(
        &self,
        occurrence_uuid: Uuid,
        step_id: &str,
        rating: Option<i16>,
        comment: Option<&str>,
        actor: Option<&str>,
    ) -> AppResult<Review> {
        let inserted = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO occurrence_reviews (occurrence_uuid, step_id, rating, comment, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(occurrence_uuid)
        .bind(step_id)
        .bind(rating)
        .bind(comment)
        .bind(actor)
        .fetch_one(&self.pool)
        .await;

        inserted.map_err(|e| match violated_constraint(&e).as_deref() {
            Some("reviews_one_per_step") => {
                AppError::AlreadyExists(format!("review for step {}", step_id))
            }
            _ => e.into(),
        })
    }

    /// All reviews of an occurrence
    pub async fn list(&self, occurrence_uuid: Uuid) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM occurrence_reviews WHERE occurrence_uuid = $1 ORDER BY created_at",
        )
        .bind(occurrence_uuid)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }
}

//! Step review service

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        review::{CreateReview, Review},
        step::StepId,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ReviewsService {
    repository: Repository,
}

impl ReviewsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Record a review for a step. The step must have been closed at least
    /// once on this occurrence.
    pub async fn create(
        &self,
        occurrence_uuid: Uuid,
        request: CreateReview,
        actor: &str,
    ) -> AppResult<Review> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let step = StepId::parse(&request.step_id)
            .ok_or_else(|| AppError::Validation(format!("unknown step {}", request.step_id)))?;

        self.repository.occurrences.get_by_uuid(occurrence_uuid).await?;

        if !self
            .repository
            .steps
            .has_closed(occurrence_uuid, step)
            .await?
        {
            return Err(AppError::StepNotClosed(step.code().to_string()));
        }

        self.repository
            .reviews
            .create(
                occurrence_uuid,
                step.code(),
                request.rating,
                request.comment.as_deref(),
                Some(actor),
            )
            .await
    }

    pub async fn list(&self, occurrence_uuid: Uuid) -> AppResult<Vec<Review>> {
        self.repository.occurrences.get_by_uuid(occurrence_uuid).await?;
        self.repository.reviews.list(occurrence_uuid).await
    }
}

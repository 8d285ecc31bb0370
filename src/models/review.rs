//! Step review models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One rating/comment per (occurrence, step), allowed once a step of that
/// id has been closed at least once.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Review {
    pub id: i64,
    pub occurrence_uuid: Uuid,
    pub step_id: String,
    pub rating: Option<i16>,
    pub comment: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create review payload.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReview {
    pub step_id: String,
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i16>,
    pub comment: Option<String>,
}

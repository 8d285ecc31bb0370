//! Step review endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::review::{CreateReview, Review},
};

use super::AuthenticatedUser;

/// Review a closed step
#[utoipa::path(
    post,
    path = "/occurrences/{uuid}/reviews",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier")
    ),
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review recorded", body = Review),
        (status = 400, description = "Unknown step or invalid rating"),
        (status = 404, description = "Occurrence not found"),
        (status = 409, description = "Step not closed yet, or already reviewed")
    )
)]
pub async fn create_review(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(uuid): Path<Uuid>,
    Json(request): Json<CreateReview>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = state
        .services
        .reviews
        .create(uuid, request, &claims.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// List reviews of an occurrence
#[utoipa::path(
    get,
    path = "/occurrences/{uuid}/reviews",
    tag = "reviews",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier")
    ),
    responses(
        (status = 200, description = "Reviews", body = Vec<Review>),
        (status = 404, description = "Occurrence not found")
    )
)]
pub async fn list_reviews(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(uuid): Path<Uuid>,
) -> AppResult<Json<Vec<Review>>> {
    let reviews = state.services.reviews.list(uuid).await?;
    Ok(Json(reviews))
}

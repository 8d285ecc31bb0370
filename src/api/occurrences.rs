//! Occurrence lifecycle and step transition endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        occurrence::{
            CreateOccurrence, FinalizeOutcome, FinalizeRequest, OccurrenceDetails,
            UpdateOccurrence,
        },
        step::{StepId, TransitionResult},
    },
};

use super::AuthenticatedUser;

/// Create occurrence response
#[derive(Serialize, ToSchema)]
pub struct CreateOccurrenceResponse {
    /// Identifier of the created occurrence
    pub uuid: Uuid,
}

/// Step transition request
#[derive(Deserialize, ToSchema)]
pub struct TransitionRequest {
    /// Target step code (e.g. "TRIAG")
    pub step_id: String,
}

/// Change step by record id request
#[derive(Deserialize, ToSchema)]
pub struct ChangeStepRequest {
    /// Step record to close; -1 (or absent) when there is none
    pub from_step_record_id: Option<i64>,
    /// Target step code
    pub step_id: String,
}

fn parse_step(code: &str) -> AppResult<StepId> {
    StepId::parse(code).ok_or_else(|| AppError::Validation(format!("unknown step {}", code)))
}

/// Create a new occurrence
#[utoipa::path(
    post,
    path = "/occurrences",
    tag = "occurrences",
    security(("bearer_auth" = [])),
    request_body = CreateOccurrence,
    responses(
        (status = 201, description = "Occurrence created", body = CreateOccurrenceResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Dealership not found"),
        (status = 409, description = "Open occurrence already exists for this chassis")
    )
)]
pub async fn create_occurrence(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateOccurrence>,
) -> AppResult<(StatusCode, Json<CreateOccurrenceResponse>)> {
    let uuid = state
        .services
        .lifecycle
        .create(request, &claims.sub, false)
        .await?;
    Ok((StatusCode::CREATED, Json(CreateOccurrenceResponse { uuid })))
}

/// Get the full occurrence aggregate
#[utoipa::path(
    get,
    path = "/occurrences/{uuid}",
    tag = "occurrences",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier")
    ),
    responses(
        (status = 200, description = "Occurrence details", body = OccurrenceDetails),
        (status = 404, description = "Occurrence not found")
    )
)]
pub async fn get_occurrence(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(uuid): Path<Uuid>,
) -> AppResult<Json<OccurrenceDetails>> {
    let details = state.services.lifecycle.get(uuid).await?;
    Ok(Json(details))
}

/// Update an occurrence
#[utoipa::path(
    put,
    path = "/occurrences/{uuid}",
    tag = "occurrences",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier")
    ),
    request_body = UpdateOccurrence,
    responses(
        (status = 200, description = "Updated occurrence", body = OccurrenceDetails),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Occurrence or dealership not found")
    )
)]
pub async fn update_occurrence(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(uuid): Path<Uuid>,
    Json(request): Json<UpdateOccurrence>,
) -> AppResult<Json<OccurrenceDetails>> {
    let details = state
        .services
        .lifecycle
        .update(uuid, request, &claims.sub)
        .await?;
    Ok(Json(details))
}

/// Finalize an occurrence
#[utoipa::path(
    post,
    path = "/occurrences/{uuid}/finalize",
    tag = "occurrences",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier")
    ),
    request_body = FinalizeRequest,
    responses(
        (status = 200, description = "Occurrence finalized", body = FinalizeOutcome),
        (status = 404, description = "Occurrence not found"),
        (status = 409, description = "Occurrence has no current step")
    )
)]
pub async fn finalize_occurrence(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(uuid): Path<Uuid>,
    Json(request): Json<FinalizeRequest>,
) -> AppResult<Json<FinalizeOutcome>> {
    let outcome = state.services.lifecycle.finalize(uuid, request).await?;
    Ok(Json(outcome))
}

/// Delete an occurrence
#[utoipa::path(
    delete,
    path = "/occurrences/{uuid}",
    tag = "occurrences",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier")
    ),
    responses(
        (status = 204, description = "Occurrence deleted"),
        (status = 404, description = "Occurrence not found")
    )
)]
pub async fn delete_occurrence(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(uuid): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.lifecycle.delete_by_uuid(uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move the occurrence to another workflow step
#[utoipa::path(
    post,
    path = "/occurrences/{uuid}/steps/transition",
    tag = "occurrences",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier")
    ),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "New current step", body = TransitionResult),
        (status = 400, description = "Unknown step"),
        (status = 404, description = "Occurrence not found"),
        (status = 409, description = "Already on this step or transition not allowed")
    )
)]
pub async fn transition_step(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(uuid): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> AppResult<Json<TransitionResult>> {
    let target = parse_step(&request.step_id)?;
    let result = state
        .services
        .transitions
        .transition(uuid, target, Some(&claims.sub))
        .await?;
    Ok(Json(result))
}

/// Close one specific step record and open another step
#[utoipa::path(
    post,
    path = "/occurrences/{uuid}/steps/change",
    tag = "occurrences",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier")
    ),
    request_body = ChangeStepRequest,
    responses(
        (status = 200, description = "New current step", body = TransitionResult),
        (status = 400, description = "Unknown step"),
        (status = 404, description = "Occurrence or step record not found")
    )
)]
pub async fn change_step(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(uuid): Path<Uuid>,
    Json(request): Json<ChangeStepRequest>,
) -> AppResult<Json<TransitionResult>> {
    let target = parse_step(&request.step_id)?;
    // Clients signal "no step to close" with -1
    let from = request.from_step_record_id.filter(|id| *id >= 0);
    let result = state
        .services
        .transitions
        .change_step_by_ids(uuid, from, target, &claims.sub)
        .await?;
    Ok(Json(result))
}

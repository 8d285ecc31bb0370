//! Tow/assistance dispatch endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::dispatch::{CancelDispatch, CreateDispatch, DispatchSummary},
};

use super::AuthenticatedUser;

/// Assign driver request
#[derive(Deserialize, ToSchema)]
pub struct AssignDriverRequest {
    /// Driver name or external identifier
    pub driver: String,
}

/// Offer a dispatch to a dealership
#[utoipa::path(
    post,
    path = "/occurrences/{uuid}/dispatches",
    tag = "dispatches",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier")
    ),
    request_body = CreateDispatch,
    responses(
        (status = 201, description = "Dispatch created", body = DispatchSummary),
        (status = 404, description = "Occurrence not found")
    )
)]
pub async fn create_dispatch(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(uuid): Path<Uuid>,
    Json(request): Json<CreateDispatch>,
) -> AppResult<(StatusCode, Json<DispatchSummary>)> {
    let dispatch = state.services.dispatch.create(uuid, request).await?;
    Ok((StatusCode::CREATED, Json(dispatch)))
}

/// Refuse a waiting dispatch
#[utoipa::path(
    post,
    path = "/occurrences/{uuid}/dispatches/{dispatch_uuid}/cancel",
    tag = "dispatches",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier"),
        ("dispatch_uuid" = Uuid, Path, description = "Dispatch identifier")
    ),
    request_body = CancelDispatch,
    responses(
        (status = 200, description = "Dispatch refused", body = DispatchSummary),
        (status = 404, description = "Dispatch not found or not waiting")
    )
)]
pub async fn cancel_dispatch(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path((uuid, dispatch_uuid)): Path<(Uuid, Uuid)>,
    Json(request): Json<CancelDispatch>,
) -> AppResult<Json<DispatchSummary>> {
    let dispatch = state
        .services
        .dispatch
        .cancel(uuid, dispatch_uuid, request)
        .await?;
    Ok(Json(dispatch))
}

/// Accept a waiting dispatch
#[utoipa::path(
    post,
    path = "/occurrences/{uuid}/dispatches/{dispatch_uuid}/accept",
    tag = "dispatches",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier"),
        ("dispatch_uuid" = Uuid, Path, description = "Dispatch identifier")
    ),
    responses(
        (status = 200, description = "Dispatch accepted", body = DispatchSummary),
        (status = 404, description = "Dispatch not found or not waiting")
    )
)]
pub async fn accept_dispatch(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path((uuid, dispatch_uuid)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<DispatchSummary>> {
    let dispatch = state
        .services
        .dispatch
        .make_available(uuid, dispatch_uuid)
        .await?;
    Ok(Json(dispatch))
}

/// Assign a driver to an accepted dispatch
#[utoipa::path(
    post,
    path = "/occurrences/{uuid}/dispatches/{dispatch_uuid}/driver",
    tag = "dispatches",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier"),
        ("dispatch_uuid" = Uuid, Path, description = "Dispatch identifier")
    ),
    request_body = AssignDriverRequest,
    responses(
        (status = 200, description = "Driver assigned", body = DispatchSummary),
        (status = 404, description = "Dispatch not found or not available")
    )
)]
pub async fn assign_driver(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path((uuid, dispatch_uuid)): Path<(Uuid, Uuid)>,
    Json(request): Json<AssignDriverRequest>,
) -> AppResult<Json<DispatchSummary>> {
    let dispatch = state
        .services
        .dispatch
        .assign_driver(uuid, dispatch_uuid, &request.driver)
        .await?;
    Ok(Json(dispatch))
}

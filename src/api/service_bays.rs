//! Service bay scheduling endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::service_bay::{BookSchedule, ScheduleDetails, ScheduleSummary},
};

use super::AuthenticatedUser;

/// Schedule listing query
#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ListSchedulesQuery {
    /// Range start (inclusive)
    pub start_date: DateTime<Utc>,
    /// Range end (exclusive)
    pub end_date: DateTime<Utc>,
    /// Dealership dn
    pub dn: String,
    /// Comma-separated bay ids to restrict to
    pub bay_ids: Option<String>,
}

/// Occurrence schedule query
#[derive(Deserialize, IntoParams, ToSchema)]
pub struct OccurrenceScheduleQuery {
    /// Dealership dn
    pub dn: String,
}

/// Book a service bay for an occurrence
#[utoipa::path(
    post,
    path = "/schedules",
    tag = "schedules",
    security(("bearer_auth" = [])),
    request_body = BookSchedule,
    responses(
        (status = 201, description = "Bay booked", body = ScheduleSummary),
        (status = 400, description = "Invalid range"),
        (status = 404, description = "Occurrence or bay not found"),
        (status = 409, description = "Bay already booked or occurrence already scheduled")
    )
)]
pub async fn book_schedule(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BookSchedule>,
) -> AppResult<(StatusCode, Json<ScheduleSummary>)> {
    let schedule = state
        .services
        .scheduling
        .book(request, Some(&claims.sub))
        .await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

/// List schedules overlapping a range
#[utoipa::path(
    get,
    path = "/schedules",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(ListSchedulesQuery),
    responses(
        (status = 200, description = "Schedules in range", body = Vec<ScheduleDetails>),
        (status = 400, description = "Invalid range")
    )
)]
pub async fn list_schedules(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ListSchedulesQuery>,
) -> AppResult<Json<Vec<ScheduleDetails>>> {
    let bay_ids: Option<Vec<i64>> = query.bay_ids.as_deref().map(|raw| {
        raw.split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    });

    let schedules = state
        .services
        .scheduling
        .list(
            query.start_date,
            query.end_date,
            &query.dn,
            bay_ids.as_deref(),
        )
        .await?;
    Ok(Json(schedules))
}

/// Cancel a schedule
#[utoipa::path(
    delete,
    path = "/schedules/{id}",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Schedule ID"),
        OccurrenceScheduleQuery
    ),
    responses(
        (status = 200, description = "Schedule cancelled", body = ScheduleSummary),
        (status = 404, description = "Active schedule not found")
    )
)]
pub async fn cancel_schedule(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Query(query): Query<OccurrenceScheduleQuery>,
) -> AppResult<Json<ScheduleSummary>> {
    let schedule = state.services.scheduling.cancel(id, &query.dn).await?;
    Ok(Json(schedule))
}

/// Active schedule of an occurrence
#[utoipa::path(
    get,
    path = "/occurrences/{uuid}/schedule",
    tag = "schedules",
    security(("bearer_auth" = [])),
    params(
        ("uuid" = Uuid, Path, description = "Occurrence identifier"),
        OccurrenceScheduleQuery
    ),
    responses(
        (status = 200, description = "Active schedule", body = ScheduleSummary),
        (status = 404, description = "No active schedule")
    )
)]
pub async fn get_occurrence_schedule(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(uuid): Path<Uuid>,
    Query(query): Query<OccurrenceScheduleQuery>,
) -> AppResult<Json<ScheduleSummary>> {
    let schedule = state
        .services
        .scheduling
        .get_by_occurrence(uuid, &query.dn)
        .await?;
    Ok(Json(schedule))
}

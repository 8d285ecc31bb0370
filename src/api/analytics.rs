//! Analytics endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::{
        analytics::{
            AnalyticsFilter, CustomerStats, DealershipGroupStats, GroupedStats, Interval,
            OperationalStats, ScopeContext, StepModelDuration, StepTimeBucket, Totals,
        },
        auth::PersonaClaims,
    },
    repository::analytics::Dimension,
};

use super::AuthenticatedUser;

/// Common analytics query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct AnalyticsQuery {
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub updated_from: Option<DateTime<Utc>>,
    pub updated_to: Option<DateTime<Utc>>,
    pub criticality: Option<i16>,
    pub occurrence_type: Option<String>,
    /// Comma-separated chassis list
    pub chassis: Option<String>,
    /// Comma-separated dealership dn list
    pub dns: Option<String>,
    pub campaign: Option<bool>,
    pub step: Option<String>,
    pub model: Option<String>,
    pub region: Option<String>,
    pub legislation: Option<String>,
    /// Bucketing interval for time series (daily or monthly)
    pub interval: Option<Interval>,
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|r| {
        r.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

impl AnalyticsQuery {
    fn into_filter(self) -> AnalyticsFilter {
        AnalyticsFilter {
            created_from: self.created_from,
            created_to: self.created_to,
            updated_from: self.updated_from,
            updated_to: self.updated_to,
            criticality: self.criticality,
            occurrence_type: self.occurrence_type,
            chassis: split_csv(self.chassis.as_deref()),
            dns: split_csv(self.dns.as_deref()),
            campaign: self.campaign,
            step: self.step,
            model: self.model,
            region: self.region,
            legislation: self.legislation,
        }
    }
}

async fn resolve_scope(
    state: &crate::AppState,
    claims: &PersonaClaims,
) -> AppResult<ScopeContext> {
    state
        .services
        .analytics
        .resolve_scope(claims.persona, &claims.sub)
        .await
}

/// Occurrence counts per step over time
#[utoipa::path(
    get,
    path = "/analytics/steps/quantity",
    tag = "analytics",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Counts per step per period", body = Vec<StepTimeBucket>),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn quantity_by_step(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<Vec<StepTimeBucket>>> {
    let scope = resolve_scope(&state, &claims).await?;
    let interval = query.interval.unwrap_or(Interval::Monthly);
    let filter = query.into_filter();
    let buckets = state
        .services
        .analytics
        .quantity_by_step(&scope, &filter, interval)
        .await?;
    Ok(Json(buckets))
}

/// Average time spent per step per vehicle model
#[utoipa::path(
    get,
    path = "/analytics/steps/duration",
    tag = "analytics",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Average duration per step and model", body = Vec<StepModelDuration>),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn average_duration_by_step_and_model(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<Vec<StepModelDuration>>> {
    let scope = resolve_scope(&state, &claims).await?;
    let filter = query.into_filter();
    let durations = state
        .services
        .analytics
        .average_duration_by_step_and_model(&scope, &filter)
        .await?;
    Ok(Json(durations))
}

/// Statistics grouped by customer account
#[utoipa::path(
    get,
    path = "/analytics/customers",
    tag = "analytics",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Per-customer statistics", body = Vec<CustomerStats>),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn stats_by_customer(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<Vec<CustomerStats>>> {
    let scope = resolve_scope(&state, &claims).await?;
    let filter = query.into_filter();
    let stats = state
        .services
        .analytics
        .stats_by_customer(&scope, &filter)
        .await?;
    Ok(Json(stats))
}

/// Statistics grouped by dealership
#[utoipa::path(
    get,
    path = "/analytics/dealerships",
    tag = "analytics",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Per-dealership statistics", body = Vec<DealershipGroupStats>),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn stats_by_dealership(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<Vec<DealershipGroupStats>>> {
    let scope = resolve_scope(&state, &claims).await?;
    let filter = query.into_filter();
    let stats = state
        .services
        .analytics
        .stats_by_dealership(&scope, &filter)
        .await?;
    Ok(Json(stats))
}

/// Statistics grouped along one dimension
#[utoipa::path(
    get,
    path = "/analytics/grouped/{dimension}",
    tag = "analytics",
    security(("bearer_auth" = [])),
    params(
        ("dimension" = String, Path, description = "legislation, model, state, city or step"),
        AnalyticsQuery
    ),
    responses(
        (status = 200, description = "Grouped statistics", body = GroupedStats),
        (status = 400, description = "Unknown dimension or invalid date range")
    )
)]
pub async fn stats_by_dimension(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(dimension): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<GroupedStats>> {
    let dimension = match dimension.as_str() {
        "legislation" => Dimension::Legislation,
        "model" => Dimension::Model,
        "state" => Dimension::State,
        "city" => Dimension::City,
        "step" => Dimension::Step,
        other => {
            return Err(AppError::Validation(format!("unknown dimension {}", other)));
        }
    };

    let scope = resolve_scope(&state, &claims).await?;
    let filter = query.into_filter();
    let stats = state
        .services
        .analytics
        .by_dimension(&scope, &filter, dimension)
        .await?;
    Ok(Json(stats))
}

/// Combined totals over the scope
#[utoipa::path(
    get,
    path = "/analytics/totals",
    tag = "analytics",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Finished/in-progress totals", body = Totals),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn totals(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<Totals>> {
    let scope = resolve_scope(&state, &claims).await?;
    let filter = query.into_filter();
    let totals = state.services.analytics.totals(&scope, &filter).await?;
    Ok(Json(totals))
}

/// Operational classification of open occurrences
#[utoipa::path(
    get,
    path = "/analytics/operational",
    tag = "analytics",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Not-started/in-progress/delayed counts", body = OperationalStats),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn operational_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<OperationalStats>> {
    let scope = resolve_scope(&state, &claims).await?;
    let filter = query.into_filter();
    let stats = state
        .services
        .analytics
        .operational_stats(&scope, &filter)
        .await?;
    Ok(Json(stats))
}

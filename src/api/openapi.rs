//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{analytics, dispatches, health, imports, occurrences, reviews, service_bays};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Roadcare API",
        version = "0.3.0",
        description = "Vehicle breakdown occurrence management REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Occurrences
        occurrences::create_occurrence,
        occurrences::get_occurrence,
        occurrences::update_occurrence,
        occurrences::finalize_occurrence,
        occurrences::delete_occurrence,
        occurrences::transition_step,
        occurrences::change_step,
        // Dispatches
        dispatches::create_dispatch,
        dispatches::cancel_dispatch,
        dispatches::accept_dispatch,
        dispatches::assign_driver,
        // Schedules
        service_bays::book_schedule,
        service_bays::list_schedules,
        service_bays::cancel_schedule,
        service_bays::get_occurrence_schedule,
        // Reviews
        reviews::create_review,
        reviews::list_reviews,
        // Imports
        imports::import_batch,
        imports::delete_batch,
        // Analytics
        analytics::quantity_by_step,
        analytics::average_duration_by_step_and_model,
        analytics::stats_by_customer,
        analytics::stats_by_dealership,
        analytics::stats_by_dimension,
        analytics::totals,
        analytics::operational_stats,
    ),
    components(
        schemas(
            // Occurrences
            crate::models::occurrence::CreateOccurrence,
            crate::models::occurrence::UpdateOccurrence,
            crate::models::occurrence::FinalizeRequest,
            crate::models::occurrence::FinalizeOutcome,
            crate::models::occurrence::CascadeStatus,
            crate::models::occurrence::OccurrenceDetails,
            crate::models::occurrence::ScheduleRequest,
            crate::models::occurrence::Vehicle,
            crate::models::occurrence::Driver,
            crate::models::occurrence::DealershipSnapshot,
            crate::models::occurrence::Part,
            crate::models::occurrence::PartOrder,
            crate::models::occurrence::Dtc,
            crate::models::occurrence::Dealership,
            occurrences::CreateOccurrenceResponse,
            occurrences::TransitionRequest,
            occurrences::ChangeStepRequest,
            // Steps
            crate::models::step::StepId,
            crate::models::step::StepSummary,
            crate::models::step::TransitionResult,
            // Dispatches
            crate::models::dispatch::DispatchStatus,
            crate::models::dispatch::DispatchSummary,
            crate::models::dispatch::CreateDispatch,
            crate::models::dispatch::CancelDispatch,
            dispatches::AssignDriverRequest,
            // Schedules
            crate::models::service_bay::ServiceBay,
            crate::models::service_bay::ScheduleSummary,
            crate::models::service_bay::ScheduleDetails,
            crate::models::service_bay::BookSchedule,
            // Reviews
            crate::models::review::Review,
            crate::models::review::CreateReview,
            // Imports
            crate::models::import_report::ImportRecord,
            crate::models::import_report::ImportRecordResult,
            crate::models::import_report::ImportBatchRequest,
            crate::models::import_report::DeleteBatchRequest,
            imports::ImportBatchResponse,
            // Analytics
            crate::models::analytics::Persona,
            crate::models::analytics::Interval,
            crate::models::analytics::AnalyticsFilter,
            crate::models::analytics::StatBucket,
            crate::models::analytics::DurationBucket,
            crate::models::analytics::GroupedStats,
            crate::models::analytics::StepTimeBucket,
            crate::models::analytics::StepModelDuration,
            crate::models::analytics::DealershipStats,
            crate::models::analytics::DealershipGroupStats,
            crate::models::analytics::CustomerStats,
            crate::models::analytics::Totals,
            crate::models::analytics::OperationalStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "occurrences", description = "Occurrence lifecycle and step transitions"),
        (name = "dispatches", description = "Tow/assistance dispatch workflow"),
        (name = "schedules", description = "Service bay scheduling"),
        (name = "reviews", description = "Step reviews"),
        (name = "imports", description = "Bulk import of occurrence records"),
        (name = "analytics", description = "Aggregated statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

//! Error types for the Roadcare server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable application error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    OccurrenceNotFound = 4,
    DealershipNotFound = 5,
    ServiceBayNotFound = 6,
    DispatchNotFound = 7,
    ScheduleNotFound = 8,
    SameStep = 9,
    NoCurrentStep = 10,
    OccurrenceNotFinished = 11,
    ServiceBayConflict = 12,
    ServiceBayWithOccurrenceExists = 13,
    AlreadyExists = 14,
    IncompleteDateRange = 15,
    InvalidRange = 16,
    RangeTooLarge = 17,
    TransitionNotAllowed = 18,
    BadValue = 19,
    StepNotClosed = 20,
    StepRecordNotFound = 21,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Occurrence {0} not found")]
    OccurrenceNotFound(String),

    #[error("Dealership {0} not found")]
    DealershipNotFound(String),

    #[error("Service bay {0} not found")]
    ServiceBayNotFound(i64),

    #[error("Dispatch not found or not in the expected status")]
    DispatchNotFound,

    #[error("Service bay schedule not found: {0}")]
    ScheduleNotFound(String),

    #[error("Occurrence is already at step {0}")]
    SameStep(String),

    #[error("Occurrence has no current step")]
    NoCurrentStep,

    #[error("Step record {0} not found for this occurrence")]
    StepRecordNotFound(i64),

    #[error("Vehicle {0} already has an open occurrence")]
    OccurrenceNotFinished(String),

    #[error("Service bay already booked for an overlapping period")]
    ServiceBayConflict,

    #[error("Occurrence already has an active service bay schedule")]
    ServiceBayWithOccurrenceExists,

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Both start and end dates must be supplied")]
    IncompleteDateRange,

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Date range must not span more than one year")]
    RangeTooLarge,

    #[error("Transition from {from} to {to} is not allowed")]
    TransitionNotAllowed { from: String, to: String },

    #[error("Step {0} has never been closed for this occurrence")]
    StepNotClosed(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Integration error: {0}")]
    Integration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    /// Stable code reported to API clients for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Authentication(_) | AppError::Authorization(_) => ErrorCode::NotAuthorized,
            AppError::OccurrenceNotFound(_) => ErrorCode::OccurrenceNotFound,
            AppError::DealershipNotFound(_) => ErrorCode::DealershipNotFound,
            AppError::ServiceBayNotFound(_) => ErrorCode::ServiceBayNotFound,
            AppError::DispatchNotFound => ErrorCode::DispatchNotFound,
            AppError::ScheduleNotFound(_) => ErrorCode::ScheduleNotFound,
            AppError::SameStep(_) => ErrorCode::SameStep,
            AppError::NoCurrentStep => ErrorCode::NoCurrentStep,
            AppError::StepRecordNotFound(_) => ErrorCode::StepRecordNotFound,
            AppError::OccurrenceNotFinished(_) => ErrorCode::OccurrenceNotFinished,
            AppError::ServiceBayConflict => ErrorCode::ServiceBayConflict,
            AppError::ServiceBayWithOccurrenceExists => ErrorCode::ServiceBayWithOccurrenceExists,
            AppError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            AppError::IncompleteDateRange => ErrorCode::IncompleteDateRange,
            AppError::InvalidRange(_) => ErrorCode::InvalidRange,
            AppError::RangeTooLarge => ErrorCode::RangeTooLarge,
            AppError::TransitionNotAllowed { .. } => ErrorCode::TransitionNotAllowed,
            AppError::StepNotClosed(_) => ErrorCode::StepNotClosed,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Integration(_) | AppError::Internal(_) => ErrorCode::Failure,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::OccurrenceNotFound(_)
            | AppError::DealershipNotFound(_)
            | AppError::ServiceBayNotFound(_)
            | AppError::DispatchNotFound
            | AppError::ScheduleNotFound(_)
            | AppError::StepRecordNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SameStep(_)
            | AppError::NoCurrentStep
            | AppError::OccurrenceNotFinished(_)
            | AppError::ServiceBayConflict
            | AppError::ServiceBayWithOccurrenceExists
            | AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::IncompleteDateRange
            | AppError::InvalidRange(_)
            | AppError::RangeTooLarge
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::TransitionNotAllowed { .. } | AppError::StepNotClosed(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Integration(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let code = self.code();
        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (self.status(), body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_errors_map_to_conflict_codes() {
        assert_eq!(AppError::SameStep("TICKE".into()).code(), ErrorCode::SameStep);
        assert_eq!(AppError::ServiceBayConflict.code(), ErrorCode::ServiceBayConflict);
        assert_eq!(
            AppError::ServiceBayWithOccurrenceExists.code(),
            ErrorCode::ServiceBayWithOccurrenceExists
        );
    }

    #[test]
    fn test_missing_step_record_is_not_found() {
        let err = AppError::StepRecordNotFound(42);
        assert_eq!(err.code(), ErrorCode::StepRecordNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_range_errors_are_bad_requests() {
        assert_eq!(AppError::IncompleteDateRange.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::RangeTooLarge.status(), StatusCode::BAD_REQUEST);
    }
}

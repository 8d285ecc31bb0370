//! Bulk import endpoints for the external data feed

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::import_report::{DeleteBatchRequest, ImportBatchRequest, ImportRecordResult},
};

use super::AuthenticatedUser;

/// Batch import/delete response
#[derive(Serialize, ToSchema)]
pub struct ImportBatchResponse {
    /// One result per submitted record, in order
    pub results: Vec<ImportRecordResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl ImportBatchResponse {
    fn from_results(results: Vec<ImportRecordResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        Self {
            results,
            succeeded,
            failed,
        }
    }
}

/// Import a batch of occurrence records
#[utoipa::path(
    post,
    path = "/imports",
    tag = "imports",
    security(("bearer_auth" = [])),
    request_body = ImportBatchRequest,
    responses(
        (status = 200, description = "Per-record import results", body = ImportBatchResponse)
    )
)]
pub async fn import_batch(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<ImportBatchRequest>,
) -> AppResult<Json<ImportBatchResponse>> {
    let results = state
        .services
        .import
        .import_batch(request.records, request.replace_existing)
        .await;
    Ok(Json(ImportBatchResponse::from_results(results)))
}

/// Delete a batch of previously imported records
#[utoipa::path(
    post,
    path = "/imports/delete",
    tag = "imports",
    security(("bearer_auth" = [])),
    request_body = DeleteBatchRequest,
    responses(
        (status = 200, description = "Per-record delete results", body = ImportBatchResponse)
    )
)]
pub async fn delete_batch(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<DeleteBatchRequest>,
) -> AppResult<Json<ImportBatchResponse>> {
    let results = state.services.import.delete_batch(request.records).await;
    Ok(Json(ImportBatchResponse::from_results(results)))
}

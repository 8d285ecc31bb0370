//! Batch import record and per-record report models

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::occurrence::{Driver, Dtc, Vehicle};

/// One record from the external bulk data feed.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ImportRecord {
    /// External record id, echoed back in the result.
    pub id: String,
    /// External occurrence number; a record without one fails.
    pub os_number: Option<String>,
    /// External workflow label, mapped to a step id.
    pub board_stage: Option<String>,
    pub chassis: Option<String>,
    pub dn: Option<String>,
    pub criticality: Option<i16>,
    pub status: Option<String>,
    pub observation: Option<String>,
    pub report: Option<String>,
    pub country: Option<String>,
    pub occurrence_type: Option<String>,
    pub main_occurrence: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub campaign: bool,
    pub vehicle: Option<Vehicle>,
    pub driver: Option<Driver>,
    pub dtcs: Option<Vec<Dtc>>,
    pub extra_lists: Option<serde_json::Value>,
}

/// Per-record import/delete result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportRecordResult {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence_uuid: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportRecordResult {
    pub fn ok(id: String, occurrence_uuid: Uuid) -> Self {
        Self {
            id,
            success: true,
            occurrence_uuid: Some(occurrence_uuid),
            error: None,
        }
    }

    pub fn failed(id: String, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            occurrence_uuid: None,
            error: Some(error.into()),
        }
    }

    pub fn deleted(id: String) -> Self {
        Self {
            id,
            success: true,
            occurrence_uuid: None,
            error: None,
        }
    }
}

/// Batch import request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ImportBatchRequest {
    pub records: Vec<ImportRecord>,
    #[serde(default)]
    pub replace_existing: bool,
}

/// Batch delete request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DeleteBatchRequest {
    pub records: Vec<ImportRecord>,
}

//! Occurrence aggregate models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::dispatch::DispatchSummary;
use super::service_bay::ScheduleSummary;
use super::step::{StepId, StepSummary};

/// Vehicle snapshot taken when the occurrence is reported.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Vehicle {
    pub chassis: Option<String>,
    pub plate: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    /// Emission standard the vehicle was certified under.
    pub legislation: Option<String>,
    pub odometer_km: Option<i64>,
}

/// Driver snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Driver {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub document: Option<String>,
}

/// Dealership snapshot embedded in the aggregate. The master record lives
/// in the dealerships table, keyed by dn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DealershipSnapshot {
    pub dn: Option<String>,
    pub company_name: Option<String>,
    pub fantasy_name: Option<String>,
    pub region: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
}

/// A single part line on the part order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Part {
    pub part_number: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

/// Part order owned by the occurrence; part lines are replaced wholesale
/// on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PartOrder {
    pub order_number: Option<String>,
    pub status: Option<String>,
    pub parts: Vec<Part>,
}

/// Diagnostic trouble code reported by the vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Dtc {
    pub code: String,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Dealership master record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Dealership {
    pub dn: String,
    pub company_name: String,
    pub fantasy_name: Option<String>,
    pub region: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Occurrence aggregate root, as stored.
#[derive(Debug, Clone, FromRow)]
pub struct Occurrence {
    pub uuid: Uuid,
    pub os_number: Option<String>,
    pub protocol_number: Option<String>,
    pub chassis: String,
    pub current_step: Option<String>,
    pub criticality: Option<i16>,
    pub status: Option<String>,
    pub observation: Option<String>,
    pub report: Option<String>,
    pub solution_proposed: Option<String>,
    pub country: Option<String>,
    pub occurrence_type: Option<String>,
    pub main_occurrence: Option<String>,
    pub source: Option<String>,
    pub campaign: bool,
    pub vehicle: Option<Json<Vehicle>>,
    pub driver: Option<Json<Driver>>,
    pub dealership: Option<Json<DealershipSnapshot>>,
    pub part_order: Option<Json<PartOrder>>,
    pub dtcs: Option<Json<Vec<Dtc>>>,
    /// Free-form JSON-encoded sub-lists carried through unchanged.
    pub extra_lists: Option<serde_json::Value>,
    pub dn: Option<String>,
    pub asset_id: Option<String>,
    pub account_id: Option<String>,
    pub schedule_uuid: Option<Uuid>,
    pub finalization_reason_type: Option<String>,
    pub finalization_reason_description: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Occurrence {
    pub fn is_closed(&self) -> bool {
        self.end_date.is_some()
    }

    pub fn current_step_id(&self) -> Option<StepId> {
        self.current_step.as_deref().and_then(StepId::parse)
    }
}

/// Service bay booking carried inside a create request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ScheduleRequest {
    pub service_bay_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Create occurrence payload.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateOccurrence {
    pub os_number: Option<String>,
    pub chassis: String,
    #[validate(range(min = 1, max = 5))]
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
    pub dn: String,
    pub vehicle: Option<Vehicle>,
    pub driver: Option<Driver>,
    pub dtcs: Option<Vec<Dtc>>,
    pub schedule_uuid: Option<Uuid>,
    pub schedule: Option<ScheduleRequest>,
}

/// Update occurrence payload: every field optional, lists replaced wholesale.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOccurrence {
    #[validate(range(min = 1, max = 5))]
    pub criticality: Option<i16>,
    pub status: Option<String>,
    pub observation: Option<String>,
    pub report: Option<String>,
    pub solution_proposed: Option<String>,
    pub occurrence_type: Option<String>,
    pub main_occurrence: Option<String>,
    pub source: Option<String>,
    pub campaign: Option<bool>,
    pub vehicle: Option<Vehicle>,
    pub driver: Option<Driver>,
    pub dealership: Option<DealershipSnapshot>,
    pub dn: Option<String>,
    pub dtcs: Option<Vec<Dtc>>,
    pub part_order: Option<PartOrder>,
    pub extra_lists: Option<serde_json::Value>,
    /// Patch applied to the current step.
    pub step_report: Option<String>,
    pub step_estimated_time: Option<i32>,
    pub step_observation: Option<String>,
}

/// Finalize request.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FinalizeRequest {
    pub reason_type: Option<String>,
    pub reason_description: Option<String>,
    pub service_order_number: Option<String>,
}

/// Outcome of the cascade to the externally-owned maintenance schedule.
/// Finalization itself never fails because of the cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStatus {
    NotLinked,
    Updated,
    Failed,
}

/// Result of finalizing an occurrence.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FinalizeOutcome {
    pub end_date: DateTime<Utc>,
    pub cascade: CascadeStatus,
}

/// Full aggregate view for API responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OccurrenceDetails {
    pub uuid: Uuid,
    pub os_number: Option<String>,
    pub protocol_number: Option<String>,
    pub chassis: String,
    pub current_step: Option<StepId>,
    pub criticality: Option<i16>,
    pub status: Option<String>,
    pub observation: Option<String>,
    pub report: Option<String>,
    pub solution_proposed: Option<String>,
    pub country: Option<String>,
    pub occurrence_type: Option<String>,
    pub main_occurrence: Option<String>,
    pub source: Option<String>,
    pub campaign: bool,
    pub vehicle: Option<Vehicle>,
    pub driver: Option<Driver>,
    pub dealership: Option<DealershipSnapshot>,
    pub part_order: Option<PartOrder>,
    pub dtcs: Vec<Dtc>,
    pub dn: Option<String>,
    pub schedule_uuid: Option<Uuid>,
    pub finalization_reason_type: Option<String>,
    pub finalization_reason_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub steps: Vec<StepSummary>,
    pub dispatches: Vec<DispatchSummary>,
    pub active_schedule: Option<ScheduleSummary>,
}

impl OccurrenceDetails {
    pub fn from_parts(
        occ: Occurrence,
        steps: Vec<StepSummary>,
        dispatches: Vec<DispatchSummary>,
        active_schedule: Option<ScheduleSummary>,
    ) -> Self {
        Self {
            uuid: occ.uuid,
            os_number: occ.os_number,
            protocol_number: occ.protocol_number,
            chassis: occ.chassis,
            current_step: occ.current_step.as_deref().and_then(StepId::parse),
            criticality: occ.criticality,
            status: occ.status,
            observation: occ.observation,
            report: occ.report,
            solution_proposed: occ.solution_proposed,
            country: occ.country,
            occurrence_type: occ.occurrence_type,
            main_occurrence: occ.main_occurrence,
            source: occ.source,
            campaign: occ.campaign,
            vehicle: occ.vehicle.map(|j| j.0),
            driver: occ.driver.map(|j| j.0),
            dealership: occ.dealership.map(|j| j.0),
            part_order: occ.part_order.map(|j| j.0),
            dtcs: occ.dtcs.map(|j| j.0).unwrap_or_default(),
            dn: occ.dn,
            schedule_uuid: occ.schedule_uuid,
            finalization_reason_type: occ.finalization_reason_type,
            finalization_reason_description: occ.finalization_reason_description,
            created_at: occ.created_at,
            updated_at: occ.updated_at,
            end_date: occ.end_date,
            steps,
            dispatches,
            active_schedule,
        }
    }
}

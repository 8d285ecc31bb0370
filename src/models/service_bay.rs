//! Service bay and schedule models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Physical repair bay at a dealership.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ServiceBay {
    pub id: i64,
    pub dn: String,
    pub name: String,
    pub active: bool,
}

/// Service bay booking from database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceBaySchedule {
    pub id: i64,
    pub service_bay_id: i64,
    pub occurrence_uuid: Uuid,
    pub dn: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Booking summary embedded in occurrence responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleSummary {
    pub id: i64,
    pub service_bay_id: i64,
    pub dn: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
}

impl From<ServiceBaySchedule> for ScheduleSummary {
    fn from(s: ServiceBaySchedule) -> Self {
        Self {
            id: s.id,
            service_bay_id: s.service_bay_id,
            dn: s.dn,
            start_date: s.start_date,
            end_date: s.end_date,
            active: s.active,
        }
    }
}

/// Listing row: booking plus the linked occurrence's vehicle identity
/// and open/closed state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleDetails {
    pub id: i64,
    pub service_bay_id: i64,
    pub bay_name: String,
    pub dn: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: bool,
    pub occurrence_uuid: Uuid,
    pub chassis: String,
    pub plate: Option<String>,
    pub model: Option<String>,
    pub occurrence_closed: bool,
}

/// Book request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookSchedule {
    pub occurrence_uuid: Uuid,
    pub service_bay_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub dn: Option<String>,
}

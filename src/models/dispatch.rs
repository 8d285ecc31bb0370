//! Tow/assistance dispatch models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Dispatch workflow status.
///
/// WAITING_DEALERSHIP -> AVAILABLE (-> driver assigned), or
/// WAITING_DEALERSHIP -> UNAVAILABLE on cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    WaitingDealership,
    Available,
    Unavailable,
}

impl DispatchStatus {
    pub fn code(&self) -> &'static str {
        match self {
            DispatchStatus::WaitingDealership => "WAITING_DEALERSHIP",
            DispatchStatus::Available => "AVAILABLE",
            DispatchStatus::Unavailable => "UNAVAILABLE",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "WAITING_DEALERSHIP" => Some(DispatchStatus::WaitingDealership),
            "AVAILABLE" => Some(DispatchStatus::Available),
            "UNAVAILABLE" => Some(DispatchStatus::Unavailable),
            _ => None,
        }
    }
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Dispatch record from database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dispatch {
    pub dispatch_uuid: Uuid,
    pub occurrence_uuid: Uuid,
    pub status: String,
    pub occurrence_type: Option<String>,
    pub payer: Option<String>,
    pub authorize_payment: Option<bool>,
    pub route: Option<String>,
    pub dn: Option<String>,
    pub driver: Option<String>,
    pub reason_refusal: Option<String>,
    pub description_refusal: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dispatch summary for API responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispatchSummary {
    pub dispatch_uuid: Uuid,
    pub status: DispatchStatus,
    pub occurrence_type: Option<String>,
    pub payer: Option<String>,
    pub authorize_payment: Option<bool>,
    pub route: Option<String>,
    pub dn: Option<String>,
    pub driver: Option<String>,
    pub reason_refusal: Option<String>,
    pub description_refusal: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Dispatch> for DispatchSummary {
    fn from(d: Dispatch) -> Self {
        Self {
            dispatch_uuid: d.dispatch_uuid,
            status: DispatchStatus::parse(&d.status).unwrap_or(DispatchStatus::Unavailable),
            occurrence_type: d.occurrence_type,
            payer: d.payer,
            authorize_payment: d.authorize_payment,
            route: d.route,
            dn: d.dn,
            driver: d.driver,
            reason_refusal: d.reason_refusal,
            description_refusal: d.description_refusal,
            created_at: d.created_at,
        }
    }
}

/// Create dispatch payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateDispatch {
    pub occurrence_type: Option<String>,
    pub payer: Option<String>,
    pub authorize_payment: Option<bool>,
    pub route: Option<String>,
    /// Target dealership; also overwrites the occurrence's dn.
    pub dn: String,
}

/// Cancel dispatch payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CancelDispatch {
    pub reason_refusal: String,
    pub description_refusal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codec_roundtrip() {
        for status in [
            DispatchStatus::WaitingDealership,
            DispatchStatus::Available,
            DispatchStatus::Unavailable,
        ] {
            assert_eq!(DispatchStatus::parse(status.code()), Some(status));
        }
        assert_eq!(DispatchStatus::parse("PENDING"), None);
    }
}

//! Workflow step catalog and step record models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Identifier of a workflow step.
///
/// The catalog order below is the intended repair sequence, but transitions
/// are not restricted to it unless `workflow.strict_transitions` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepId {
    Ticke,
    Triag,
    Reloc,
    Diag2,
    Remoc,
    Diag3,
    Diag4,
    Angar,
    Okcli,
    Parts,
    Parintr,
    Waitrep,
    Repair,
    Release,
}

/// Canonical step ordering. Neighbours are derived from position, so the
/// previous/next links are values, never shared mutable state.
pub const STEP_ORDER: [StepId; 14] = [
    StepId::Ticke,
    StepId::Triag,
    StepId::Reloc,
    StepId::Diag2,
    StepId::Remoc,
    StepId::Diag3,
    StepId::Diag4,
    StepId::Angar,
    StepId::Okcli,
    StepId::Parts,
    StepId::Parintr,
    StepId::Waitrep,
    StepId::Repair,
    StepId::Release,
];

impl StepId {
    /// Database / wire code for this step.
    pub fn code(&self) -> &'static str {
        match self {
            StepId::Ticke => "TICKE",
            StepId::Triag => "TRIAG",
            StepId::Reloc => "RELOC",
            StepId::Diag2 => "DIAG2",
            StepId::Remoc => "REMOC",
            StepId::Diag3 => "DIAG3",
            StepId::Diag4 => "DIAG4",
            StepId::Angar => "ANGAR",
            StepId::Okcli => "OKCLI",
            StepId::Parts => "PARTS",
            StepId::Parintr => "PARINTR",
            StepId::Waitrep => "WAITREP",
            StepId::Repair => "REPAIR",
            StepId::Release => "RELEASE",
        }
    }

    /// Human label shown on boards and reports.
    pub fn label(&self) -> &'static str {
        match self {
            StepId::Ticke => "Ticket opened",
            StepId::Triag => "Triage",
            StepId::Reloc => "Relocation",
            StepId::Diag2 => "Remote diagnosis",
            StepId::Remoc => "Removal",
            StepId::Diag3 => "Workshop diagnosis",
            StepId::Diag4 => "Extended diagnosis",
            StepId::Angar => "In hangar",
            StepId::Okcli => "Customer approval",
            StepId::Parts => "Waiting for parts",
            StepId::Parintr => "Parts in transit",
            StepId::Waitrep => "Waiting for repair",
            StepId::Repair => "Under repair",
            StepId::Release => "Released",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        STEP_ORDER.iter().copied().find(|s| s.code() == code)
    }

    fn position(&self) -> usize {
        STEP_ORDER.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn previous(&self) -> Option<StepId> {
        self.position().checked_sub(1).map(|i| STEP_ORDER[i])
    }

    pub fn next(&self) -> Option<StepId> {
        STEP_ORDER.get(self.position() + 1).copied()
    }

    /// A step is terminal when the catalog has no successor for it.
    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }

    /// Map an external board-stage label to a step id.
    ///
    /// Unknown or missing labels fall back to the initial step.
    pub fn from_board_stage(label: Option<&str>) -> StepId {
        let label = match label {
            Some(l) => l.trim(),
            None => return StepId::Ticke,
        };
        match label.to_uppercase().as_str() {
            "TICKET" | "TICKE" | "OPEN" => StepId::Ticke,
            "TRIAGE" | "TRIAG" => StepId::Triag,
            "RELOCATION" | "RELOC" => StepId::Reloc,
            "REMOTE DIAGNOSIS" | "DIAG2" => StepId::Diag2,
            "REMOVAL" | "REMOC" => StepId::Remoc,
            "WORKSHOP DIAGNOSIS" | "DIAG3" => StepId::Diag3,
            "EXTENDED DIAGNOSIS" | "DIAG4" => StepId::Diag4,
            "HANGAR" | "ANGAR" => StepId::Angar,
            "CUSTOMER APPROVAL" | "OKCLI" => StepId::Okcli,
            "PARTS" | "WAITING PARTS" => StepId::Parts,
            "PARTS IN TRANSIT" | "PARINTR" => StepId::Parintr,
            "WAITING REPAIR" | "WAITREP" => StepId::Waitrep,
            "REPAIR" | "REPAIRING" => StepId::Repair,
            "RELEASE" | "RELEASED" | "DONE" => StepId::Release,
            _ => StepId::Ticke,
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Step record from database: one visit to a workflow stage.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Step {
    pub id: i64,
    pub occurrence_uuid: Uuid,
    pub step_id: String,
    pub dt_start: DateTime<Utc>,
    pub dt_end: Option<DateTime<Utc>>,
    /// Estimated duration in minutes.
    pub estimated_time: Option<i32>,
    pub expected_dt_end: Option<DateTime<Utc>>,
    pub report: Option<String>,
    pub observation: Option<String>,
    pub latest: i16,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Step summary for API responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StepSummary {
    pub id: i64,
    pub step_id: StepId,
    pub label: String,
    pub dt_start: DateTime<Utc>,
    pub dt_end: Option<DateTime<Utc>>,
    pub estimated_time: Option<i32>,
    pub expected_dt_end: Option<DateTime<Utc>>,
    pub report: Option<String>,
    pub observation: Option<String>,
    pub latest: bool,
}

impl From<Step> for StepSummary {
    fn from(s: Step) -> Self {
        let step_id = StepId::parse(&s.step_id).unwrap_or(StepId::Ticke);
        Self {
            id: s.id,
            step_id,
            label: step_id.label().to_string(),
            dt_start: s.dt_start,
            dt_end: s.dt_end,
            estimated_time: s.estimated_time,
            expected_dt_end: s.expected_dt_end,
            report: s.report,
            observation: s.observation,
            latest: s.latest == 1,
        }
    }
}

/// Result of a step transition.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransitionResult {
    pub step_id: StepId,
    pub estimated_time: Option<i32>,
    pub report: Option<String>,
    pub observation: Option<String>,
    pub dt_start: DateTime<Utc>,
    pub expected_dt_end: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_links() {
        assert_eq!(StepId::Ticke.previous(), None);
        assert_eq!(StepId::Ticke.next(), Some(StepId::Triag));
        assert_eq!(StepId::Parts.previous(), Some(StepId::Okcli));
        assert_eq!(StepId::Parts.next(), Some(StepId::Parintr));
        assert_eq!(StepId::Release.next(), None);
    }

    #[test]
    fn test_only_release_is_terminal() {
        let terminals: Vec<_> = STEP_ORDER.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminals, vec![&StepId::Release]);
    }

    #[test]
    fn test_parse_roundtrip() {
        for step in STEP_ORDER {
            assert_eq!(StepId::parse(step.code()), Some(step));
        }
        assert_eq!(StepId::parse("NOPE"), None);
    }

    #[test]
    fn test_board_stage_mapping() {
        assert_eq!(StepId::from_board_stage(Some("Triage")), StepId::Triag);
        assert_eq!(StepId::from_board_stage(Some("released")), StepId::Release);
        assert_eq!(StepId::from_board_stage(Some("  repair ")), StepId::Repair);
        // Unknown and missing labels default to the initial step
        assert_eq!(StepId::from_board_stage(Some("whatever")), StepId::Ticke);
        assert_eq!(StepId::from_board_stage(None), StepId::Ticke);
    }
}

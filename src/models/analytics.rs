//! Analytics filter, scope and response models

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Caller role used to resolve the implicit query scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    /// Fleet/tower operator: account-wide visibility.
    Tower,
    /// Dealership consultant: restricted to one dealership.
    Consultant,
    /// Customer: restricted to the customer's own account.
    Customer,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Tower => "tower",
            Persona::Consultant => "consultant",
            Persona::Customer => "customer",
        }
    }
}

/// Request-scoped authorization context resolved from the caller identity.
/// Passed explicitly into every aggregator call, never ambient state.
#[derive(Debug, Clone)]
pub struct ScopeContext {
    pub persona: Persona,
    pub subject: String,
    pub account_id: Option<String>,
    pub dn: Option<String>,
}

/// Common filter set for all aggregations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsFilter {
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub updated_from: Option<DateTime<Utc>>,
    pub updated_to: Option<DateTime<Utc>>,
    pub criticality: Option<i16>,
    pub occurrence_type: Option<String>,
    #[serde(default)]
    pub chassis: Vec<String>,
    #[serde(default)]
    pub dns: Vec<String>,
    pub campaign: Option<bool>,
    pub step: Option<String>,
    pub model: Option<String>,
    pub region: Option<String>,
    pub legislation: Option<String>,
}

fn validate_pair(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> AppResult<()> {
    match (start, end) {
        (None, None) => Ok(()),
        (Some(_), None) | (None, Some(_)) => Err(AppError::IncompleteDateRange),
        (Some(s), Some(e)) => {
            if s > e {
                return Err(AppError::InvalidRange(format!(
                    "start {} is after end {}",
                    s, e
                )));
            }
            let one_year_later = s
                .checked_add_months(Months::new(12))
                .ok_or(AppError::RangeTooLarge)?;
            if e > one_year_later {
                return Err(AppError::RangeTooLarge);
            }
            Ok(())
        }
    }
}

impl AnalyticsFilter {
    /// Validate both date-range pairs: complete, ordered, at most one year.
    pub fn validate(&self) -> AppResult<()> {
        validate_pair(self.created_from, self.created_to)?;
        validate_pair(self.updated_from, self.updated_to)?;
        Ok(())
    }
}

/// Grouping interval for time-bucketed counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Daily,
    Monthly,
}

/// Format a duration in seconds as "Nd Hh Mm".
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    format!("{}d {}h {}m", days, hours, minutes)
}

/// One count bucket.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatBucket {
    pub label: String,
    pub amount: i64,
}

/// One average-duration bucket.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DurationBucket {
    pub label: String,
    pub amount: i64,
    pub average_duration_seconds: i64,
    /// Same value formatted as "Nd Hh Mm".
    pub average_duration: String,
}

impl DurationBucket {
    pub fn new(label: String, amount: i64, average_duration_seconds: i64) -> Self {
        Self {
            label,
            amount,
            average_duration_seconds,
            average_duration: format_duration(average_duration_seconds),
        }
    }
}

/// Count + average-duration groupings along one dimension.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupedStats {
    pub amount: Vec<StatBucket>,
    pub average_duration: Vec<DurationBucket>,
}

/// Count of occurrences per step per period.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StepTimeBucket {
    pub period: String,
    pub step: String,
    pub amount: i64,
}

/// Average duration spent per step per vehicle model.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StepModelDuration {
    pub step: String,
    pub model: String,
    pub amount: i64,
    pub average_duration_seconds: i64,
    pub average_duration: String,
}

/// Per-dealership drill-down inside a fantasy-name group.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DealershipStats {
    pub dn: String,
    pub company_name: Option<String>,
    pub amount: i64,
    pub average_duration_seconds: i64,
    pub average_duration: String,
}

/// Top-level dealership grouping by fantasy name.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DealershipGroupStats {
    pub fantasy_name: String,
    pub amount: i64,
    pub average_duration_seconds: i64,
    pub average_duration: String,
    pub dealerships: Vec<DealershipStats>,
}

/// Per-customer (account) statistics.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerStats {
    pub account_id: String,
    pub amount: i64,
    pub average_duration_seconds: i64,
    pub average_duration: String,
}

/// Finished + in-progress combined totals.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Totals {
    pub finished: i64,
    pub in_progress: i64,
    pub total: i64,
    pub average_duration_seconds: i64,
    pub average_duration: String,
}

/// Classification of currently-open occurrences.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OperationalStats {
    pub not_started: i64,
    pub in_progress: i64,
    pub delayed: i64,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_half_open_range_is_incomplete() {
        let mut filter = AnalyticsFilter {
            created_from: Some(at(2025, 1, 1)),
            ..Default::default()
        };
        assert!(matches!(filter.validate(), Err(AppError::IncompleteDateRange)));

        filter.created_from = None;
        filter.created_to = Some(at(2025, 1, 1));
        assert!(matches!(filter.validate(), Err(AppError::IncompleteDateRange)));
    }

    #[test]
    fn test_start_after_end_is_invalid() {
        let filter = AnalyticsFilter {
            created_from: Some(at(2025, 6, 1)),
            created_to: Some(at(2025, 1, 1)),
            ..Default::default()
        };
        assert!(matches!(filter.validate(), Err(AppError::InvalidRange(_))));
    }

    #[test]
    fn test_twelve_months_pass_thirteen_fail() {
        let ok = AnalyticsFilter {
            created_from: Some(at(2024, 1, 1)),
            created_to: Some(at(2025, 1, 1)),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let too_large = AnalyticsFilter {
            created_from: Some(at(2024, 1, 1)),
            created_to: Some(at(2025, 2, 1)),
            ..Default::default()
        };
        assert!(matches!(too_large.validate(), Err(AppError::RangeTooLarge)));
    }

    #[test]
    fn test_updated_pair_also_validated() {
        let filter = AnalyticsFilter {
            updated_to: Some(at(2025, 1, 1)),
            ..Default::default()
        };
        assert!(matches!(filter.validate(), Err(AppError::IncompleteDateRange)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0d 0h 0m");
        assert_eq!(format_duration(59), "0d 0h 0m");
        assert_eq!(format_duration(3_660), "0d 1h 1m");
        assert_eq!(format_duration(90_000), "1d 1h 0m");
        assert_eq!(format_duration(-5), "0d 0h 0m");
    }
}

//! Analytics aggregation service
//!
//! Scope resolution, filter validation and caching sit here; the SQL
//! aggregations live in the analytics repository.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{
        analytics::{
            AnalyticsFilter, CustomerStats, DealershipGroupStats, GroupedStats, Interval,
            OperationalStats, Persona, ScopeContext, StepModelDuration, StepTimeBucket, Totals,
        },
        step::StepId,
    },
    repository::{
        analytics::{Dimension, OperationalRow},
        Repository,
    },
    services::{
        integrations::{IdentityClient, MaintenanceScheduleClient},
        redis::RedisService,
    },
};

/// Grace window applied when an occurrence has no usable scheduled date.
const DEFAULT_DEADLINE_HOURS: i64 = 24;

/// What the maintenance-schedule lookup yielded for one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScheduleLookup {
    /// No schedule linked.
    NotLinked,
    /// Schedule resolved with a scheduled date.
    Date(DateTime<Utc>),
    /// Schedule linked but the lookup failed or carried no date.
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationalClass {
    NotStarted,
    InProgress,
    Delayed,
}

/// Classify one open occurrence. A past scheduled date marks it delayed
/// regardless of progress; the 24-hour grace window only applies while no
/// step has been taken yet. Delayed wins over not-started.
pub(crate) fn classify(
    row: &OperationalRow,
    lookup: ScheduleLookup,
    now: DateTime<Utc>,
) -> OperationalClass {
    let on_opening_step = row
        .current_step
        .as_deref()
        .and_then(StepId::parse)
        .map_or(true, |s| s == StepId::Ticke);
    let not_started = row.step_count <= 1 && on_opening_step;

    let deadline = match lookup {
        ScheduleLookup::Date(date) => Some(date),
        ScheduleLookup::NotLinked | ScheduleLookup::Unresolved => {
            not_started.then(|| row.created_at + Duration::hours(DEFAULT_DEADLINE_HOURS))
        }
    };
    if deadline.is_some_and(|d| now > d) {
        return OperationalClass::Delayed;
    }

    if not_started {
        OperationalClass::NotStarted
    } else {
        OperationalClass::InProgress
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    repository: Repository,
    identity: Arc<dyn IdentityClient>,
    maintenance: Arc<dyn MaintenanceScheduleClient>,
    redis: RedisService,
    cache_ttl_seconds: u64,
}

impl AnalyticsService {
    pub fn new(
        repository: Repository,
        identity: Arc<dyn IdentityClient>,
        maintenance: Arc<dyn MaintenanceScheduleClient>,
        redis: RedisService,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            repository,
            identity,
            maintenance,
            redis,
            cache_ttl_seconds,
        }
    }

    /// Resolve the caller's query scope from the identity service. Tower
    /// callers see account-wide data; consultants and customers are
    /// narrowed to their dealership or account.
    pub async fn resolve_scope(&self, persona: Persona, subject: &str) -> AppResult<ScopeContext> {
        let resolved = self.identity.resolve_scope(persona, subject).await?;
        Ok(ScopeContext {
            persona,
            subject: subject.to_string(),
            account_id: resolved.account_id,
            dn: resolved.dn,
        })
    }

    pub async fn quantity_by_step(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
        interval: Interval,
    ) -> AppResult<Vec<StepTimeBucket>> {
        filter.validate()?;
        self.repository
            .analytics
            .quantity_by_step(scope, filter, interval)
            .await
    }

    pub async fn average_duration_by_step_and_model(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
    ) -> AppResult<Vec<StepModelDuration>> {
        filter.validate()?;
        self.repository
            .analytics
            .average_duration_by_step_and_model(scope, filter)
            .await
    }

    pub async fn stats_by_customer(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
    ) -> AppResult<Vec<CustomerStats>> {
        filter.validate()?;
        self.repository.analytics.stats_by_customer(scope, filter).await
    }

    pub async fn stats_by_dealership(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
    ) -> AppResult<Vec<DealershipGroupStats>> {
        filter.validate()?;
        self.repository.analytics.stats_by_dealership(scope, filter).await
    }

    pub async fn by_dimension(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
        dimension: Dimension,
    ) -> AppResult<GroupedStats> {
        filter.validate()?;
        self.repository
            .analytics
            .by_dimension(scope, filter, dimension)
            .await
    }

    pub async fn totals(&self, scope: &ScopeContext, filter: &AnalyticsFilter) -> AppResult<Totals> {
        filter.validate()?;

        let cache_key = cache_key("totals", scope, filter);
        if let Some(cached) = self.cached::<Totals>(&cache_key).await {
            return Ok(cached);
        }

        let totals = self.repository.analytics.totals(scope, filter).await?;
        self.store(&cache_key, &totals).await;
        Ok(totals)
    }

    /// Classify every open occurrence in scope as not-started, in-progress
    /// or delayed. Schedule lookups are best-effort: a failed lookup falls
    /// back to the default deadline instead of failing the aggregation.
    pub async fn operational_stats(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
    ) -> AppResult<OperationalStats> {
        filter.validate()?;

        let cache_key = cache_key("operational", scope, filter);
        if let Some(cached) = self.cached::<OperationalStats>(&cache_key).await {
            return Ok(cached);
        }

        let rows = self.repository.analytics.operational_rows(scope, filter).await?;
        let now = Utc::now();

        let mut stats = OperationalStats {
            not_started: 0,
            in_progress: 0,
            delayed: 0,
            total: rows.len() as i64,
        };
        for row in &rows {
            let lookup = match row.schedule_uuid {
                None => ScheduleLookup::NotLinked,
                Some(uuid) => match self.maintenance.get(uuid).await {
                    Ok(schedule) => schedule
                        .scheduled_date
                        .map(ScheduleLookup::Date)
                        .unwrap_or(ScheduleLookup::Unresolved),
                    Err(e) => {
                        tracing::warn!("Schedule lookup for {} failed: {}", uuid, e);
                        ScheduleLookup::Unresolved
                    }
                },
            };
            match classify(row, lookup, now) {
                OperationalClass::NotStarted => stats.not_started += 1,
                OperationalClass::InProgress => stats.in_progress += 1,
                OperationalClass::Delayed => stats.delayed += 1,
            }
        }

        self.store(&cache_key, &stats).await;
        Ok(stats)
    }

    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.redis.get_json(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Cache read for {} failed: {}", key, e);
                None
            }
        }
    }

    async fn store<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.redis.set_json(key, value, self.cache_ttl_seconds).await {
            tracing::warn!("Cache write for {} failed: {}", key, e);
        }
    }
}

fn cache_key(kind: &str, scope: &ScopeContext, filter: &AnalyticsFilter) -> String {
    // The filter serialization is stable enough for a cache key
    let filter_key = serde_json::to_string(filter).unwrap_or_default();
    format!(
        "analytics:{}:{}:{}:{}",
        kind,
        scope.persona.as_str(),
        scope.dn.as_deref().unwrap_or(scope.account_id.as_deref().unwrap_or("all")),
        filter_key
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn row(created_at: DateTime<Utc>, current_step: Option<&str>, step_count: i64) -> OperationalRow {
        OperationalRow {
            uuid: Uuid::new_v4(),
            schedule_uuid: None,
            created_at,
            current_step: current_step.map(String::from),
            step_count,
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_on_opening_step_is_not_started() {
        let r = row(at(8), Some("TICKE"), 1);
        assert_eq!(
            classify(&r, ScheduleLookup::NotLinked, at(10)),
            OperationalClass::NotStarted
        );
    }

    #[test]
    fn test_no_steps_is_not_started() {
        let r = row(at(8), None, 0);
        assert_eq!(
            classify(&r, ScheduleLookup::NotLinked, at(9)),
            OperationalClass::NotStarted
        );
    }

    #[test]
    fn test_advanced_step_is_in_progress() {
        let r = row(at(8), Some("DIAG3"), 3);
        assert_eq!(
            classify(&r, ScheduleLookup::NotLinked, at(12)),
            OperationalClass::InProgress
        );
    }

    #[test]
    fn test_past_scheduled_date_is_delayed() {
        let r = row(at(8), Some("DIAG3"), 3);
        assert_eq!(
            classify(&r, ScheduleLookup::Date(at(9)), at(10)),
            OperationalClass::Delayed
        );
    }

    #[test]
    fn test_delayed_wins_over_not_started() {
        let r = row(at(8), Some("TICKE"), 1);
        assert_eq!(
            classify(&r, ScheduleLookup::Date(at(9)), at(10)),
            OperationalClass::Delayed
        );
    }

    #[test]
    fn test_unresolved_schedule_uses_default_deadline() {
        let created = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let r = row(created, Some("TICKE"), 1);
        let within = created + Duration::hours(23);
        let past = created + Duration::hours(25);
        assert_eq!(
            classify(&r, ScheduleLookup::Unresolved, within),
            OperationalClass::NotStarted
        );
        assert_eq!(
            classify(&r, ScheduleLookup::Unresolved, past),
            OperationalClass::Delayed
        );
    }

    #[test]
    fn test_grace_window_does_not_delay_occurrence_with_progress() {
        let created = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let r = row(created, Some("DIAG3"), 3);
        let past = created + Duration::hours(30);
        assert_eq!(
            classify(&r, ScheduleLookup::Unresolved, past),
            OperationalClass::InProgress
        );
        assert_eq!(
            classify(&r, ScheduleLookup::NotLinked, past),
            OperationalClass::InProgress
        );
    }
}

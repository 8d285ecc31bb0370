//! Read-only aggregation queries over the occurrence store
//!
//! Every query is scoped by the caller's resolved authorization context and
//! the common filter set. Filters are appended with a query builder so the
//! bind positions always line up with the conditions.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::analytics::{
        AnalyticsFilter, CustomerStats, DealershipGroupStats, DealershipStats, DurationBucket,
        GroupedStats, Interval, ScopeContext, StatBucket, StepModelDuration, StepTimeBucket,
        Totals, format_duration,
    },
};

/// Dimension for the amount/average-duration groupings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Legislation,
    Model,
    State,
    City,
    Step,
}

impl Dimension {
    /// SQL expression producing the grouping label.
    fn label_expr(&self) -> &'static str {
        match self {
            Dimension::Legislation => "COALESCE(o.vehicle->>'legislation', 'unknown')",
            Dimension::Model => "COALESCE(o.vehicle->>'model', 'unknown')",
            Dimension::State => "COALESCE(o.dealership->>'state', 'unknown')",
            Dimension::City => "COALESCE(o.dealership->>'city', 'unknown')",
            Dimension::Step => "COALESCE(o.current_step, 'unknown')",
        }
    }
}

/// Inputs for the operational classification of open occurrences.
#[derive(Debug, Clone)]
pub struct OperationalRow {
    pub uuid: Uuid,
    pub schedule_uuid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub current_step: Option<String>,
    pub step_count: i64,
}

#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: Pool<Postgres>,
}

/// Append the scope and filter conditions. Callers open with a WHERE that
/// is always true so every condition can start with AND.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: &ScopeContext, filter: &AnalyticsFilter) {
    if let Some(dn) = &scope.dn {
        qb.push(" AND o.dn = ").push_bind(dn.clone());
    }
    if let Some(account_id) = &scope.account_id {
        qb.push(" AND o.account_id = ").push_bind(account_id.clone());
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND o.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        qb.push(" AND o.created_at <= ").push_bind(to);
    }
    if let Some(from) = filter.updated_from {
        qb.push(" AND o.updated_at >= ").push_bind(from);
    }
    if let Some(to) = filter.updated_to {
        qb.push(" AND o.updated_at <= ").push_bind(to);
    }
    if let Some(criticality) = filter.criticality {
        qb.push(" AND o.criticality = ").push_bind(criticality);
    }
    if let Some(occurrence_type) = &filter.occurrence_type {
        qb.push(" AND o.occurrence_type = ").push_bind(occurrence_type.clone());
    }
    if !filter.chassis.is_empty() {
        qb.push(" AND o.chassis = ANY(").push_bind(filter.chassis.clone()).push(")");
    }
    if !filter.dns.is_empty() {
        qb.push(" AND o.dn = ANY(").push_bind(filter.dns.clone()).push(")");
    }
    if let Some(campaign) = filter.campaign {
        qb.push(" AND o.campaign = ").push_bind(campaign);
    }
    if let Some(step) = &filter.step {
        qb.push(" AND o.current_step = ").push_bind(step.clone());
    }
    if let Some(model) = &filter.model {
        qb.push(" AND o.vehicle->>'model' = ").push_bind(model.clone());
    }
    if let Some(region) = &filter.region {
        qb.push(" AND o.dealership->>'region' = ").push_bind(region.clone());
    }
    if let Some(legislation) = &filter.legislation {
        qb.push(" AND o.vehicle->>'legislation' = ").push_bind(legislation.clone());
    }
}

impl AnalyticsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Occurrence counts per step per period
    pub async fn quantity_by_step(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
        interval: Interval,
    ) -> AppResult<Vec<StepTimeBucket>> {
        let (trunc, fmt) = match interval {
            Interval::Daily => ("day", "YYYY-MM-DD"),
            Interval::Monthly => ("month", "YYYY-MM"),
        };

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT to_char(date_trunc('{trunc}', o.created_at), '{fmt}') AS period,
                   COALESCE(o.current_step, 'unknown') AS step,
                   COUNT(*) AS amount
            FROM occurrences o
            WHERE TRUE
            "#
        ));
        push_filters(&mut qb, scope, filter);
        qb.push(" GROUP BY 1, 2 ORDER BY 1, 2");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| StepTimeBucket {
                period: row.get("period"),
                step: row.get("step"),
                amount: row.get("amount"),
            })
            .collect())
    }

    /// Average time spent per step per vehicle model, over closed step visits
    pub async fn average_duration_by_step_and_model(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
    ) -> AppResult<Vec<StepModelDuration>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT s.step_id AS step,
                   COALESCE(o.vehicle->>'model', 'unknown') AS model,
                   COUNT(*) AS amount,
                   COALESCE(AVG(EXTRACT(EPOCH FROM (s.dt_end - s.dt_start))), 0)::bigint AS avg_seconds
            FROM occurrence_steps s
            JOIN occurrences o ON o.uuid = s.occurrence_uuid
            WHERE s.dt_end IS NOT NULL
            "#,
        );
        push_filters(&mut qb, scope, filter);
        qb.push(" GROUP BY 1, 2 ORDER BY 1, 2");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let avg: i64 = row.get("avg_seconds");
                StepModelDuration {
                    step: row.get("step"),
                    model: row.get("model"),
                    amount: row.get("amount"),
                    average_duration_seconds: avg,
                    average_duration: format_duration(avg),
                }
            })
            .collect())
    }

    /// Counts and average case duration grouped by customer account
    pub async fn stats_by_customer(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
    ) -> AppResult<Vec<CustomerStats>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT COALESCE(o.account_id, 'unknown') AS account_id,
                   COUNT(*) AS amount,
                   COALESCE(AVG(EXTRACT(EPOCH FROM (o.end_date - o.created_at)))
                            FILTER (WHERE o.end_date IS NOT NULL), 0)::bigint AS avg_seconds
            FROM occurrences o
            WHERE TRUE
            "#,
        );
        push_filters(&mut qb, scope, filter);
        qb.push(" GROUP BY 1 ORDER BY amount DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let avg: i64 = row.get("avg_seconds");
                CustomerStats {
                    account_id: row.get("account_id"),
                    amount: row.get("amount"),
                    average_duration_seconds: avg,
                    average_duration: format_duration(avg),
                }
            })
            .collect())
    }

    /// Nested dealership stats: grouped by fantasy name at the top level,
    /// with a per-dn drill-down inside each group
    pub async fn stats_by_dealership(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
    ) -> AppResult<Vec<DealershipGroupStats>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT COALESCE(d.fantasy_name, 'unknown') AS fantasy_name,
                   COALESCE(o.dn, 'unknown') AS dn,
                   MAX(d.company_name) AS company_name,
                   COUNT(*) AS amount,
                   COALESCE(AVG(EXTRACT(EPOCH FROM (o.end_date - o.created_at)))
                            FILTER (WHERE o.end_date IS NOT NULL), 0)::bigint AS avg_seconds
            FROM occurrences o
            LEFT JOIN dealerships d ON d.dn = o.dn
            WHERE TRUE
            "#,
        );
        push_filters(&mut qb, scope, filter);
        qb.push(" GROUP BY 1, 2 ORDER BY 1, 2");

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut groups: Vec<DealershipGroupStats> = Vec::new();
        for row in rows {
            let fantasy_name: String = row.get("fantasy_name");
            let avg: i64 = row.get("avg_seconds");
            let amount: i64 = row.get("amount");
            let per_dn = DealershipStats {
                dn: row.get("dn"),
                company_name: row.get("company_name"),
                amount,
                average_duration_seconds: avg,
                average_duration: format_duration(avg),
            };

            match groups.last_mut() {
                Some(group) if group.fantasy_name == fantasy_name => {
                    // Group average weighted by per-dealership volume
                    let total = group.amount + amount;
                    let combined = (group.average_duration_seconds * group.amount
                        + avg * amount)
                        / total.max(1);
                    group.amount = total;
                    group.average_duration_seconds = combined;
                    group.average_duration = format_duration(combined);
                    group.dealerships.push(per_dn);
                }
                _ => groups.push(DealershipGroupStats {
                    fantasy_name,
                    amount,
                    average_duration_seconds: avg,
                    average_duration: format_duration(avg),
                    dealerships: vec![per_dn],
                }),
            }
        }
        Ok(groups)
    }

    /// Amount + average-duration groupings along one dimension
    pub async fn by_dimension(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
        dimension: Dimension,
    ) -> AppResult<GroupedStats> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            r#"
            SELECT {} AS label,
                   COUNT(*) AS amount,
                   COALESCE(AVG(EXTRACT(EPOCH FROM (o.end_date - o.created_at)))
                            FILTER (WHERE o.end_date IS NOT NULL), 0)::bigint AS avg_seconds
            FROM occurrences o
            WHERE TRUE
            "#,
            dimension.label_expr()
        ));
        push_filters(&mut qb, scope, filter);
        qb.push(" GROUP BY 1 ORDER BY amount DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut amount = Vec::with_capacity(rows.len());
        let mut average_duration = Vec::with_capacity(rows.len());
        for row in rows {
            let label: String = row.get("label");
            let count: i64 = row.get("amount");
            let avg: i64 = row.get("avg_seconds");
            amount.push(StatBucket {
                label: label.clone(),
                amount: count,
            });
            average_duration.push(DurationBucket::new(label, count, avg));
        }

        Ok(GroupedStats {
            amount,
            average_duration,
        })
    }

    /// Finished + in-progress combined totals
    pub async fn totals(&self, scope: &ScopeContext, filter: &AnalyticsFilter) -> AppResult<Totals> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT COUNT(*) FILTER (WHERE o.end_date IS NOT NULL) AS finished,
                   COUNT(*) FILTER (WHERE o.end_date IS NULL) AS in_progress,
                   COALESCE(AVG(EXTRACT(EPOCH FROM (o.end_date - o.created_at)))
                            FILTER (WHERE o.end_date IS NOT NULL), 0)::bigint AS avg_seconds
            FROM occurrences o
            WHERE TRUE
            "#,
        );
        push_filters(&mut qb, scope, filter);

        let row = qb.build().fetch_one(&self.pool).await?;
        let finished: i64 = row.get("finished");
        let in_progress: i64 = row.get("in_progress");
        let avg: i64 = row.get("avg_seconds");

        Ok(Totals {
            finished,
            in_progress,
            total: finished + in_progress,
            average_duration_seconds: avg,
            average_duration: format_duration(avg),
        })
    }

    /// Classification inputs for every currently-open occurrence in scope
    pub async fn operational_rows(
        &self,
        scope: &ScopeContext,
        filter: &AnalyticsFilter,
    ) -> AppResult<Vec<OperationalRow>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT o.uuid, o.schedule_uuid, o.created_at, o.current_step,
                   (SELECT COUNT(*) FROM occurrence_steps s
                    WHERE s.occurrence_uuid = o.uuid) AS step_count
            FROM occurrences o
            WHERE o.end_date IS NULL
            "#,
        );
        push_filters(&mut qb, scope, filter);

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| OperationalRow {
                uuid: row.get("uuid"),
                schedule_uuid: row.get("schedule_uuid"),
                created_at: row.get("created_at"),
                current_step: row.get("current_step"),
                step_count: row.get("step_count"),
            })
            .collect())
    }
}

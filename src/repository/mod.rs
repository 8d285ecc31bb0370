//! Repository layer for database operations

pub mod analytics;
pub mod dealerships;
pub mod dispatches;
pub mod occurrences;
pub mod reviews;
pub mod service_bays;
pub mod steps;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub occurrences: occurrences::OccurrencesRepository,
    pub steps: steps::StepsRepository,
    pub dispatches: dispatches::DispatchesRepository,
    pub service_bays: service_bays::ServiceBaysRepository,
    pub dealerships: dealerships::DealershipsRepository,
    pub reviews: reviews::ReviewsRepository,
    pub analytics: analytics::AnalyticsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            occurrences: occurrences::OccurrencesRepository::new(pool.clone()),
            steps: steps::StepsRepository::new(pool.clone()),
            dispatches: dispatches::DispatchesRepository::new(pool.clone()),
            service_bays: service_bays::ServiceBaysRepository::new(pool.clone()),
            dealerships: dealerships::DealershipsRepository::new(pool.clone()),
            reviews: reviews::ReviewsRepository::new(pool.clone()),
            analytics: analytics::AnalyticsRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Constraint name of a database error, if any. Used to translate the
/// storage-level invariants into domain errors.
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.constraint().map(|c| c.to_string()),
        _ => None,
    }
}

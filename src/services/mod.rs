//! Business logic services

pub mod analytics;
pub mod dispatch;
pub mod import;
pub mod integrations;
pub mod lifecycle;
pub mod redis;
pub mod reviews;
pub mod scheduling;
pub mod step_opener;
pub mod transitions;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub lifecycle: lifecycle::LifecycleService,
    pub transitions: transitions::TransitionService,
    pub dispatch: dispatch::DispatchService,
    pub scheduling: scheduling::SchedulingService,
    pub step_opener: step_opener::StepOpenerService,
    pub import: import::ImportService,
    pub analytics: analytics::AnalyticsService,
    pub reviews: reviews::ReviewsService,
    pub redis: redis::RedisService,
}

impl Services {
    /// Wire every service against the repository and the shared HTTP
    /// integration clients
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        redis_service: redis::RedisService,
    ) -> AppResult<Self> {
        let http = Arc::new(integrations::HttpIntegrations::new(
            config.integrations.clone(),
        )?);

        let scheduling = scheduling::SchedulingService::new(repository.clone());
        let lifecycle = lifecycle::LifecycleService::new(
            repository.clone(),
            scheduling.clone(),
            http.clone(),
            http.clone(),
            http.clone(),
        );

        Ok(Self {
            transitions: transitions::TransitionService::new(
                repository.clone(),
                config.workflow.strict_transitions,
            ),
            dispatch: dispatch::DispatchService::new(repository.clone()),
            step_opener: step_opener::StepOpenerService::new(
                repository.clone(),
                config.jobs.step_opener_window_minutes,
            ),
            import: import::ImportService::new(repository.clone(), lifecycle.clone()),
            analytics: analytics::AnalyticsService::new(
                repository.clone(),
                http.clone(),
                http,
                redis_service.clone(),
                config.redis.analytics_cache_ttl_seconds,
            ),
            reviews: reviews::ReviewsService::new(repository.clone()),
            repository,
            scheduling,
            lifecycle,
            redis: redis_service,
        })
    }
}

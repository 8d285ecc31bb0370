//! Background reconciliation job opening missing initial steps
//!
//! Occurrences are expected to get their TICKE step at creation time; this
//! job is the safety net for the ones that did not. It scans a trailing
//! window for stepless occurrences and opens their initial step. Because it
//! only selects occurrences with zero steps, a rerun is a no-op for
//! already-fixed records.

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::repository::Repository;

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OpenerReport {
    pub processed: u32,
    pub errors: u32,
}

#[derive(Clone)]
pub struct StepOpenerService {
    repository: Repository,
    window_minutes: i64,
}

impl StepOpenerService {
    pub fn new(repository: Repository, window_minutes: i64) -> Self {
        Self {
            repository,
            window_minutes,
        }
    }

    /// One reconciliation pass. Each occurrence is processed independently;
    /// failures are counted, never propagated, so the run always completes.
    pub async fn run(&self) -> OpenerReport {
        let now = Utc::now();
        let from = now - Duration::minutes(self.window_minutes);

        let candidates = match self
            .repository
            .occurrences
            .find_stepless_in_window(from, now)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!("Step opener selection query failed: {}", e);
                return OpenerReport {
                    processed: 0,
                    errors: 1,
                };
            }
        };

        let mut report = OpenerReport::default();
        for uuid in candidates {
            match self.repository.steps.open_initial(uuid, now).await {
                Ok(true) => {
                    tracing::info!("Opened initial step for occurrence {}", uuid);
                    report.processed += 1;
                }
                // Lost the race against a concurrent create: already fixed
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Failed to open initial step for {}: {}", uuid, e);
                    report.errors += 1;
                }
            }
        }

        tracing::info!(
            "Step opener run complete: processed={} errors={}",
            report.processed,
            report.errors
        );
        report
    }

    /// Spawn the periodic task. The first tick fires immediately, which
    /// doubles as a startup reconciliation.
    pub fn spawn(self, period_minutes: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(period_minutes * 60));
            loop {
                interval.tick().await;
                self.run().await;
            }
        })
    }
}

//! Step transition service

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::step::{StepId, TransitionResult},
    repository::Repository,
};

#[derive(Clone)]
pub struct TransitionService {
    repository: Repository,
    /// When set, targets are restricted to the catalog previous/next of
    /// the current step.
    strict: bool,
}

impl TransitionService {
    pub fn new(repository: Repository, strict: bool) -> Self {
        Self { repository, strict }
    }

    /// Move the occurrence to the target step.
    ///
    /// Any target except the current step id is accepted (unless strict
    /// mode restricts to neighbours). Leaving the terminal step of a closed
    /// occurrence reopens it.
    pub async fn transition(
        &self,
        uuid: Uuid,
        target: StepId,
        actor: Option<&str>,
    ) -> AppResult<TransitionResult> {
        let occurrence = self.repository.occurrences.get_by_uuid(uuid).await?;

        let current_step = self
            .repository
            .steps
            .latest(uuid)
            .await?
            .ok_or(AppError::NoCurrentStep)?;
        let current = StepId::parse(&current_step.step_id)
            .ok_or_else(|| AppError::Internal(format!("unknown step id {}", current_step.step_id)))?;

        if current == target {
            return Err(AppError::SameStep(target.code().to_string()));
        }

        if self.strict
            && current.previous() != Some(target)
            && current.next() != Some(target)
        {
            return Err(AppError::TransitionNotAllowed {
                from: current.code().to_string(),
                to: target.code().to_string(),
            });
        }

        let reopens = current.is_terminal() && occurrence.is_closed();
        if reopens {
            tracing::info!("Reopening closed occurrence {} by leaving {}", uuid, current);
        }

        self.repository
            .steps
            .transition(uuid, target, reopens, actor, Utc::now())
            .await
    }

    /// Close one specific step record by its own id, then open a new step
    /// of the target id. `from_step_record_id = None` means there is no
    /// step to close (pure open).
    pub async fn change_step_by_ids(
        &self,
        uuid: Uuid,
        from_step_record_id: Option<i64>,
        target: StepId,
        actor: &str,
    ) -> AppResult<TransitionResult> {
        // Resolve first so a bad uuid reports OccurrenceNotFound
        self.repository.occurrences.get_by_uuid(uuid).await?;

        self.repository
            .steps
            .change_step_by_ids(uuid, from_step_record_id, target, Some(actor), Utc::now())
            .await
    }
}

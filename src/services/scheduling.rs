//! Service bay scheduling

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::service_bay::{BookSchedule, ScheduleDetails, ScheduleSummary},
    repository::Repository,
};

#[derive(Clone)]
pub struct SchedulingService {
    repository: Repository,
}

impl SchedulingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Book a bay for an occurrence over [start, end).
    pub async fn book(&self, request: BookSchedule, actor: Option<&str>) -> AppResult<ScheduleSummary> {
        self.book_for_occurrence(
            request.occurrence_uuid,
            request.service_bay_id,
            request.start_date,
            request.end_date,
            request.dn.as_deref(),
            actor,
        )
        .await
    }

    pub(crate) async fn book_for_occurrence(
        &self,
        occurrence_uuid: Uuid,
        service_bay_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        dn: Option<&str>,
        actor: Option<&str>,
    ) -> AppResult<ScheduleSummary> {
        if start >= end {
            return Err(AppError::InvalidRange(format!(
                "start {} must be before end {}",
                start, end
            )));
        }

        let occurrence = self.repository.occurrences.get_by_uuid(occurrence_uuid).await?;
        let dn = dn
            .map(|d| d.to_string())
            .or_else(|| occurrence.dn.clone())
            .ok_or_else(|| AppError::Validation("dealership dn required".to_string()))?;

        let bay = self.repository.service_bays.get_active_bay(service_bay_id, &dn).await?;

        // Check-then-act for precise errors; the storage constraints are
        // the authoritative guard under concurrency.
        if self
            .repository
            .service_bays
            .overlap_exists(bay.id, start, end)
            .await?
        {
            return Err(AppError::ServiceBayConflict);
        }
        if self
            .repository
            .service_bays
            .active_exists_for_occurrence(occurrence_uuid)
            .await?
        {
            return Err(AppError::ServiceBayWithOccurrenceExists);
        }

        let schedule = self
            .repository
            .service_bays
            .insert_schedule(bay.id, occurrence_uuid, &dn, start, end, actor)
            .await?;

        tracing::info!(
            "Booked bay {} for occurrence {} from {} to {}",
            bay.id,
            occurrence_uuid,
            start,
            end
        );
        Ok(schedule.into())
    }

    /// Schedules overlapping the range for a dealership, optionally
    /// restricted to a bay subset.
    pub async fn list(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        dn: &str,
        bay_ids: Option<&[i64]>,
    ) -> AppResult<Vec<ScheduleDetails>> {
        if start >= end {
            return Err(AppError::InvalidRange(format!(
                "start {} must be before end {}",
                start, end
            )));
        }
        self.repository.service_bays.list(start, end, dn, bay_ids).await
    }

    /// Deactivate a schedule
    pub async fn cancel(&self, schedule_id: i64, dn: &str) -> AppResult<ScheduleSummary> {
        let schedule = self.repository.service_bays.cancel(schedule_id, dn).await?;
        Ok(schedule.into())
    }

    /// Active schedule of an occurrence
    pub async fn get_by_occurrence(&self, occurrence_uuid: Uuid, dn: &str) -> AppResult<ScheduleSummary> {
        let schedule = self
            .repository
            .service_bays
            .get_by_occurrence(occurrence_uuid, dn)
            .await?;
        Ok(schedule.into())
    }
}

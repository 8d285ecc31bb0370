//! Bulk import of occurrences from the external data feed

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        import_report::{ImportRecord, ImportRecordResult},
        occurrence::{CreateOccurrence, UpdateOccurrence},
        step::StepId,
    },
    repository::Repository,
    services::lifecycle::LifecycleService,
};

const IMPORT_ACTOR: &str = "batch-import";

#[derive(Clone)]
pub struct ImportService {
    repository: Repository,
    lifecycle: LifecycleService,
}

impl ImportService {
    pub fn new(repository: Repository, lifecycle: LifecycleService) -> Self {
        Self {
            repository,
            lifecycle,
        }
    }

    /// Import a batch of records, returning one result per record.
    ///
    /// A failure while processing a record deletes whatever part of the
    /// occurrence was already created, so a failed import never leaves a
    /// half-built occurrence behind.
    pub async fn import_batch(
        &self,
        records: Vec<ImportRecord>,
        replace_existing: bool,
    ) -> Vec<ImportRecordResult> {
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let id = record.id.clone();
            if record.os_number.as_deref().map_or(true, |n| n.trim().is_empty()) {
                results.push(ImportRecordResult::failed(
                    id,
                    "external occurrence number missing",
                ));
                continue;
            }

            match self.import_record(&record, replace_existing).await {
                Ok(uuid) => results.push(ImportRecordResult::ok(id, uuid)),
                Err((error, created)) => {
                    if let Some(uuid) = created {
                        if let Err(e) = self.repository.occurrences.delete_by_uuid(uuid).await {
                            tracing::error!(
                                "Rollback of partially-imported occurrence {} failed: {}",
                                uuid,
                                e
                            );
                        }
                    }
                    tracing::warn!("Import of record {} failed: {}", id, error);
                    results.push(ImportRecordResult::failed(id, error.to_string()));
                }
            }
        }

        results
    }

    /// Delete a batch of records by external occurrence number. A missing
    /// record is a successful no-op.
    pub async fn delete_batch(&self, records: Vec<ImportRecord>) -> Vec<ImportRecordResult> {
        let mut results = Vec::with_capacity(records.len());

        for record in records {
            let id = record.id.clone();
            let Some(os_number) = record.os_number.as_deref() else {
                results.push(ImportRecordResult::deleted(id));
                continue;
            };

            let outcome = self.delete_by_os_number(os_number).await;
            match outcome {
                Ok(()) => results.push(ImportRecordResult::deleted(id)),
                Err(e) => results.push(ImportRecordResult::failed(id, e.to_string())),
            }
        }

        results
    }

    async fn delete_by_os_number(&self, os_number: &str) -> AppResult<()> {
        if let Some(existing) = self.repository.occurrences.find_by_os_number(os_number).await? {
            self.repository.occurrences.delete_by_uuid(existing.uuid).await?;
        }
        Ok(())
    }

    /// One record: replace-or-reject duplicates, upsert the dealership,
    /// create + update the occurrence, then open the board-stage step.
    /// On failure, returns the uuid of the already-created occurrence (if
    /// any) so the caller can roll it back.
    async fn import_record(
        &self,
        record: &ImportRecord,
        replace_existing: bool,
    ) -> Result<Uuid, (AppError, Option<Uuid>)> {
        let os_number = record.os_number.as_deref().unwrap_or_default();

        let existing = self
            .repository
            .occurrences
            .find_by_os_number(os_number)
            .await
            .map_err(|e| (e, None))?;
        if let Some(existing) = existing {
            if !replace_existing {
                return Err((AppError::AlreadyExists(os_number.to_string()), None));
            }
            self.repository
                .occurrences
                .delete_by_uuid(existing.uuid)
                .await
                .map_err(|e| (e, None))?;
        }

        let dn = record
            .dn
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| (AppError::Validation("dealership dn missing".to_string()), None))?;
        let chassis = record
            .chassis
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| (AppError::Validation("chassis missing".to_string()), None))?;

        // Deliberate upsert: unknown dealerships become placeholder records
        self.repository
            .dealerships
            .ensure_exists(dn)
            .await
            .map_err(|e| (e, None))?;

        let create = CreateOccurrence {
            os_number: Some(os_number.to_string()),
            chassis: chassis.to_string(),
            criticality: record.criticality,
            status: record.status.clone(),
            country: record.country.clone(),
            occurrence_type: record.occurrence_type.clone(),
            main_occurrence: record.main_occurrence.clone(),
            source: record.source.clone(),
            campaign: record.campaign,
            dn: dn.to_string(),
            vehicle: record.vehicle.clone(),
            driver: record.driver.clone(),
            ..Default::default()
        };

        // Ticketing is skipped for imported cases
        let uuid = self
            .lifecycle
            .create(create, IMPORT_ACTOR, true)
            .await
            .map_err(|e| (e, None))?;

        let update = UpdateOccurrence {
            observation: record.observation.clone(),
            report: record.report.clone(),
            dtcs: record.dtcs.clone(),
            extra_lists: record.extra_lists.clone(),
            ..Default::default()
        };
        self.lifecycle
            .update(uuid, update, IMPORT_ACTOR)
            .await
            .map_err(|e| (e, Some(uuid)))?;

        // Open the step implied by the board stage; the TICKE step closes
        // at the new step's start
        let target = StepId::from_board_stage(record.board_stage.as_deref());
        if target != StepId::Ticke {
            self.repository
                .steps
                .transition(uuid, target, false, Some(IMPORT_ACTOR), Utc::now())
                .await
                .map_err(|e| (e, Some(uuid)))?;
        }

        Ok(uuid)
    }
}

//! Occurrence lifecycle service: create, update, finalize, delete

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::types::Json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        occurrence::{
            CascadeStatus, CreateOccurrence, DealershipSnapshot, FinalizeOutcome,
            FinalizeRequest, Occurrence, OccurrenceDetails, UpdateOccurrence, Vehicle,
        },
        step::StepId,
    },
    repository::{occurrences::StepPatch, Repository},
    services::{
        integrations::{AssetClient, MaintenanceScheduleClient, TicketingClient},
        scheduling::SchedulingService,
    },
};

/// 17-character VIN, excluding I, O and Q.
static VIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").unwrap());

/// Best-effort cascade to the externally-owned maintenance schedule.
/// Never fails the finalization; a failure is logged and reported in the
/// outcome.
pub(crate) async fn cascade_finish(
    maintenance: &dyn MaintenanceScheduleClient,
    schedule_uuid: Option<Uuid>,
    checkout_date: DateTime<Utc>,
    service_order_number: Option<String>,
) -> CascadeStatus {
    let Some(schedule_uuid) = schedule_uuid else {
        return CascadeStatus::NotLinked;
    };

    match maintenance
        .finish(schedule_uuid, checkout_date, service_order_number)
        .await
    {
        Ok(()) => CascadeStatus::Updated,
        Err(e) => {
            tracing::warn!(
                "Failed to finish linked maintenance schedule {}: {}",
                schedule_uuid,
                e
            );
            CascadeStatus::Failed
        }
    }
}

#[derive(Clone)]
pub struct LifecycleService {
    repository: Repository,
    scheduling: SchedulingService,
    assets: Arc<dyn AssetClient>,
    ticketing: Arc<dyn TicketingClient>,
    maintenance: Arc<dyn MaintenanceScheduleClient>,
}

impl LifecycleService {
    pub fn new(
        repository: Repository,
        scheduling: SchedulingService,
        assets: Arc<dyn AssetClient>,
        ticketing: Arc<dyn TicketingClient>,
        maintenance: Arc<dyn MaintenanceScheduleClient>,
    ) -> Self {
        Self {
            repository,
            scheduling,
            assets,
            ticketing,
            maintenance,
        }
    }

    /// Create an occurrence: resolve the dealership and vehicle asset,
    /// assemble the aggregate with its first TICKE step, optionally book a
    /// service bay and forward the case to the ticketing integration.
    pub async fn create(
        &self,
        request: CreateOccurrence,
        actor: &str,
        skip_ticketing: bool,
    ) -> AppResult<Uuid> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let chassis = request.chassis.trim().to_uppercase();
        if !VIN_RE.is_match(&chassis) {
            return Err(AppError::Validation(format!("invalid chassis: {}", chassis)));
        }

        let dealership = self.repository.dealerships.require_by_dn(&request.dn).await?;

        if self.repository.occurrences.has_open_for_chassis(&chassis).await? {
            return Err(AppError::OccurrenceNotFinished(chassis));
        }

        // Asset resolution is best-effort: a failure degrades to null ids.
        let asset_ids = match self.assets.resolve_chassis(&chassis).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Asset resolution failed for chassis {}: {}", chassis, e);
                Default::default()
            }
        };

        let now = Utc::now();
        let uuid = Uuid::new_v4();

        let mut vehicle = request.vehicle.unwrap_or_else(|| Vehicle {
            chassis: Some(chassis.clone()),
            ..Default::default()
        });
        vehicle.chassis.get_or_insert_with(|| chassis.clone());

        let occurrence = Occurrence {
            uuid,
            os_number: request.os_number,
            protocol_number: None,
            chassis: chassis.clone(),
            current_step: Some(StepId::Ticke.code().to_string()),
            criticality: request.criticality,
            status: request.status,
            observation: request.observation,
            report: request.report,
            solution_proposed: None,
            country: request.country,
            occurrence_type: request.occurrence_type,
            main_occurrence: request.main_occurrence,
            source: request.source,
            campaign: request.campaign,
            vehicle: Some(Json(vehicle)),
            driver: request.driver.map(Json),
            dealership: Some(Json(DealershipSnapshot {
                dn: Some(dealership.dn.clone()),
                company_name: Some(dealership.company_name.clone()),
                fantasy_name: dealership.fantasy_name.clone(),
                region: dealership.region.clone(),
                state: dealership.state.clone(),
                city: dealership.city.clone(),
            })),
            part_order: None,
            dtcs: request.dtcs.map(Json),
            extra_lists: None,
            dn: Some(dealership.dn.clone()),
            asset_id: asset_ids.asset_id,
            account_id: asset_ids.account_id,
            schedule_uuid: request.schedule_uuid,
            finalization_reason_type: None,
            finalization_reason_description: None,
            created_by: Some(actor.to_string()),
            updated_by: Some(actor.to_string()),
            created_at: now,
            updated_at: now,
            end_date: None,
        };

        self.repository.occurrences.create(&occurrence).await?;

        if let Some(schedule) = request.schedule {
            let booked = self
                .scheduling
                .book_for_occurrence(
                    uuid,
                    schedule.service_bay_id,
                    schedule.start_date,
                    schedule.end_date,
                    Some(&dealership.dn),
                    Some(actor),
                )
                .await;
            // The aggregate and its booking commit or fail together.
            if let Err(e) = booked {
                self.repository.occurrences.delete_by_uuid(uuid).await?;
                return Err(e);
            }
        }

        if !skip_ticketing {
            match self.ticketing.save_case(uuid, &chassis, &dealership.dn).await {
                Ok(protocol_number) => {
                    self.repository
                        .occurrences
                        .set_protocol_number(uuid, &protocol_number)
                        .await?;
                }
                Err(e) => {
                    tracing::warn!("Ticketing forwarding failed for {}: {}", uuid, e);
                }
            }
        }

        tracing::info!("Created occurrence {} for chassis {}", uuid, chassis);
        Ok(uuid)
    }

    /// Patch the aggregate's mutable fields; lists replace wholesale.
    pub async fn update(
        &self,
        uuid: Uuid,
        request: UpdateOccurrence,
        actor: &str,
    ) -> AppResult<OccurrenceDetails> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut occurrence = self.repository.occurrences.get_by_uuid(uuid).await?;

        if let Some(dn) = &request.dn {
            self.repository.dealerships.require_by_dn(dn).await?;
            occurrence.dn = Some(dn.clone());
        }

        if let Some(v) = request.criticality {
            occurrence.criticality = Some(v);
        }
        if let Some(v) = request.status {
            occurrence.status = Some(v);
        }
        if let Some(v) = request.observation {
            occurrence.observation = Some(v);
        }
        if let Some(v) = request.report {
            occurrence.report = Some(v);
        }
        if let Some(v) = request.solution_proposed {
            occurrence.solution_proposed = Some(v);
        }
        if let Some(v) = request.occurrence_type {
            occurrence.occurrence_type = Some(v);
        }
        if let Some(v) = request.main_occurrence {
            occurrence.main_occurrence = Some(v);
        }
        if let Some(v) = request.source {
            occurrence.source = Some(v);
        }
        if let Some(v) = request.campaign {
            occurrence.campaign = v;
        }
        if let Some(v) = request.vehicle {
            occurrence.vehicle = Some(Json(v));
        }
        if let Some(v) = request.driver {
            occurrence.driver = Some(Json(v));
        }
        if let Some(v) = request.dealership {
            occurrence.dealership = Some(Json(v));
        }
        if let Some(v) = request.dtcs {
            occurrence.dtcs = Some(Json(v));
        }
        if let Some(v) = request.part_order {
            occurrence.part_order = Some(Json(v));
        }
        if let Some(v) = request.extra_lists {
            occurrence.extra_lists = Some(v);
        }

        occurrence.updated_by = Some(actor.to_string());
        occurrence.updated_at = Utc::now();

        let step_patch = StepPatch {
            report: request.step_report,
            estimated_time: request.step_estimated_time,
            observation: request.step_observation,
        };

        self.repository.occurrences.update(&occurrence, &step_patch).await?;
        self.get(uuid).await
    }

    /// Close the occurrence and best-effort cascade to the linked
    /// maintenance schedule.
    pub async fn finalize(&self, uuid: Uuid, request: FinalizeRequest) -> AppResult<FinalizeOutcome> {
        let occurrence = self.repository.occurrences.get_by_uuid(uuid).await?;

        let end_date = self
            .repository
            .occurrences
            .finalize(
                uuid,
                Utc::now(),
                request.reason_type.as_deref(),
                request.reason_description.as_deref(),
            )
            .await?;

        let cascade = cascade_finish(
            self.maintenance.as_ref(),
            occurrence.schedule_uuid,
            end_date,
            request.service_order_number.clone(),
        )
        .await;

        tracing::info!("Finalized occurrence {} (cascade: {:?})", uuid, cascade);
        Ok(FinalizeOutcome { end_date, cascade })
    }

    /// Hard delete by uuid
    pub async fn delete_by_uuid(&self, uuid: Uuid) -> AppResult<()> {
        self.repository.occurrences.delete_by_uuid(uuid).await
    }

    /// Full aggregate view
    pub async fn get(&self, uuid: Uuid) -> AppResult<OccurrenceDetails> {
        let occurrence = self.repository.occurrences.get_by_uuid(uuid).await?;
        let steps = self.repository.steps.list(uuid).await?;
        let dispatches = self.repository.dispatches.list(uuid).await?;
        let active_schedule = self
            .repository
            .service_bays
            .find_active_for_occurrence(uuid)
            .await?;

        Ok(OccurrenceDetails::from_parts(
            occurrence,
            steps.into_iter().map(Into::into).collect(),
            dispatches.into_iter().map(Into::into).collect(),
            active_schedule.map(Into::into),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::integrations::MockMaintenanceScheduleClient;

    #[tokio::test]
    async fn test_cascade_without_link_is_not_linked() {
        let client = MockMaintenanceScheduleClient::new();
        let status = cascade_finish(&client, None, Utc::now(), None).await;
        assert_eq!(status, CascadeStatus::NotLinked);
    }

    #[tokio::test]
    async fn test_cascade_success_is_updated() {
        let mut client = MockMaintenanceScheduleClient::new();
        client.expect_finish().times(1).returning(|_, _, _| Ok(()));
        let status =
            cascade_finish(&client, Some(Uuid::new_v4()), Utc::now(), Some("SO-1".into())).await;
        assert_eq!(status, CascadeStatus::Updated);
    }

    #[tokio::test]
    async fn test_cascade_failure_never_propagates() {
        let mut client = MockMaintenanceScheduleClient::new();
        client
            .expect_finish()
            .times(1)
            .returning(|_, _, _| Err(AppError::Integration("unreachable".into())));
        let status = cascade_finish(&client, Some(Uuid::new_v4()), Utc::now(), None).await;
        assert_eq!(status, CascadeStatus::Failed);
    }

    #[test]
    fn test_vin_validation() {
        assert!(VIN_RE.is_match("9BWZZZ377VT004251"));
        assert!(!VIN_RE.is_match("9BWZZZ377VT00425"));
        assert!(!VIN_RE.is_match("9BWZZZ377VT00425I"));
    }
}

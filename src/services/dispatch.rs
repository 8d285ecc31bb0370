//! Tow/assistance dispatch service

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::dispatch::{CancelDispatch, CreateDispatch, Dispatch, DispatchStatus, DispatchSummary},
    repository::Repository,
};

#[derive(Clone)]
pub struct DispatchService {
    repository: Repository,
}

impl DispatchService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Offer a tow/assistance unit to a dealership. The new dispatch starts
    /// in WAITING_DEALERSHIP and the occurrence's dn follows the dispatch
    /// target.
    pub async fn create(&self, uuid: Uuid, request: CreateDispatch) -> AppResult<DispatchSummary> {
        self.repository.occurrences.get_by_uuid(uuid).await?;

        let now = Utc::now();
        let dispatch = Dispatch {
            dispatch_uuid: Uuid::new_v4(),
            occurrence_uuid: uuid,
            status: DispatchStatus::WaitingDealership.code().to_string(),
            occurrence_type: request.occurrence_type,
            payer: request.payer,
            authorize_payment: request.authorize_payment,
            route: request.route,
            dn: Some(request.dn),
            driver: None,
            reason_refusal: None,
            description_refusal: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.repository.dispatches.create(&dispatch).await?;
        Ok(created.into())
    }

    /// Refuse a waiting dispatch
    pub async fn cancel(
        &self,
        uuid: Uuid,
        dispatch_uuid: Uuid,
        request: CancelDispatch,
    ) -> AppResult<DispatchSummary> {
        self.repository.occurrences.get_by_uuid(uuid).await?;
        let dispatch = self
            .repository
            .dispatches
            .cancel(
                uuid,
                dispatch_uuid,
                &request.reason_refusal,
                request.description_refusal.as_deref(),
            )
            .await?;
        Ok(dispatch.into())
    }

    /// Accept a waiting dispatch
    pub async fn make_available(&self, uuid: Uuid, dispatch_uuid: Uuid) -> AppResult<DispatchSummary> {
        self.repository.occurrences.get_by_uuid(uuid).await?;
        let dispatch = self
            .repository
            .dispatches
            .make_available(uuid, dispatch_uuid)
            .await?;
        Ok(dispatch.into())
    }

    /// Assign a driver to an available dispatch
    pub async fn assign_driver(
        &self,
        uuid: Uuid,
        dispatch_uuid: Uuid,
        driver: &str,
    ) -> AppResult<DispatchSummary> {
        self.repository.occurrences.get_by_uuid(uuid).await?;
        let dispatch = self
            .repository
            .dispatches
            .assign_driver(uuid, dispatch_uuid, driver)
            .await?;
        Ok(dispatch.into())
    }
}

//! Clients for the external collaborators
//!
//! Each collaborator is a trait seam with a reqwest implementation, so the
//! services can be exercised against mocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    config::IntegrationsConfig,
    error::{AppError, AppResult},
    models::analytics::Persona,
};

/// Account/dealership scope resolved for a persona.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolvedScope {
    pub account_id: Option<String>,
    pub dn: Option<String>,
}

/// Tower/customer asset identifiers resolved from a chassis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetIds {
    pub asset_id: Option<String>,
    pub account_id: Option<String>,
}

/// Externally-owned maintenance/checkup schedule linked to an occurrence.
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceSchedule {
    pub uuid: Uuid,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

/// Identity/account resolution per persona.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn resolve_scope(&self, persona: Persona, subject: &str) -> AppResult<ResolvedScope>;
}

/// Vehicle asset resolution.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetClient: Send + Sync {
    async fn resolve_chassis(&self, chassis: &str) -> AppResult<AssetIds>;
}

/// External ticketing integration. Best-effort: callers may skip it and
/// must tolerate failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketingClient: Send + Sync {
    /// Forward the case and return the protocol number.
    async fn save_case(&self, occurrence_uuid: Uuid, chassis: &str, dn: &str) -> AppResult<String>;
}

/// Linked maintenance/checkup schedule operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MaintenanceScheduleClient: Send + Sync {
    async fn get(&self, schedule_uuid: Uuid) -> AppResult<MaintenanceSchedule>;

    /// Mark the schedule finished, copying the checkout date and service
    /// order number over.
    async fn finish(
        &self,
        schedule_uuid: Uuid,
        checkout_date: DateTime<Utc>,
        service_order_number: Option<String>,
    ) -> AppResult<()>;
}

fn build_client(timeout_seconds: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

fn integration_err(context: &str, e: reqwest::Error) -> AppError {
    AppError::Integration(format!("{}: {}", context, e))
}

/// HTTP implementations of all collaborator clients, sharing one
/// connection pool.
#[derive(Clone)]
pub struct HttpIntegrations {
    client: reqwest::Client,
    config: IntegrationsConfig,
}

impl HttpIntegrations {
    pub fn new(config: IntegrationsConfig) -> AppResult<Self> {
        Ok(Self {
            client: build_client(config.timeout_seconds)?,
            config,
        })
    }
}

#[async_trait]
impl IdentityClient for HttpIntegrations {
    async fn resolve_scope(&self, persona: Persona, subject: &str) -> AppResult<ResolvedScope> {
        let url = format!("{}/scopes/resolve", self.config.identity_url);
        let response = self
            .client
            .get(&url)
            .query(&[("persona", persona.as_str()), ("subject", subject)])
            .send()
            .await
            .map_err(|e| integration_err("identity resolution", e))?
            .error_for_status()
            .map_err(|e| integration_err("identity resolution", e))?;

        response
            .json()
            .await
            .map_err(|e| integration_err("identity resolution", e))
    }
}

#[async_trait]
impl AssetClient for HttpIntegrations {
    async fn resolve_chassis(&self, chassis: &str) -> AppResult<AssetIds> {
        let url = format!("{}/assets/{}", self.config.asset_url, chassis);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| integration_err("asset resolution", e))?
            .error_for_status()
            .map_err(|e| integration_err("asset resolution", e))?;

        response
            .json()
            .await
            .map_err(|e| integration_err("asset resolution", e))
    }
}

#[derive(Serialize)]
struct TicketPayload<'a> {
    occurrence_uuid: Uuid,
    chassis: &'a str,
    dn: &'a str,
}

#[derive(Deserialize)]
struct TicketResponse {
    protocol_number: String,
}

#[async_trait]
impl TicketingClient for HttpIntegrations {
    async fn save_case(&self, occurrence_uuid: Uuid, chassis: &str, dn: &str) -> AppResult<String> {
        let url = format!("{}/tickets", self.config.ticketing_url);
        let response = self
            .client
            .post(&url)
            .json(&TicketPayload {
                occurrence_uuid,
                chassis,
                dn,
            })
            .send()
            .await
            .map_err(|e| integration_err("ticketing", e))?
            .error_for_status()
            .map_err(|e| integration_err("ticketing", e))?;

        let ticket: TicketResponse = response
            .json()
            .await
            .map_err(|e| integration_err("ticketing", e))?;
        Ok(ticket.protocol_number)
    }
}

#[derive(Serialize)]
struct FinishPayload {
    status: &'static str,
    checkout_date: DateTime<Utc>,
    service_order_number: Option<String>,
}

#[async_trait]
impl MaintenanceScheduleClient for HttpIntegrations {
    async fn get(&self, schedule_uuid: Uuid) -> AppResult<MaintenanceSchedule> {
        let url = format!("{}/schedules/{}", self.config.maintenance_url, schedule_uuid);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| integration_err("maintenance schedule", e))?
            .error_for_status()
            .map_err(|e| integration_err("maintenance schedule", e))?;

        response
            .json()
            .await
            .map_err(|e| integration_err("maintenance schedule", e))
    }

    async fn finish(
        &self,
        schedule_uuid: Uuid,
        checkout_date: DateTime<Utc>,
        service_order_number: Option<String>,
    ) -> AppResult<()> {
        let url = format!("{}/schedules/{}/finish", self.config.maintenance_url, schedule_uuid);
        self.client
            .put(&url)
            .json(&FinishPayload {
                status: "FINISHED",
                checkout_date,
                service_order_number,
            })
            .send()
            .await
            .map_err(|e| integration_err("maintenance schedule", e))?
            .error_for_status()
            .map_err(|e| integration_err("maintenance schedule", e))?;
        Ok(())
    }
}

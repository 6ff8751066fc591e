//! VPC peering connections
//!
//! A peering connection between two VPCs, possibly across tenants. A new
//! connection settles into `PENDING_ACCEPTANCE` (cross-tenant, the peer
//! still has to accept) or straight into `ACTIVE`. Deletion is also
//! asynchronous; the read endpoint answers 404 once the connection is
//! gone.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use strato_api::{ApiError, ServiceClient};
use strato_core::{Probe, StateWaiter, StatusProbe, WaitSpec};

use crate::error::{Result, ServiceError};

pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_DELETE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

const WAIT_INITIAL_DELAY: Duration = Duration::from_secs(5);
const WAIT_MIN_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Peering connection status as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeeringStatus {
    Creating,
    PendingAcceptance,
    Active,
    Deleting,
    /// Reported on read after deletion completes, and synthesized from a
    /// 404 of the read endpoint.
    Deleted,
    Unknown(String),
}

impl PeeringStatus {
    pub fn from_wire(status: &str) -> Self {
        match status {
            "CREATING" => PeeringStatus::Creating,
            "PENDING_ACCEPTANCE" => PeeringStatus::PendingAcceptance,
            "ACTIVE" => PeeringStatus::Active,
            "DELETING" => PeeringStatus::Deleting,
            "DELETED" => PeeringStatus::Deleted,
            other => PeeringStatus::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for PeeringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeeringStatus::Creating => "CREATING",
            PeeringStatus::PendingAcceptance => "PENDING_ACCEPTANCE",
            PeeringStatus::Active => "ACTIVE",
            PeeringStatus::Deleting => "DELETING",
            PeeringStatus::Deleted => "DELETED",
            PeeringStatus::Unknown(status) => status,
        };
        write!(f, "{s}")
    }
}

/// One side of a peering connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VpcInfo {
    pub vpc_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// A peering connection as reported by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Peering {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub request_vpc_info: VpcInfo,
    #[serde(default)]
    pub accept_vpc_info: VpcInfo,
}

impl Peering {
    pub fn status(&self) -> PeeringStatus {
        PeeringStatus::from_wire(&self.status)
    }
}

#[derive(Debug, Deserialize)]
struct PeeringEnvelope {
    peering: Peering,
}

#[derive(Debug, Clone)]
pub struct CreatePeeringRequest {
    pub name: String,
    pub vpc_id: String,
    pub peer_vpc_id: String,
    pub peer_tenant_id: Option<String>,
}

/// Client for the peering endpoints.
#[derive(Debug, Clone)]
pub struct VpcPeeringService {
    client: ServiceClient,
}

impl VpcPeeringService {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    pub async fn create(&self, request: &CreatePeeringRequest) -> Result<Peering> {
        let url = self.client.url("v2.0/vpc/peerings", &[]);
        let body = json!({
            "peering": {
                "name": request.name,
                "request_vpc_info": VpcInfo {
                    vpc_id: request.vpc_id.clone(),
                    tenant_id: None,
                },
                "accept_vpc_info": VpcInfo {
                    vpc_id: request.peer_vpc_id.clone(),
                    tenant_id: request.peer_tenant_id.clone(),
                },
            }
        });

        tracing::debug!(name = %request.name, "creating peering connection");
        let response = self.client.post(&url, &body).await?;
        let envelope: PeeringEnvelope =
            serde_json::from_value(response).map_err(ApiError::Decode)?;
        Ok(envelope.peering)
    }

    pub async fn get(&self, id: &str) -> Result<Peering> {
        let url = self.client.url("v2.0/vpc/peerings/{id}", &[("id", id)]);
        let response = self.client.get(&url).await?;
        let envelope: PeeringEnvelope =
            serde_json::from_value(response).map_err(ApiError::Decode)?;
        Ok(envelope.peering)
    }

    /// Only the name is mutable.
    pub async fn update_name(&self, id: &str, name: &str) -> Result<Peering> {
        let url = self.client.url("v2.0/vpc/peerings/{id}", &[("id", id)]);
        let body = json!({ "peering": { "name": name } });

        let response = self.client.put(&url, &body).await?;
        let envelope: PeeringEnvelope =
            serde_json::from_value(response).map_err(ApiError::Decode)?;
        Ok(envelope.peering)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = self.client.url("v2.0/vpc/peerings/{id}", &[("id", id)]);
        self.client.delete(&url).await?;
        Ok(())
    }

    /// Block until a new connection is usable: `PENDING_ACCEPTANCE` for
    /// cross-tenant peerings, `ACTIVE` otherwise.
    pub async fn wait_established(&self, id: &str, timeout: Duration) -> Result<Peering> {
        let spec = WaitSpec::new(
            vec![PeeringStatus::Creating],
            vec![PeeringStatus::PendingAcceptance, PeeringStatus::Active],
            timeout,
        )
        .initial_delay(WAIT_INITIAL_DELAY)
        .min_poll_interval(WAIT_MIN_POLL_INTERVAL);

        let snapshot = self.wait_status(id, spec).await?;
        snapshot.ok_or(ServiceError::MissingField("peering"))
    }

    /// Block until the connection is gone.
    pub async fn wait_deleted(&self, id: &str, timeout: Duration) -> Result<()> {
        let spec = WaitSpec::new(
            vec![PeeringStatus::Active, PeeringStatus::Deleting],
            vec![PeeringStatus::Deleted],
            timeout,
        )
        .initial_delay(WAIT_INITIAL_DELAY)
        .min_poll_interval(WAIT_MIN_POLL_INTERVAL);

        self.wait_status(id, spec).await?;
        Ok(())
    }

    /// Poll the connection's status with an explicit [`WaitSpec`]. The
    /// snapshot is `None` when the terminal observation was the 404 of a
    /// deleted connection.
    pub async fn wait_status(
        &self,
        id: &str,
        spec: WaitSpec<PeeringStatus>,
    ) -> Result<Option<Peering>> {
        let probe = PeeringStatusProbe { service: self, id };
        Ok(StateWaiter::new(probe, spec).run().await?)
    }
}

struct PeeringStatusProbe<'a> {
    service: &'a VpcPeeringService,
    id: &'a str,
}

#[async_trait]
impl StatusProbe for PeeringStatusProbe<'_> {
    type Status = PeeringStatus;
    type Snapshot = Option<Peering>;

    async fn probe(&self) -> Probe<PeeringStatus, Option<Peering>> {
        match self.service.get(self.id).await {
            Ok(peering) => Probe::Observed {
                status: peering.status(),
                snapshot: Some(peering),
            },
            Err(ServiceError::Api(err)) if err.is_not_found() => {
                tracing::debug!(id = self.id, "peering connection no longer exists");
                Probe::Observed {
                    status: PeeringStatus::Deleted,
                    snapshot: None,
                }
            }
            Err(err) => Probe::Failed(err.into()),
        }
    }
}

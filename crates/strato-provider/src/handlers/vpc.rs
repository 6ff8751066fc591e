//! VPC peering connection handler

use async_trait::async_trait;
use serde_json::json;

use strato_core::with_operation_retry;
use strato_services::CONFLICT_RETRY_INTERVAL;
use strato_services::vpc::{self, CreatePeeringRequest, Peering, VpcPeeringService};

use super::is_multi_op_conflict;
use crate::error::{ProviderError, Result};
use crate::resource::{ManagedResource, ResourceSpec, ResourceState};

const TYPE_NAME: &str = "strato_vpc_peering";

#[derive(Debug)]
pub struct VpcPeeringResource {
    peerings: VpcPeeringService,
}

impl VpcPeeringResource {
    pub fn new(peerings: VpcPeeringService) -> Self {
        Self { peerings }
    }

    fn build_create_request(spec: &ResourceSpec) -> Result<CreatePeeringRequest> {
        Ok(CreatePeeringRequest {
            name: spec.require_str("name")?,
            vpc_id: spec.require_str("vpc_id")?,
            peer_vpc_id: spec.require_str("peer_vpc_id")?,
            peer_tenant_id: spec.attr("peer_tenant_id"),
        })
    }
}

#[async_trait]
impl ManagedResource for VpcPeeringResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<ResourceState> {
        let request = Self::build_create_request(spec)?;

        let peering = with_operation_retry(
            vpc::DEFAULT_CREATE_TIMEOUT,
            CONFLICT_RETRY_INTERVAL,
            is_multi_op_conflict,
            || self.peerings.create(&request),
        )
        .await
        .map_err(|e| ProviderError::operation("creating", TYPE_NAME, &spec.name, e))?;

        tracing::info!(id = %peering.id, "waiting for peering connection to establish");
        let established = self
            .peerings
            .wait_established(&peering.id, vpc::DEFAULT_CREATE_TIMEOUT)
            .await
            .map_err(|e| ProviderError::operation("creating", TYPE_NAME, &peering.id, e))?;

        Ok(state_from(&established))
    }

    async fn read(&self, id: &str) -> Result<Option<ResourceState>> {
        match self.peerings.get(id).await {
            Ok(peering) => Ok(Some(state_from(&peering))),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(ProviderError::operation("reading", TYPE_NAME, id, err)),
        }
    }

    async fn update(&self, id: &str, spec: &ResourceSpec) -> Result<ResourceState> {
        let name = spec.require_str("name")?;
        let peering = self
            .peerings
            .update_name(id, &name)
            .await
            .map_err(|e| ProviderError::operation("updating", TYPE_NAME, id, e))?;
        Ok(state_from(&peering))
    }

    async fn delete(&self, id: &str, _spec: &ResourceSpec) -> Result<()> {
        let result = with_operation_retry(
            vpc::DEFAULT_DELETE_TIMEOUT,
            CONFLICT_RETRY_INTERVAL,
            is_multi_op_conflict,
            || self.peerings.delete(id),
        )
        .await;
        match result {
            Ok(()) => {}
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(ProviderError::operation("deleting", TYPE_NAME, id, err)),
        }

        self.peerings
            .wait_deleted(id, vpc::DEFAULT_DELETE_TIMEOUT)
            .await
            .map_err(|e| ProviderError::operation("deleting", TYPE_NAME, id, e))?;
        Ok(())
    }
}

fn state_from(peering: &Peering) -> ResourceState {
    let mut state = ResourceState::new(&peering.id, peering.status().to_string())
        .with_attribute("name", json!(peering.name))
        .with_attribute("vpc_id", json!(peering.request_vpc_info.vpc_id))
        .with_attribute("peer_vpc_id", json!(peering.accept_vpc_info.vpc_id));

    if let Some(tenant_id) = &peering.accept_vpc_info.tenant_id {
        state.set_attribute("peer_tenant_id", json!(tenant_id));
    }
    state
}

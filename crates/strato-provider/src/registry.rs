//! Resource type registry
//!
//! Binds the resource type names the host knows to their handlers. One
//! service client is built per remote service at construction time, using
//! the region resolver through [`ProviderConfig::endpoint_for`]; nothing
//! here performs I/O.

use std::collections::HashMap;
use std::sync::Arc;

use strato_api::ServiceClient;
use strato_config::ProviderConfig;
use strato_services::{
    OrderService, OrganizationsService, SfsShareService, VpcPeeringService, WafRuleService,
};

use crate::error::{ProviderError, Result};
use crate::handlers::{
    OrganizationsAccountResource, SfsShareResource, VpcPeeringResource, WafRuleResource,
};
use crate::resource::ManagedResource;

pub struct ResourceRegistry {
    resources: HashMap<&'static str, Arc<dyn ManagedResource>>,
}

impl ResourceRegistry {
    /// Build the full resource set from the provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let project_id = config.project_id.as_str();

        let shares = SfsShareService::new(ServiceClient::new(
            config.endpoint_for("sfs")?,
            project_id,
        ));
        let orders = OrderService::new(ServiceClient::new(
            config.endpoint_for("bss")?,
            project_id,
        ));
        let peerings = VpcPeeringService::new(ServiceClient::new(
            config.endpoint_for("vpc")?,
            project_id,
        ));
        let rules = WafRuleService::new(
            ServiceClient::new(config.endpoint_for("waf")?, project_id),
            config.enterprise_project_id.clone(),
        );
        // The organizations API is global, not project-scoped.
        let accounts = OrganizationsService::new(ServiceClient::new(
            config.endpoint_for("organizations")?,
            "",
        ));

        let mut registry = Self {
            resources: HashMap::new(),
        };
        registry.register(Arc::new(SfsShareResource::new(shares, orders)));
        registry.register(Arc::new(VpcPeeringResource::new(peerings)));
        registry.register(Arc::new(WafRuleResource::new(rules)));
        registry.register(Arc::new(OrganizationsAccountResource::new(accounts)));
        Ok(registry)
    }

    fn register(&mut self, resource: Arc<dyn ManagedResource>) {
        self.resources.insert(resource.type_name(), resource);
    }

    /// Handler for a resource type name.
    pub fn get(&self, type_name: &str) -> Result<Arc<dyn ManagedResource>> {
        self.resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResourceType(type_name.to_string()))
    }

    /// All registered type names, sorted for stable output.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.resources.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_exposes_the_fixed_resource_set() {
        let config = ProviderConfig::new("ap-east-1", "prj-1");
        let registry = ResourceRegistry::new(&config).unwrap();

        assert_eq!(
            registry.type_names(),
            vec![
                "strato_organizations_account",
                "strato_sfs_share",
                "strato_vpc_peering",
                "strato_waf_rule",
            ]
        );
    }

    #[test]
    fn unknown_type_is_a_distinct_error() {
        let config = ProviderConfig::new("ap-east-1", "prj-1");
        let registry = ResourceRegistry::new(&config).unwrap();

        let err = registry.get("strato_dns_zone").unwrap_err();
        assert!(
            matches!(err, ProviderError::UnknownResourceType(name) if name == "strato_dns_zone")
        );
    }
}

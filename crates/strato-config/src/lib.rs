//! Strato configuration
//!
//! Two concerns live here: the region override file and its
//! process-wide resolution cache ([`regions`]), and the provider-level
//! configuration a host supplies before any resource operation runs
//! ([`ProviderConfig`]).

pub mod error;
pub mod regions;

pub use error::{ConfigError, RegionError, Result};
pub use regions::{RegionIndex, RegionResolver};

use std::collections::HashMap;

/// Provider-level configuration.
///
/// Supplied once by the host at configuration time; service clients are
/// built from it. Endpoint resolution order: explicit per-service
/// override here, then the region override file, then the built-in
/// defaults.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Region all service clients target.
    pub region: String,

    /// Project scoping for project-level APIs.
    pub project_id: String,

    /// Enterprise project the managed resources are billed against.
    pub enterprise_project_id: Option<String>,

    /// Explicit per-service endpoint overrides (service name → endpoint).
    pub endpoints: HashMap<String, String>,
}

impl ProviderConfig {
    pub fn new(region: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            project_id: project_id.into(),
            enterprise_project_id: None,
            endpoints: HashMap::new(),
        }
    }

    pub fn with_enterprise_project(mut self, eps_id: impl Into<String>) -> Self {
        self.enterprise_project_id = Some(eps_id.into());
        self
    }

    pub fn with_endpoint(mut self, service: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.endpoints.insert(service.into(), endpoint.into());
        self
    }

    /// Endpoint for `service` in the configured region.
    pub fn endpoint_for(&self, service: &str) -> Result<String> {
        if let Some(endpoint) = self.endpoints.get(service) {
            return Ok(endpoint.clone());
        }

        let resolver = RegionResolver::new(service)?;
        resolver
            .resolve(&self.region)
            .ok_or_else(|| ConfigError::UnknownRegion {
                service: service.to_string(),
                region: self.region.clone(),
            })
    }
}

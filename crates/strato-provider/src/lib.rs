//! Strato provider plugin
//!
//! The host-facing surface of the provider: a fixed set of remote
//! resource types exposed to a declarative infrastructure-as-code host.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  IaC host                     │
//! └───────────────────┬──────────────────────────┘
//!                     │ ResourceSpec / ResourceState
//! ┌───────────────────▼──────────────────────────┐
//! │              strato-provider                  │
//! │  ResourceRegistry → ManagedResource handlers  │
//! └───────┬───────────────────────┬──────────────┘
//!         │                       │
//! ┌───────▼────────┐     ┌────────▼────────┐
//! │ strato-services │     │  strato-config  │
//! │ (CRUD + waits)  │     │ (region cache)  │
//! └───────┬────────┘     └─────────────────┘
//!         │
//! ┌───────▼────────┐
//! │   strato-api    │
//! └────────────────┘
//! ```
//!
//! A host configures the provider once ([`strato_config::ProviderConfig`]),
//! builds a [`ResourceRegistry`], and drives each resource through the
//! [`ManagedResource`] operations. Handlers block until the remote side
//! reports a terminal state, so every operation either completes or fails
//! with a diagnostic naming the resource and the underlying cause.

pub mod error;
pub mod handlers;
pub mod registry;
pub mod resource;

// Re-exports
pub use error::{ProviderError, Result};
pub use handlers::{
    OrganizationsAccountResource, SfsShareResource, VpcPeeringResource, WafRuleResource,
};
pub use registry::ResourceRegistry;
pub use resource::{ManagedResource, ResourceSpec, ResourceState};

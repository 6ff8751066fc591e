//! Host-facing resource abstraction
//!
//! The IaC host hands over a flat [`ResourceSpec`] per resource; handlers
//! map it to the service request bodies and hand back a [`ResourceState`]
//! once the remote side settles.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

/// Flat resource configuration from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Resource type name (e.g. "strato_sfs_share").
    pub type_name: String,

    /// Host-side resource name, used in diagnostics only.
    pub name: String,

    /// Flat attribute map.
    pub attributes: serde_json::Value,
}

impl ResourceSpec {
    pub fn new(
        type_name: impl Into<String>,
        name: impl Into<String>,
        attributes: serde_json::Value,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            attributes,
        }
    }

    /// Get an attribute as a specific type.
    pub fn attr<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get a non-empty string attribute, or fail with
    /// [`ProviderError::MissingAttribute`].
    pub fn require_str(&self, key: &'static str) -> Result<String> {
        self.attr::<String>(key)
            .filter(|s| !s.is_empty())
            .ok_or(ProviderError::MissingAttribute(key))
    }

    /// String-keyed map attribute (tags), empty when unset.
    pub fn map_attr(&self, key: &str) -> HashMap<String, String> {
        self.attr::<HashMap<String, String>>(key).unwrap_or_default()
    }
}

/// Remote state of a managed resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Provider-side resource id.
    pub id: String,

    /// Current status, in the resource's own vocabulary.
    pub status: String,

    /// Readback attributes (endpoints, sizes, tags, ...).
    pub attributes: HashMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: status.into(),
            attributes: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// One remote resource type exposed to the host.
///
/// Implementations block inside `create`/`update`/`delete` until the
/// remote side reports the terminal state, so the host sees an operation
/// either complete or fail with a diagnostic that distinguishes
/// "never started", "timed out in flight" and "remote-reported failure".
#[async_trait]
pub trait ManagedResource: Send + Sync + std::fmt::Debug {
    /// Resource type name the registry dispatches on.
    fn type_name(&self) -> &'static str;

    async fn create(&self, spec: &ResourceSpec) -> Result<ResourceState>;

    /// `None` when the resource no longer exists remotely.
    async fn read(&self, id: &str) -> Result<Option<ResourceState>>;

    async fn update(&self, id: &str, spec: &ResourceSpec) -> Result<ResourceState>;

    /// `spec` carries the last known configuration; some resources need it
    /// (billing mode decides between delete and unsubscribe).
    async fn delete(&self, id: &str, spec: &ResourceSpec) -> Result<()>;
}

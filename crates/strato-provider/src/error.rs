//! Provider error types

use strato_services::ServiceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("missing required attribute '{0}'")]
    MissingAttribute(&'static str),

    #[error("invalid attribute '{attribute}': {reason}")]
    InvalidAttribute {
        attribute: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Config(#[from] strato_config::ConfigError),

    /// A resource operation failed. Carries the resource identifier and
    /// the underlying error; `source` keeps timeout, unexpected-status and
    /// remote failures distinguishable.
    #[error("error {action} {resource_type} ({id}): {source}")]
    Operation {
        action: &'static str,
        resource_type: &'static str,
        id: String,
        #[source]
        source: ServiceError,
    },
}

impl ProviderError {
    pub(crate) fn operation(
        action: &'static str,
        resource_type: &'static str,
        id: impl Into<String>,
        source: ServiceError,
    ) -> Self {
        ProviderError::Operation {
            action,
            resource_type,
            id: id.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

//! Strato API plumbing
//!
//! The JSON-over-HTTP collaborator every resource module calls into:
//! a [`ServiceClient`] bound to one service endpoint, structured
//! [`ApiError`] values carrying HTTP status and provider error code as
//! matchable data, and the shared tag helpers.

pub mod client;
pub mod error;
pub mod tags;

// Re-exports
pub use client::ServiceClient;
pub use error::{ApiError, Result};
pub use tags::{
    Tag, create_resource_tags, create_tags_at, delete_resource_tags_with_keys, delete_tags_at,
    resource_tags, tags_at,
};

//! Strato resource services
//!
//! One module per remote service, each wrapping a [`strato_api::ServiceClient`]
//! with typed request/response bodies, an explicit status enum mapped from
//! the wire representation, and wait helpers built on
//! [`strato_core::StateWaiter`] for the operations that complete
//! asynchronously.
//!
//! The modules are deliberately uniform: a `*Service` struct owning the
//! client, plain CRUD methods, and `wait_*` methods taking the operation's
//! timeout budget. Orchestration (create → wait → tag, prepaid order
//! handling, conflict retry around mutations) belongs to the provider
//! layer on top.

use std::time::Duration;

pub mod error;
pub mod orders;
pub mod organizations;
pub mod sfs;
pub mod vpc;
pub mod waf;

// Re-exports
pub use error::{Result, ServiceError};
pub use orders::OrderService;
pub use organizations::OrganizationsService;
pub use sfs::SfsShareService;
pub use vpc::VpcPeeringService;
pub use waf::WafRuleService;

/// Error codes meaning "another operation on this resource is already in
/// progress". They arrive with HTTP 409 (DBS.212033 with 403); the
/// mutating call is re-issued until the concurrent operation finishes.
pub const MULTI_OP_CONFLICT_CODES: &[&str] = &[
    "DBS.201202",
    "DBS.200011",
    "DBS.200019",
    "DBS.200047",
    "DBS.200080",
    "DBS.201015",
    "DBS.201206",
    "DBS.212033",
    "DBS.280011",
    "DBS.280816",
];

/// Cadence for re-issuing a mutation rejected by a concurrent operation.
pub const CONFLICT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

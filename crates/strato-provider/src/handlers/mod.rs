//! Per-resource handlers
//!
//! Each handler maps the host's flat attributes onto the service request
//! bodies, drives the mutate → wait → read-back sequence, and translates
//! failures into diagnostics carrying the resource identifier.

mod organizations;
mod sfs;
mod vpc;
mod waf;

pub use organizations::OrganizationsAccountResource;
pub use sfs::SfsShareResource;
pub use vpc::VpcPeeringResource;
pub use waf::WafRuleResource;

use strato_services::{MULTI_OP_CONFLICT_CODES, ServiceError};

/// Predicate for the conflict retry around mutating calls.
pub(crate) fn is_multi_op_conflict(err: &ServiceError) -> bool {
    matches!(err, ServiceError::Api(api) if api.is_transient_conflict(MULTI_OP_CONFLICT_CODES))
}

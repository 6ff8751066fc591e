//! Strato core primitives
//!
//! Every mutating resource operation in this workspace follows the same
//! shape: issue the request, then poll the remote side until it reports a
//! terminal status. This crate provides the two pieces shared by all of
//! them:
//!
//! - [`StateWaiter`]: a generic polling state machine driven by a
//!   caller-supplied [`StatusProbe`] and a [`WaitSpec`] describing the
//!   pending/target status sets and timing.
//! - [`with_operation_retry`]: a retry wrapper for the *mutating* request
//!   itself, for APIs that reject concurrent operations on the same
//!   resource with a transient conflict code.
//!
//! Resource modules define their own status enums and probe types; nothing
//! in this crate knows about HTTP or any particular service.

pub mod error;
pub mod retry;
pub mod wait;

// Re-exports
pub use error::{Result, WaitError};
pub use retry::with_operation_retry;
pub use wait::{Probe, StateWaiter, StatusProbe, WaitSpec};

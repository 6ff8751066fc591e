//! Waiter error types

use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`crate::StateWaiter`]
///
/// The variants are deliberately distinct: a caller can tell "the remote
/// side never finished" ([`WaitError::Timeout`]) apart from "the remote
/// side reported something we don't poll through"
/// ([`WaitError::UnexpectedStatus`]) and from "the probe itself failed"
/// ([`WaitError::Probe`]).
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("timed out after {0:?} waiting for target status")]
    Timeout(Duration),

    #[error("unexpected status: {0}")]
    UnexpectedStatus(String),

    #[error("wait cancelled")]
    Cancelled,

    #[error("status probe failed: {0}")]
    Probe(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WaitError>;

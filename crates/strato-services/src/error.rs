//! Service error types

use strato_api::ApiError;
use strato_core::WaitError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error("missing field '{0}' in API response")]
    MissingField(&'static str),

    #[error(
        "order id missing from the response; the order was not registered, \
         check the order status on the console"
    )]
    OrderMissing,

    #[error("{0}")]
    InvalidRequest(String),
}

impl ServiceError {
    /// Whether the underlying cause is a 404 on a by-id lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::Api(err) if err.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

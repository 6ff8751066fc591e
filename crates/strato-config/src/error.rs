//! Configuration error types

use thiserror::Error;

/// Region override file errors.
///
/// These are configuration errors, not runtime errors: the override file
/// is loaded once per process, so a broken file fails every resolve for
/// the lifetime of the process. `Clone` because the cached load result is
/// handed back to every caller.
#[derive(Error, Debug, Clone)]
pub enum RegionError {
    #[error("failed to read region override file '{path}': {reason}")]
    Unreadable { path: String, reason: String },

    #[error("failed to parse region override file '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Region(#[from] RegionError),

    #[error("no endpoint known for service '{service}' in region '{region}'")]
    UnknownRegion { service: String, region: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

//! Resource accounting error types.

use thiserror::Error;

/// Errors from fitting a consumer onto a provider.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("consumer needs {needed} bytes but only {available} are free")]
    InsufficientMemory { needed: u64, available: u64 },

    #[error("port {0} is already bound on this host")]
    PortConflict(u16),

    #[error("port {0} requested more than once by the same consumer")]
    DuplicatePort(u16),
}

pub type ResourceResult<T> = Result<T, ResourceError>;

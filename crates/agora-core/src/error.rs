use thiserror::Error;

use crate::store::StoreError;

/// Domain failure taxonomy. Nothing here is retried; every variant maps to
/// a stable machine-readable code at the HTTP boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed caller input.
    #[error("{0}")]
    Validation(String),

    /// Wrong principal or insufficient role.
    #[error("{0}")]
    Authorization(String),

    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation would duplicate existing state.
    #[error("{0}")]
    Conflict(String),

    /// The durable store failed and no degraded path applies.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Failure taxonomy of every core operation. Callers translate these into
/// user-facing responses; the core never retries.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unauthorized")]
    Unauthorized,

    /// A session was found but its expiry had passed. The row is gone by the
    /// time this is returned.
    #[error("session expired")]
    Expired,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("store failure: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

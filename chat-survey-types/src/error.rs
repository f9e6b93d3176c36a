use std::time::Duration;

use crate::UserId;

/// A field list that cannot be turned into a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry has no fields")]
    Empty,

    #[error("duplicate field name: {0}")]
    DuplicateName(String),

    #[error("duplicate field label: {0}")]
    DuplicateLabel(String),

    #[error("field name '{0}' collides with a state marker")]
    ReservedName(String),

    #[error("multi-select field '{0}' has no options")]
    MissingOptions(String),

    #[error("field '{field}' has an invalid option '{option}'")]
    InvalidOption { field: String, option: String },
}

/// Error type for record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no record for user {0}")]
    NotFound(UserId),

    /// Backend-specific failure (I/O, connection loss, etc.)
    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Create a backend error from any error type.
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }
}

/// A failed transport call, classified by how delivery should react.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The recipient blocked the channel. Retrying is pointless.
    #[error("recipient blocked the channel: {0}")]
    Blocked(String),

    /// The channel asks for a mandatory pause before the next send.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Connection-level failure that may succeed on retry.
    #[error("network error: {0}")]
    Network(String),

    /// Anything else; not retried.
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether a later attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
    }
}

/// Error type for survey operations.
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The persisted state names a field the registry does not know.
    #[error("unknown field '{field}' in state of user {user_id}")]
    UnknownField { user_id: UserId, field: String },

    /// A value written outside the conversation failed validation.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl SurveyError {
    /// Check if this error comes from configuration drift rather than I/O.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::UnknownField { .. })
    }
}

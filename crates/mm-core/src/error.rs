use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid field {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

/// Failures of the persistence layer.
///
/// `Transient` covers an unreachable, busy or full store where a retry may
/// succeed. `Corrupt` means the store answered with something unreadable and
/// retrying will not help. `Consistency` is an observed id collision or an
/// out-of-order id and must never be tolerated.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {message}")]
    Transient { message: String },
    #[error("storage corrupt: {message}")]
    Corrupt { message: String },
    #[error("consistency violation: {message}")]
    Consistency { message: String },
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },
    #[error("invalid config: {message}")]
    Invalid { message: String },
}

#[derive(Debug, Error)]
pub enum MotomapError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("internal error: {message}")]
    Internal { message: String },
}

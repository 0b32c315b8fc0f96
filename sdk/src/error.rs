use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum DriveError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transient error (retryable): {0}")]
    Transient(String),

    #[error("timeout")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("request failed: {status} - {message}")]
    Request { status: u16, message: String },

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DriveError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout | Self::Connection(_))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::Unauthorized(_))
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    #[must_use]
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists(name.into())
    }

    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    #[must_use]
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient(reason.into())
    }
}

impl From<std::io::Error> for DriveError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type DriveResult<T> = Result<T, DriveError>;

/// Error types shared by the guide crates.
///
/// These cover infrastructure failures (durable storage, remote services). Application-specific
/// errors are defined in each binary crate and wrap `CommonError` via `#[from]`.
pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("storage error at {key}: {source}")]
    Storage {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Remote catalog/profile failure. Timeouts get their own variant but callers handle every
/// variant through the same degrade path.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request timed out")]
    TimedOut,

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("api returned error: status={status} message={message}")]
    Status { status: StatusCode, message: String },

    #[error("no signed-in session")]
    NoSession,
}

impl ApiError {
    /// HTTP status, when the server produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(e) => e.status(),
            ApiError::TimedOut | ApiError::NoSession => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::TimedOut
        } else {
            ApiError::Request(e)
        }
    }
}

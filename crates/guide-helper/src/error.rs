use guide_common::error::{ApiError, CommonError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("guide not found: {0}")]
    NotFound(String),

    #[error("invalid guide: {0}")]
    Invalid(String),

    #[error("sign in required")]
    SignInRequired,

    #[error("guide {id} was saved online but could not be stored on this device: {source}")]
    NotStoredLocally {
        id: String,
        #[source]
        source: Box<AppError>,
    },
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NoSession => AppError::SignInRequired,
            other => AppError::Common(CommonError::Api(other)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Common(CommonError::Serialization(e))
    }
}

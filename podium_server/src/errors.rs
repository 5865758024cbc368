use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use podium_engine::{JudgingApiError, LifecycleApiError, SettlementApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Auth headers invalid or not provided. {0}")]
    CouldNotDeserializeAuthHeaders(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("{0}")]
    ValidationFailed(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Payment processor unavailable. {0}")]
    ExternalServiceError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializeAuthHeaders(_) => StatusCode::BAD_REQUEST,
            Self::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<JudgingApiError> for ServerError {
    fn from(e: JudgingApiError) -> Self {
        match e {
            JudgingApiError::NotFound(what) => Self::NoRecordFound(what),
            JudgingApiError::NotAssigned { .. } => Self::InsufficientPermissions(e.to_string()),
            JudgingApiError::InvalidScores(inner) => Self::ValidationFailed(inner.to_string()),
            JudgingApiError::WrongState { .. } => Self::PreconditionFailed(e.to_string()),
            JudgingApiError::StorageError(inner) => Self::BackendError(inner.to_string()),
        }
    }
}

impl From<LifecycleApiError> for ServerError {
    fn from(e: LifecycleApiError) -> Self {
        match e {
            LifecycleApiError::NotFound(what) => Self::NoRecordFound(what),
            LifecycleApiError::PreconditionFailed(msg) => Self::PreconditionFailed(msg),
            LifecycleApiError::InvalidWinnerSelection(inner) => Self::ValidationFailed(inner.to_string()),
            LifecycleApiError::StorageError(inner) => Self::BackendError(inner.to_string()),
        }
    }
}

impl From<SettlementApiError> for ServerError {
    fn from(e: SettlementApiError) -> Self {
        match e {
            SettlementApiError::NotFound(what) => Self::NoRecordFound(what),
            SettlementApiError::Forbidden(msg) => Self::InsufficientPermissions(msg),
            SettlementApiError::PreconditionFailed(msg) => Self::PreconditionFailed(msg),
            SettlementApiError::Conflict(msg) => Self::Conflict(msg),
            SettlementApiError::InsufficientBalance { .. } => Self::PreconditionFailed(e.to_string()),
            SettlementApiError::Ledger(inner) => Self::ExternalServiceError(inner.to_string()),
            SettlementApiError::StorageError(inner) => Self::BackendError(inner.to_string()),
        }
    }
}

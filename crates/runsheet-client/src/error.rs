use runsheet_core::CoreError;
use thiserror::Error;

/// Failure reported by a [`SheetsApi`](crate::api::SheetsApi) backend
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of the failed call, if the service answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            ApiError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::Auth(_) | ApiError::Decode(_) => false,
        }
    }
}

/// Client error type; every failure surfaced to callers is one of these
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl From<CoreError> for SheetError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidColumn(_) => SheetError::Validation(format!("Invalid column name: {e}")),
            CoreError::LengthMismatch { .. } => SheetError::Validation(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SheetError>;

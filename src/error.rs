use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifierError {
    // Configuration errors
    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    #[error("Missing required environment variable '{name}'")]
    ConfigMissing { name: String },

    // Request errors
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid request: {message}")]
    Validation { message: String },

    // Transport errors
    #[error("Identity store error: {message}")]
    Store { message: String },

    #[error("Discord API error: {message}")]
    Discord { message: String },

    #[error("Delivery failed: {message}")]
    Delivery { message: String },

    #[error("Timed out after {seconds}s waiting for {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Delivery mode '{mode}' does not support {operation}")]
    Unsupported { mode: String, operation: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl NotifierError {
    pub fn validation(message: impl Into<String>) -> Self {
        NotifierError::Validation {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        NotifierError::Store {
            message: message.into(),
        }
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        NotifierError::Delivery {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            NotifierError::Unauthorized => StatusCode::UNAUTHORIZED,
            NotifierError::Validation { .. } => StatusCode::BAD_REQUEST,
            NotifierError::Store { .. }
            | NotifierError::Discord { .. }
            | NotifierError::Delivery { .. } => StatusCode::BAD_GATEWAY,
            NotifierError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            NotifierError::Unsupported { .. } => StatusCode::CONFLICT,
            NotifierError::ConfigValidation { .. }
            | NotifierError::ConfigMissing { .. }
            | NotifierError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures of a downstream collaborator (store or Discord).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            NotifierError::Store { .. }
                | NotifierError::Discord { .. }
                | NotifierError::Delivery { .. }
                | NotifierError::Timeout { .. }
        )
    }
}

impl IntoResponse for NotifierError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            // Nothing beyond "unauthorized" leaves the server.
            NotifierError::Unauthorized => serde_json::json!({ "error": "unauthorized" }),
            NotifierError::Validation { message } => {
                serde_json::json!({ "error": "bad_request", "reason": message })
            }
            other if other.is_transport() => {
                serde_json::json!({ "error": "delivery_failed", "detail": other.to_string() })
            }
            other => serde_json::json!({ "error": "internal_error", "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<serenity::Error> for NotifierError {
    fn from(err: serenity::Error) -> Self {
        NotifierError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for NotifierError {
    fn from(err: reqwest::Error) -> Self {
        NotifierError::Delivery {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for NotifierError {
    fn from(err: serde_json::Error) -> Self {
        NotifierError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifierError>;

/// Run `fut` with an upper bound, turning an elapsed deadline into a transport failure.
pub async fn bounded<T, F>(operation: &str, limit: std::time::Duration, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(NotifierError::Timeout {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        }),
    }
}

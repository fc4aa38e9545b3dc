use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(reqwest::Error),

    /// Embedding, search, ranking or store call failed or timed out
    #[error("External service error: {0}")]
    ExternalService(String),

    /// A recommendation list precondition was violated
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The profile produced no sector with matchable signal
    #[error("Profile has no matchable interest signal")]
    EmptySignal,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::HttpClient(e.without_url())
    }
}

impl AppError {
    /// Whether the error originated in an external collaborator
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            AppError::ExternalService(_)
                | AppError::HttpClient(_)
                | AppError::Database(_)
                | AppError::Cache(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, msg),
            AppError::EmptySignal => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::ExternalService(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Database(_) | AppError::Cache(_) | AppError::HttpClient(_) => {
                tracing::error!(error = %self, "Upstream request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Upstream service request failed".to_string(),
                )
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

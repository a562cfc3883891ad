use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Result alias used by every service and handler.
pub type Result<T> = std::result::Result<T, AppError>;

/// AppError
///
/// Every failure a request can end in. Each variant maps to exactly one HTTP status;
/// nothing is retried or recovered silently.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing token, or a token that no longer resolves to a live user.
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    /// Signature, expiry or format check on a session token failed.
    #[error("Invalid token")]
    InvalidToken,

    /// Authenticated user whose role lacks the requested operation.
    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (email, role name, duplicate rating).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    /// Unique-constraint violations surface as `Conflict`; everything else stays a
    /// database failure.
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                tracing::debug!(constraint = ?db_err.constraint(), "unique violation");
                return AppError::Conflict("record already exists".to_string());
            }
        }
        AppError::Database(err)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        // Server-side details are logged, never returned.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                "Database operation failed".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

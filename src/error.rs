use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The application-wide failure taxonomy. Every handler returns
/// `Result<_, ApiError>`, and the `IntoResponse` implementation below maps each
/// variant to a status code and a structured `{ "message": ... }` body.
///
/// `Forbidden` (authenticated but not allowed) is deliberately distinct from
/// `NotFound` (the id does not resolve) and from `InvalidInput` (failed
/// payload validation), so callers never conflate "doesn't exist" with
/// "not allowed".
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("No valid credential provided")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found !")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("External service failure: {0}")]
    ExternalService(String),

    #[error("Database error")]
    Database(#[source] sqlx::Error),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidInput(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    /// `not_found("Post")` renders as "Post not found !".
    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        // Uniqueness races that slip past the pre-checks (email, slug) still
        // surface as Conflict rather than an opaque 500.
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return ApiError::Conflict("This value already exists !".to_string());
            }
        }
        ApiError::Database(e)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Report the first field-level failure, mirroring the one-message-at-a-
        // time behavior the client expects.
        let message = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(m) => format!("{field}: {m}"),
                    None => format!("{field} is invalid"),
                })
            })
            .next()
            .unwrap_or_else(|| "Invalid input".to_string());
        ApiError::InvalidInput(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Infrastructure faults are logged with full detail but never echoed
        // to clients.
        let message = match &self {
            ApiError::Database(e) => {
                tracing::error!(error = ?e, "database failure");
                "Something went wrong".to_string()
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal failure");
                "Something went wrong".to_string()
            }
            ApiError::ExternalService(detail) => {
                tracing::error!(detail = %detail, "external service failure");
                format!("External service failure: {detail}")
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

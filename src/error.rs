use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The user holds an active ban in the target forum.
    #[error("User is banned from this forum")]
    AlreadyBanned,

    /// Owner tried to leave a forum that has no moderator to inherit it.
    #[error("No moderator available to take over ownership")]
    NoSuccessorAvailable,

    #[error("Maximum reply depth exceeded")]
    MaxDepthExceeded,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl utoipa::ToSchema for AppError {
    fn name() -> std::borrow::Cow<'static, str> {
        "ErrorResponse".into()
    }
}

impl utoipa::PartialSchema for AppError {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        ErrorResponse::schema()
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden | AppError::AlreadyBanned => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::MaxDepthExceeded => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) | AppError::NoSuccessorAvailable => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                "Internal server error".to_string()
            }
            AppError::NotFound => "Resource not found".to_string(),
            AppError::Validation(msg) | AppError::Conflict(msg) => msg,
            other => other.to_string(),
        };

        let body = json!({
            "error": error_message,
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_statuses() {
        assert_eq!(AppError::AlreadyBanned.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::NoSuccessorAvailable.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::MaxDepthExceeded.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let err = AppError::Validation("reason too short".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}

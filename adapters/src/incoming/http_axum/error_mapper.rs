use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error};

use domain::conversion::{max_duration_minutes, suggest_durations};
use intervox_application::error::AppError;

pub struct HttpError(pub AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        match app_error {
            AppError::Domain(_)
            | AppError::InsufficientCredits { .. }
            | AppError::AlreadyProcessed { .. }
            | AppError::NotFound { .. }
            | AppError::ValidationError { .. }
            | AppError::JsonError(_) => {
                debug!("Client error response generated: {}", app_error);
            }
            _ => {
                error!("Server error response generated: {}", app_error);
            }
        }

        // Insufficient credits carries its recovery options so the UI can
        // offer shorter durations instead of a bare failure.
        if let AppError::InsufficientCredits { available, needed } = app_error {
            let error_response = json!({
                "ok": false,
                "error": app_error.to_string(),
                "status": StatusCode::FORBIDDEN.as_u16(),
                "credits_available": available,
                "credits_needed": needed,
                "suggested_durations": suggest_durations(*available),
                "max_duration": max_duration_minutes(*available),
            });
            return (StatusCode::FORBIDDEN, Json(error_response)).into_response();
        }

        let (status_code, message) = match app_error {
            AppError::Domain(_) => (StatusCode::BAD_REQUEST, app_error.to_string()),

            AppError::InsufficientCredits { .. } => {
                (StatusCode::FORBIDDEN, app_error.to_string())
            }

            AppError::AlreadyProcessed { .. } => (StatusCode::CONFLICT, app_error.to_string()),

            AppError::InconsistentSettlement { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Inconsistent settlement".to_string(),
            ),

            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message.clone()),

            AppError::ValidationError { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, app_error.to_string())
            }

            AppError::ConfigError { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
            ),

            AppError::IoError(_) | AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),

            AppError::JsonError(_) => (StatusCode::BAD_REQUEST, "Invalid JSON format".to_string()),

            AppError::DatabaseError { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),

            AppError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
        };

        let error_response = json!({
            "ok": false,
            "error": message,
            "status": status_code.as_u16()
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl From<AppError> for HttpError {
    fn from(app_error: AppError) -> Self {
        HttpError(app_error)
    }
}

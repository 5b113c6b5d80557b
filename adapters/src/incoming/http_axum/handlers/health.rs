use axum::{Json, extract::State};

use crate::incoming::http_axum::{dto::responses::ApiResponse, error_mapper::HttpError};
use crate::shared::app_state::AppState;
use intervox_application::infrastructure_config::StorageBackend;

#[cfg_attr(feature = "docs", utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check successful with environment info")
    ),
    tag = "system",
    summary = "System health check",
    operation_id = "health_check"
))]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>, HttpError> {
    let storage_backend = match state.config.storage.backend {
        StorageBackend::Postgres => "postgres",
        StorageBackend::Memory => "memory",
    };

    Ok(Json(ApiResponse::success_with_data(Some(
        serde_json::json!({
            "environment": state.config.environment.env,
            "storage_backend": storage_backend,
        }),
    ))))
}

use axum::{
    Router, middleware,
    routing::{get, post},
};
#[cfg(feature = "docs")]
use utoipa::OpenApi;
#[cfg(feature = "docs")]
use utoipa_swagger_ui::SwaggerUi;

use crate::incoming::http_axum::{
    handlers::{
        credits::{get_balance, get_transactions, validate_duration},
        health::health_check,
        interviews::{end_interview, start_interview},
        webhooks::{call_completed, payment_completed},
    },
    middleware::request_id::request_id_middleware,
};
use crate::shared::app_state::AppState;

#[cfg(feature = "docs")]
use crate::incoming::http_axum::docs::ApiDoc;

pub fn build_application_router() -> Router<AppState> {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/users/{user_id}/credits", get(get_balance))
        .route(
            "/users/{user_id}/credits/transactions",
            get(get_transactions),
        )
        .route(
            "/users/{user_id}/credits/duration-options",
            get(validate_duration),
        )
        .route("/interviews", post(start_interview))
        .route("/interviews/{session_id}/end", post(end_interview))
        .route("/webhooks/call-completed", post(call_completed))
        .route("/webhooks/payment-completed", post(payment_completed))
        .layer(middleware::from_fn(request_id_middleware));

    #[cfg(feature = "docs")]
    {
        router.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
    }

    #[cfg(not(feature = "docs"))]
    {
        router
    }
}

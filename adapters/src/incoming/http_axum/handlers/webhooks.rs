use axum::{Json, extract::State};
use axum_valid::Valid;

use domain::payment::PaymentId;
use domain::session::SessionId;
use intervox_application::{
    contracts::sessions::{EndTrigger, SessionEndReport},
    ports::incoming::{credits::PurchaseCreditsUseCase, sessions::EndInterviewUseCase},
};

use crate::incoming::http_axum::{
    dto::{
        requests::{CallCompletedWebhook, PaymentCompletedWebhook},
        responses::{EndInterviewResponse, PurchaseCreditsResponse},
    },
    error_mapper::HttpError,
};
use crate::shared::app_state::AppState;

#[cfg(feature = "docs")]
use crate::incoming::http_axum::dto::common_responses::{
    ConflictResponse, InternalServerErrorResponse, NotFoundResponse, ValidationErrorResponse,
};

#[cfg_attr(feature = "docs", utoipa::path(
    post,
    path = "/webhooks/call-completed",
    request_body = CallCompletedWebhook,
    responses(
        (status = 200, body = EndInterviewResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "webhooks",
    summary = "Call-provider session-end notification",
    description = "Primary settlement trigger. Duplicate and out-of-order deliveries are safe: settlement runs at most once per session.",
    operation_id = "call_completed_webhook"
))]
pub async fn call_completed(
    State(state): State<AppState>,
    Valid(Json(webhook)): Valid<Json<CallCompletedWebhook>>,
) -> Result<Json<EndInterviewResponse>, HttpError> {
    let session_id = SessionId::from_uuid(webhook.session_id);
    let report = SessionEndReport {
        trigger: EndTrigger::ProviderWebhook,
        outcome: webhook.call_status.into(),
        elapsed_seconds: webhook.duration_seconds,
    };

    let end_uc: &dyn EndInterviewUseCase = &*state.end_interview_service;
    let outcome = end_uc
        .end_interview(&session_id, report)
        .await
        .map_err(HttpError)?;

    Ok(Json(EndInterviewResponse::from(outcome)))
}

#[cfg_attr(feature = "docs", utoipa::path(
    post,
    path = "/webhooks/payment-completed",
    request_body = PaymentCompletedWebhook,
    responses(
        (status = 200, body = PurchaseCreditsResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "webhooks",
    summary = "Payment-gateway completion notification",
    description = "Credits a completed payment exactly once. Redelivered notifications are acknowledged with `already_processed` and never double-credit.",
    operation_id = "payment_completed_webhook"
))]
pub async fn payment_completed(
    State(state): State<AppState>,
    Valid(Json(webhook)): Valid<Json<PaymentCompletedWebhook>>,
) -> Result<Json<PurchaseCreditsResponse>, HttpError> {
    let payment_id = PaymentId::from_uuid(webhook.payment_id);

    let purchase_uc: &dyn PurchaseCreditsUseCase = &*state.purchase_credits_service;
    let outcome = purchase_uc
        .credit_completed_payment(&payment_id)
        .await
        .map_err(HttpError)?;

    Ok(Json(PurchaseCreditsResponse::from(outcome)))
}

use axum::{
    Json,
    extract::{Path, State},
};
use axum_valid::Valid;
use uuid::Uuid;

use domain::account::UserId;
use domain::session::SessionId;
use intervox_application::{
    contracts::sessions::{EndTrigger, SessionEndReport},
    ports::incoming::sessions::{EndInterviewUseCase, StartInterviewUseCase},
};

use crate::incoming::http_axum::{
    dto::{
        requests::{EndInterviewRequest, StartInterviewRequest},
        responses::{BalanceResponse, EndInterviewResponse, StartInterviewResponse},
    },
    error_mapper::HttpError,
};
use crate::shared::app_state::AppState;

#[cfg(feature = "docs")]
use crate::incoming::http_axum::dto::common_responses::{
    InsufficientCreditsResponse, InternalServerErrorResponse, NotFoundResponse,
    ValidationErrorResponse,
};

#[cfg_attr(feature = "docs", utoipa::path(
    post,
    path = "/interviews",
    request_body = StartInterviewRequest,
    responses(
        (status = 200, body = StartInterviewResponse),
        (status = 403, response = InsufficientCreditsResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "interviews",
    summary = "Start a paid interview session",
    description = "Reserves credits for the requested duration and creates the session record. The reservation is in place before any call minutes can be consumed; an insufficient balance returns the shortfall together with affordable alternatives.",
    operation_id = "start_interview"
))]
pub async fn start_interview(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<StartInterviewRequest>>,
) -> Result<Json<StartInterviewResponse>, HttpError> {
    let user_id = UserId::from_uuid(request.user_id);

    let start_uc: &dyn StartInterviewUseCase = &*state.start_interview_service;
    let started = start_uc
        .start_interview(&user_id, request.duration_minutes)
        .await
        .map_err(HttpError)?;

    Ok(Json(StartInterviewResponse {
        session_id: *started.session.id.as_uuid(),
        status: started.session.status.as_str().to_string(),
        requested_minutes: started.session.requested_minutes,
        credits_blocked: started.blocked_credits,
        new_balance: BalanceResponse::from(started.new_balance),
    }))
}

#[cfg_attr(feature = "docs", utoipa::path(
    post,
    path = "/interviews/{session_id}/end",
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    request_body = EndInterviewRequest,
    responses(
        (status = 200, body = EndInterviewResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "interviews",
    summary = "Report a session end (client fallback)",
    description = "Fallback settlement path for when the provider webhook is delayed or lost. Races safely with the webhook: whichever report arrives first settles, the other observes `already_processed`.",
    operation_id = "end_interview"
))]
pub async fn end_interview(
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<EndInterviewRequest>>,
) -> Result<Json<EndInterviewResponse>, HttpError> {
    let session_id = SessionId::from_uuid(session_id);
    let report = SessionEndReport {
        trigger: EndTrigger::ClientFallback,
        outcome: request.outcome.into(),
        elapsed_seconds: request.elapsed_seconds,
    };

    let end_uc: &dyn EndInterviewUseCase = &*state.end_interview_service;
    let outcome = end_uc
        .end_interview(&session_id, report)
        .await
        .map_err(HttpError)?;

    Ok(Json(EndInterviewResponse::from(outcome)))
}

use crate::incoming::http_axum::{dto, handlers};
use dto::common_responses::{
    BadRequestResponse, ConflictResponse, InsufficientCreditsResponse,
    InternalServerErrorResponse, NotFoundResponse, ValidationErrorResponse,
};
use dto::requests::{
    CallCompletedWebhook, CallOutcome, EndInterviewRequest, PaymentCompletedWebhook,
    StartInterviewRequest,
};
use dto::responses::{
    BalanceResponse, DurationValidationResponse, EndInterviewResponse, PurchaseCreditsResponse,
    StartInterviewResponse, TransactionContextResponse, TransactionHistoryResponse,
    TransactionResponse,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::credits::get_balance,
        handlers::credits::get_transactions,
        handlers::credits::validate_duration,
        handlers::interviews::start_interview,
        handlers::interviews::end_interview,
        handlers::webhooks::call_completed,
        handlers::webhooks::payment_completed,
        handlers::health::health_check,
    ),
    components(
        schemas(
            StartInterviewRequest,
            EndInterviewRequest,
            CallCompletedWebhook,
            PaymentCompletedWebhook,
            CallOutcome,
            BalanceResponse,
            TransactionResponse,
            TransactionContextResponse,
            TransactionHistoryResponse,
            DurationValidationResponse,
            StartInterviewResponse,
            EndInterviewResponse,
            PurchaseCreditsResponse
        ),
        responses(
            BadRequestResponse,
            NotFoundResponse,
            InsufficientCreditsResponse,
            ConflictResponse,
            ValidationErrorResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "credits", description = "Credit balance and transaction log - balances, paginated audit history, duration affordability checks"),
        (name = "interviews", description = "Interview session lifecycle - reserve credits at start, settle to actual usage at end"),
        (name = "webhooks", description = "Provider and payment-gateway notifications - idempotent settlement and crediting triggers"),
        (name = "system", description = "System health and status monitoring")
    ),
    info(
        title = "Intervox Backend API",
        description = "Credit metering backend for pay-per-use AI voice interviews. Credits are reserved before a call starts, trued-up to actual usage when it ends, and reconciled safely under duplicate or missing session-end notifications.",
        contact(
            name = "Intervox",
        ),
    ),
    servers(
        (url = "http://localhost:3000", description = "Development server"),
    )
)]
pub struct ApiDoc;

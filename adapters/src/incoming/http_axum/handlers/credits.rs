use axum::{
    Json,
    extract::{Path, Query, State},
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use domain::account::UserId;
use domain::ledger::TransactionType;
use intervox_application::{
    error::AppError,
    ports::incoming::credits::{
        BalanceQueryUseCase, DurationOptionsUseCase, HistoryQuery, TransactionHistoryUseCase,
    },
};

use crate::incoming::http_axum::{
    dto::{
        requests::{DurationParams, HistoryParams},
        responses::{
            BalanceResponse, DurationValidationResponse, TransactionHistoryResponse,
            TransactionResponse,
        },
    },
    error_mapper::HttpError,
};
use crate::shared::app_state::AppState;

#[cfg(feature = "docs")]
use crate::incoming::http_axum::dto::common_responses::{
    BadRequestResponse, InternalServerErrorResponse, NotFoundResponse, ValidationErrorResponse,
};

#[cfg_attr(feature = "docs", utoipa::path(
    get,
    path = "/users/{user_id}/credits",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, body = BalanceResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "credits",
    summary = "Get credit balance",
    description = "Retrieve the user's total, blocked, and available credits.",
    operation_id = "get_balance"
))]
pub async fn get_balance(
    Path(user_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, HttpError> {
    let user_id = UserId::from_uuid(user_id);

    let balance_uc: &dyn BalanceQueryUseCase = &*state.balance_query_service;
    let summary = balance_uc.get_balance(&user_id).await.map_err(HttpError)?;

    Ok(Json(BalanceResponse::from(summary)))
}

fn parse_history_params(params: HistoryParams) -> Result<HistoryQuery, AppError> {
    let transaction_type = params
        .transaction_type
        .map(|label| {
            TransactionType::parse(&label).ok_or_else(|| AppError::ValidationError {
                message: format!("Unknown transaction type filter: {}", label),
            })
        })
        .transpose()?;

    let parse_date = |value: Option<String>, field: &str| {
        value
            .map(|raw| {
                OffsetDateTime::parse(&raw, &Rfc3339).map_err(|_| AppError::ValidationError {
                    message: format!("{} must be an RFC 3339 timestamp", field),
                })
            })
            .transpose()
    };

    Ok(HistoryQuery {
        limit: params.limit,
        offset: params.offset,
        transaction_type,
        start_date: parse_date(params.start_date, "start_date")?,
        end_date: parse_date(params.end_date, "end_date")?,
    })
}

#[cfg_attr(feature = "docs", utoipa::path(
    get,
    path = "/users/{user_id}/credits/transactions",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("limit" = Option<u32>, Query, description = "Page size, clamped to the configured maximum"),
        ("offset" = Option<u32>, Query, description = "Entries to skip"),
        ("type" = Option<String>, Query, description = "Filter: purchase | block | deduct | refund | adjustment"),
        ("start_date" = Option<String>, Query, description = "RFC 3339 lower bound"),
        ("end_date" = Option<String>, Query, description = "RFC 3339 upper bound")
    ),
    responses(
        (status = 200, body = TransactionHistoryResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "credits",
    summary = "List ledger transactions",
    description = "Paginated, filterable transaction log for a user, newest first, enriched with session/payment context where available.",
    operation_id = "list_transactions"
))]
pub async fn get_transactions(
    Path(user_id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
    State(state): State<AppState>,
) -> Result<Json<TransactionHistoryResponse>, HttpError> {
    let user_id = UserId::from_uuid(user_id);
    let query = parse_history_params(params).map_err(HttpError)?;

    let history_uc: &dyn TransactionHistoryUseCase = &*state.transaction_history_service;
    let history = history_uc
        .list_transactions(&user_id, query)
        .await
        .map_err(HttpError)?;

    Ok(Json(TransactionHistoryResponse {
        transactions: history
            .transactions
            .into_iter()
            .map(TransactionResponse::from)
            .collect(),
        total: history.total,
        has_more: history.has_more,
    }))
}

#[cfg_attr(feature = "docs", utoipa::path(
    get,
    path = "/users/{user_id}/credits/duration-options",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("minutes" = u32, Query, description = "Requested interview duration in minutes")
    ),
    responses(
        (status = 200, body = DurationValidationResponse),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "credits",
    summary = "Check duration affordability",
    description = "Validate whether the user's available credits cover the requested duration; returns shorter alternatives when they do not.",
    operation_id = "validate_duration"
))]
pub async fn validate_duration(
    Path(user_id): Path<Uuid>,
    Query(params): Query<DurationParams>,
    State(state): State<AppState>,
) -> Result<Json<DurationValidationResponse>, HttpError> {
    let user_id = UserId::from_uuid(user_id);

    let duration_uc: &dyn DurationOptionsUseCase = &*state.duration_options_service;
    let validation = duration_uc
        .validate_duration(&user_id, params.minutes)
        .await
        .map_err(HttpError)?;

    Ok(Json(DurationValidationResponse {
        valid: validation.valid,
        credits_needed: validation.credits_needed,
        credits_available: validation.credits_available,
        suggested_durations: validation.suggested_durations,
        max_duration: validation.max_duration,
    }))
}

use rust_decimal::Decimal;
use serde::Serialize;
#[cfg(feature = "docs")]
use utoipa::ToSchema;
use uuid::Uuid;

use intervox_application::contracts::{
    credits::{BalanceSummary, PurchaseOutcome, TransactionContext, TransactionView},
    sessions::SessionEndOutcome,
};

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Standard API response wrapper with success indicator, optional error message, and optional data payload",
    example = json!({
        "ok": true,
        "data": {
            "environment": "development"
        }
    })
))]
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success_with_data(data: Option<T>) -> Self {
        Self {
            ok: true,
            error: None,
            data,
        }
    }
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Credit balance. `available_credits` is `credits - blocked_credits` and is what new reservations draw from.",
    example = json!({
        "credits": "100",
        "blocked_credits": "50",
        "available_credits": "50"
    })
))]
#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub credits: Decimal,
    pub blocked_credits: Decimal,
    pub available_credits: Decimal,
}

impl From<BalanceSummary> for BalanceResponse {
    fn from(summary: BalanceSummary) -> Self {
        Self {
            credits: summary.credits,
            blocked_credits: summary.blocked_credits,
            available_credits: summary.available_credits,
        }
    }
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[derive(Debug, Clone, Serialize)]
pub struct TransactionContextResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "One append-only ledger entry. Amounts are signed: negative for block/deduct, positive for purchase/refund.",
))]
#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub transaction_type: String,
    pub amount: Decimal,
    pub balance_after: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<TransactionContextResponse>,
    pub created_at: String,
}

impl From<TransactionView> for TransactionResponse {
    fn from(view: TransactionView) -> Self {
        let context = view.context.map(|context| match context {
            TransactionContext::Interview {
                requested_minutes,
                elapsed_seconds,
            } => TransactionContextResponse {
                duration_minutes: Some(requested_minutes),
                elapsed_seconds,
                receipt_number: None,
            },
            TransactionContext::Payment { receipt_number } => TransactionContextResponse {
                duration_minutes: None,
                elapsed_seconds: None,
                receipt_number,
            },
        });

        Self {
            id: view.entry.id,
            transaction_type: view.entry.transaction_type.as_str().to_string(),
            amount: view.entry.amount,
            balance_after: view.entry.balance_after,
            reference_id: view.entry.reference_id,
            reference_type: view
                .entry
                .reference_type
                .map(|kind| kind.as_str().to_string()),
            context,
            created_at: view.entry.created_at.to_string(),
        }
    }
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[derive(Debug, Clone, Serialize)]
pub struct TransactionHistoryResponse {
    pub transactions: Vec<TransactionResponse>,
    pub total: i64,
    pub has_more: bool,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Affordability check for a requested duration, with recovery suggestions when the balance falls short.",
    example = json!({
        "valid": false,
        "credits_needed": "50",
        "credits_available": "20",
        "suggested_durations": [2],
        "max_duration": 2
    })
))]
#[derive(Debug, Clone, Serialize)]
pub struct DurationValidationResponse {
    pub valid: bool,
    pub credits_needed: Decimal,
    pub credits_available: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_durations: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u32>,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[derive(Debug, Clone, Serialize)]
pub struct StartInterviewResponse {
    pub session_id: Uuid,
    pub status: String,
    pub requested_minutes: u32,
    pub credits_blocked: Decimal,
    pub new_balance: BalanceResponse,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Settlement result for a session-end report. `already_processed` means the other trigger settled first.",
))]
#[derive(Debug, Clone, Serialize)]
pub struct EndInterviewResponse {
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_deducted: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_refunded: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<BalanceResponse>,
}

impl From<SessionEndOutcome> for EndInterviewResponse {
    fn from(outcome: SessionEndOutcome) -> Self {
        match outcome {
            SessionEndOutcome::Settled {
                credits_deducted,
                credits_refunded,
                new_balance,
            } => Self {
                result: "settled".to_string(),
                credits_deducted: Some(credits_deducted),
                credits_refunded: Some(credits_refunded),
                new_balance: Some(BalanceResponse::from(new_balance)),
            },
            SessionEndOutcome::Refunded {
                credits_refunded,
                new_balance,
            } => Self {
                result: "refunded".to_string(),
                credits_deducted: None,
                credits_refunded: Some(credits_refunded),
                new_balance: Some(BalanceResponse::from(new_balance)),
            },
            SessionEndOutcome::AlreadySettled => Self {
                result: "already_processed".to_string(),
                credits_deducted: None,
                credits_refunded: None,
                new_balance: None,
            },
            SessionEndOutcome::Corrected {
                credits_deducted,
                credits_refunded,
            } => Self {
                result: "corrected".to_string(),
                credits_deducted: Some(credits_deducted),
                credits_refunded: Some(credits_refunded),
                new_balance: None,
            },
            SessionEndOutcome::AwaitingUsageData => Self {
                result: "awaiting_usage_data".to_string(),
                credits_deducted: None,
                credits_refunded: None,
                new_balance: None,
            },
        }
    }
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseCreditsResponse {
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_added: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<BalanceResponse>,
}

impl From<PurchaseOutcome> for PurchaseCreditsResponse {
    fn from(outcome: PurchaseOutcome) -> Self {
        match outcome {
            PurchaseOutcome::Credited {
                credits_added,
                new_balance,
            } => Self {
                result: "credited".to_string(),
                credits_added: Some(credits_added),
                new_balance: Some(BalanceResponse::from(new_balance)),
            },
            PurchaseOutcome::AlreadyCredited => Self {
                result: "already_processed".to_string(),
                credits_added: None,
                new_balance: None,
            },
        }
    }
}

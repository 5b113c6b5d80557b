use serde::{Deserialize, Serialize};
#[cfg(feature = "docs")]
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use intervox_application::contracts::sessions::ReportedOutcome;

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Request to start a paid interview session. Credits for the full requested duration are reserved before the call may begin.",
    example = json!({
        "user_id": "550e8400-e29b-41d4-a716-446655440000",
        "duration_minutes": 5
    })
))]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartInterviewRequest {
    pub user_id: Uuid,

    #[cfg_attr(feature = "docs", schema(example = 5, minimum = 1, maximum = 240))]
    #[validate(range(
        min = 1,
        max = 240,
        message = "Duration must be between 1 and 240 minutes"
    ))]
    pub duration_minutes: u32,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    #[default]
    Completed,
    Failed,
}

impl From<CallOutcome> for ReportedOutcome {
    fn from(outcome: CallOutcome) -> Self {
        match outcome {
            CallOutcome::Completed => Self::Completed,
            CallOutcome::Failed => Self::Failed,
        }
    }
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Client-side fallback report that a session ended. Settlement is idempotent: if the provider webhook already settled the session this is a no-op.",
    example = json!({
        "outcome": "completed",
        "elapsed_seconds": 305
    })
))]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EndInterviewRequest {
    #[serde(default)]
    pub outcome: CallOutcome,

    #[cfg_attr(feature = "docs", schema(example = 305))]
    pub elapsed_seconds: Option<u64>,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Call-provider notification that a call ended, with the provider-measured duration.",
    example = json!({
        "session_id": "7f9c24e8-3b13-4b52-9fa5-5d1f6a2f12a0",
        "call_status": "completed",
        "duration_seconds": 305
    })
))]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CallCompletedWebhook {
    pub session_id: Uuid,

    #[serde(default)]
    pub call_status: CallOutcome,

    #[cfg_attr(feature = "docs", schema(example = 305))]
    pub duration_seconds: Option<u64>,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Payment-gateway notification that a payment completed. Crediting is idempotent per payment; duplicate deliveries are acknowledged without double-crediting.",
    example = json!({
        "payment_id": "b3c1a6a2-0f6e-4f4e-9f7d-9b1a4c0d2e33"
    })
))]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PaymentCompletedWebhook {
    pub payment_id: Uuid,
}

/// Query parameters for the transaction history listing. Dates are RFC 3339.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationParams {
    pub minutes: u32,
}

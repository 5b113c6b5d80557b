use crate::contracts::credits::{BalanceSummary, PurchaseOutcome, TransactionHistory};
use crate::error::AppResult;
use domain::account::UserId;
use domain::conversion::DurationValidation;
use domain::ledger::TransactionType;
use domain::payment::PaymentId;
use time::OffsetDateTime;

/// Caller-shaped history filter; services clamp the limit to configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    pub offset: u32,
    pub transaction_type: Option<TransactionType>,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
}

#[async_trait::async_trait]
pub trait BalanceQueryUseCase: Send + Sync {
    async fn get_balance(&self, user_id: &UserId) -> AppResult<BalanceSummary>;
}

#[async_trait::async_trait]
pub trait TransactionHistoryUseCase: Send + Sync {
    async fn list_transactions(
        &self,
        user_id: &UserId,
        query: HistoryQuery,
    ) -> AppResult<TransactionHistory>;
}

#[async_trait::async_trait]
pub trait DurationOptionsUseCase: Send + Sync {
    /// Checks whether the user can afford an interview of `minutes`, with
    /// suggested alternatives when they cannot.
    async fn validate_duration(
        &self,
        user_id: &UserId,
        minutes: u32,
    ) -> AppResult<DurationValidation>;
}

#[async_trait::async_trait]
pub trait PurchaseCreditsUseCase: Send + Sync {
    /// Credits a completed payment exactly once. Safe to call repeatedly for
    /// the same payment; duplicates short-circuit to `AlreadyCredited`.
    async fn credit_completed_payment(&self, payment_id: &PaymentId)
    -> AppResult<PurchaseOutcome>;
}

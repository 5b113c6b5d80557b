use std::sync::Arc;

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::error::AppResult;
use domain::account::{AccountBalance, Settlement, UserId};
use domain::ledger::{LedgerReference, TransactionEntry, TransactionMetadata, TransactionType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub limit: u32,
    pub offset: u32,
    pub transaction_type: Option<TransactionType>,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPage {
    pub transactions: Vec<TransactionEntry>,
    pub total: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettledBalance {
    pub settlement: Settlement,
    pub balance: AccountBalance,
}

/// Durable balance + append-only transaction log.
///
/// Every mutating call executes as one atomic unit against the store, with
/// the balance re-read under a per-user lock inside that unit, so concurrent
/// callers for the same user serialize and available credits can never go
/// negative. Implementations surface store unavailability as
/// `AppError::DatabaseError` after a bounded wait rather than hanging.
#[async_trait::async_trait]
pub trait LedgerStorePort: Send + Sync {
    async fn get_balance(&self, user_id: &UserId) -> AppResult<AccountBalance>;

    /// Reserves `amount` against the available balance and appends a `block`
    /// entry. Fails with `InsufficientCredits` when the available balance is
    /// short.
    async fn block_credits(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
    ) -> AppResult<AccountBalance>;

    /// Converts a reservation into a final charge, clamping the charge to the
    /// blocked amount, releasing the whole reservation, and appending a
    /// `deduct` entry plus a `refund` entry when the refund is non-zero.
    async fn deduct_and_settle(
        &self,
        user_id: &UserId,
        blocked_amount: Decimal,
        actual_amount: Decimal,
        reference: &LedgerReference,
        metadata: Option<TransactionMetadata>,
    ) -> AppResult<SettledBalance>;

    /// Returns a full reservation to the available balance with a `refund`
    /// entry. Failure-cleanup entry point; equivalent to settling with zero
    /// usage.
    async fn refund_blocked(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
        metadata: Option<TransactionMetadata>,
    ) -> AppResult<AccountBalance>;

    /// Adds purchased credits, creating the account on first purchase, and
    /// appends a `purchase` entry. Trusts the caller to have claimed the
    /// payment's idempotency latch first.
    async fn add_credits(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
    ) -> AppResult<AccountBalance>;

    /// Applies a signed correction to total credits with an `adjustment`
    /// entry. Used by reconciliation when a settled record fails its
    /// conservation check.
    async fn apply_adjustment(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
        metadata: Option<TransactionMetadata>,
    ) -> AppResult<AccountBalance>;

    async fn list_transactions(
        &self,
        user_id: &UserId,
        query: &TransactionQuery,
    ) -> AppResult<TransactionPage>;
}

pub type DynLedgerStorePort = Arc<dyn LedgerStorePort>;

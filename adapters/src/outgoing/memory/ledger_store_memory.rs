use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use domain::account::{AccountBalance, UserId};
use domain::ledger::{
    LedgerReference, TransactionEntry, TransactionMetadata, TransactionType,
};
use intervox_application::{
    error::{AppError, AppResult},
    ports::outgoing::ledger_store::{
        LedgerStorePort, SettledBalance, TransactionPage, TransactionQuery,
    },
};

struct UserLedger {
    balance: AccountBalance,
    log: Vec<TransactionEntry>,
}

impl UserLedger {
    fn empty() -> Self {
        Self {
            balance: AccountBalance::empty(),
            log: Vec::new(),
        }
    }

    fn push_entry(
        &mut self,
        user_id: &UserId,
        transaction_type: TransactionType,
        amount: Decimal,
        balance_after: Decimal,
        reference: &LedgerReference,
        metadata: Option<TransactionMetadata>,
    ) {
        self.log.push(TransactionEntry {
            id: Uuid::new_v4(),
            user_id: *user_id,
            transaction_type,
            amount,
            balance_after,
            reference_id: Some(reference.reference_id),
            reference_type: Some(reference.reference_type),
            metadata,
            created_at: OffsetDateTime::now_utc(),
        });
    }
}

/// Ledger store held entirely in process memory. Concurrent operations for
/// the same user serialize on that user's mutex, which is taken for the whole
/// read-modify-write, so the atomicity guarantees match the Postgres adapter.
#[derive(Default)]
pub struct MemoryLedgerStoreAdapter {
    accounts: DashMap<Uuid, Arc<Mutex<UserLedger>>>,
}

impl MemoryLedgerStoreAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, user_id: &UserId) -> AppResult<Arc<Mutex<UserLedger>>> {
        self.accounts
            .get(user_id.as_uuid())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AppError::NotFound {
                message: format!("No credit account for user {}", user_id),
            })
    }

    fn handle_or_create(&self, user_id: &UserId) -> Arc<Mutex<UserLedger>> {
        let entry = self
            .accounts
            .entry(*user_id.as_uuid())
            .or_insert_with(|| Arc::new(Mutex::new(UserLedger::empty())));
        Arc::clone(entry.value())
    }
}

#[async_trait::async_trait]
impl LedgerStorePort for MemoryLedgerStoreAdapter {
    async fn get_balance(&self, user_id: &UserId) -> AppResult<AccountBalance> {
        let ledger = self.handle(user_id)?;
        let guard = ledger.lock().await;
        Ok(guard.balance)
    }

    #[instrument(skip(self))]
    async fn block_credits(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
    ) -> AppResult<AccountBalance> {
        let ledger = self.handle(user_id)?;
        let mut guard = ledger.lock().await;

        guard
            .balance
            .block(amount)
            .map_err(|err| AppError::InsufficientCredits {
                available: err.available,
                needed: err.needed,
            })?;

        let balance_after = guard.balance.available();
        guard.push_entry(
            user_id,
            TransactionType::Block,
            -amount,
            balance_after,
            reference,
            None,
        );

        debug!("Blocked {} credits for user {}", amount, user_id);
        Ok(guard.balance)
    }

    #[instrument(skip(self, metadata))]
    async fn deduct_and_settle(
        &self,
        user_id: &UserId,
        blocked_amount: Decimal,
        actual_amount: Decimal,
        reference: &LedgerReference,
        metadata: Option<TransactionMetadata>,
    ) -> AppResult<SettledBalance> {
        let ledger = self.handle(user_id)?;
        let mut guard = ledger.lock().await;

        let settlement = guard
            .balance
            .settle(blocked_amount, actual_amount)
            .map_err(|err| AppError::InconsistentSettlement {
                message: err.to_string(),
            })?;

        let available = guard.balance.available();
        guard.push_entry(
            user_id,
            TransactionType::Deduct,
            -settlement.deducted,
            available - settlement.refunded,
            reference,
            metadata.clone(),
        );
        if settlement.refunded > Decimal::ZERO {
            guard.push_entry(
                user_id,
                TransactionType::Refund,
                settlement.refunded,
                available,
                reference,
                metadata,
            );
        }

        debug!(
            "Settled {} blocked credits for user {}: deducted {}, refunded {}",
            blocked_amount, user_id, settlement.deducted, settlement.refunded
        );
        Ok(SettledBalance {
            settlement,
            balance: guard.balance,
        })
    }

    #[instrument(skip(self, metadata))]
    async fn refund_blocked(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
        metadata: Option<TransactionMetadata>,
    ) -> AppResult<AccountBalance> {
        let ledger = self.handle(user_id)?;
        let mut guard = ledger.lock().await;

        guard
            .balance
            .release(amount)
            .map_err(|err| AppError::InconsistentSettlement {
                message: err.to_string(),
            })?;

        let balance_after = guard.balance.available();
        guard.push_entry(
            user_id,
            TransactionType::Refund,
            amount,
            balance_after,
            reference,
            metadata,
        );

        debug!("Refunded {} blocked credits for user {}", amount, user_id);
        Ok(guard.balance)
    }

    #[instrument(skip(self))]
    async fn add_credits(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
    ) -> AppResult<AccountBalance> {
        let ledger = self.handle_or_create(user_id);
        let mut guard = ledger.lock().await;

        guard.balance.add(amount);

        let balance_after = guard.balance.available();
        guard.push_entry(
            user_id,
            TransactionType::Purchase,
            amount,
            balance_after,
            reference,
            None,
        );

        debug!("Added {} credits for user {}", amount, user_id);
        Ok(guard.balance)
    }

    #[instrument(skip(self, metadata))]
    async fn apply_adjustment(
        &self,
        user_id: &UserId,
        amount: Decimal,
        reference: &LedgerReference,
        metadata: Option<TransactionMetadata>,
    ) -> AppResult<AccountBalance> {
        let ledger = self.handle(user_id)?;
        let mut guard = ledger.lock().await;

        guard.balance.adjust(amount);

        let balance_after = guard.balance.available();
        guard.push_entry(
            user_id,
            TransactionType::Adjustment,
            amount,
            balance_after,
            reference,
            metadata,
        );

        debug!("Adjusted user {} balance by {}", user_id, amount);
        Ok(guard.balance)
    }

    #[instrument(skip(self))]
    async fn list_transactions(
        &self,
        user_id: &UserId,
        query: &TransactionQuery,
    ) -> AppResult<TransactionPage> {
        let ledger = self.handle(user_id)?;
        let guard = ledger.lock().await;

        let matches = |entry: &&TransactionEntry| {
            if let Some(kind) = query.transaction_type {
                if entry.transaction_type != kind {
                    return false;
                }
            }
            if let Some(start) = query.start_date {
                if entry.created_at < start {
                    return false;
                }
            }
            if let Some(end) = query.end_date {
                if entry.created_at > end {
                    return false;
                }
            }
            true
        };

        let total = i64::try_from(guard.log.iter().filter(matches).count()).unwrap_or(i64::MAX);

        // The log is appended in order; newest first for display.
        let transactions: Vec<TransactionEntry> = guard
            .log
            .iter()
            .rev()
            .filter(matches)
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        let has_more =
            i64::from(query.offset) + i64::try_from(transactions.len()).unwrap_or(i64::MAX) < total;

        Ok(TransactionPage {
            transactions,
            total,
            has_more,
        })
    }
}

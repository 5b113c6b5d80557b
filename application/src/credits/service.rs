use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument};

use domain::account::UserId;
use domain::conversion::{DurationValidation, validate_for_duration};
use domain::error::DomainError;
use domain::ledger::{LedgerReference, ReferenceType, TransactionEntry};
use domain::payment::{PaymentId, PaymentStatus};
use domain::session::SessionId;

use crate::{
    config::BillingSettings,
    contracts::credits::{
        BalanceSummary, PurchaseOutcome, TransactionContext, TransactionHistory, TransactionView,
    },
    error::{AppError, AppResult},
    ports::{
        incoming::credits::{
            BalanceQueryUseCase, DurationOptionsUseCase, HistoryQuery, PurchaseCreditsUseCase,
            TransactionHistoryUseCase,
        },
        outgoing::{
            ledger_store::{DynLedgerStorePort, TransactionQuery},
            payment_store::DynPaymentStorePort,
            session_store::DynSessionStorePort,
        },
    },
};

pub struct CreditService {
    settings: BillingSettings,
    ledger_store: DynLedgerStorePort,
    session_store: DynSessionStorePort,
    payment_store: DynPaymentStorePort,
}

impl CreditService {
    pub fn new(
        settings: BillingSettings,
        ledger_store: DynLedgerStorePort,
        session_store: DynSessionStorePort,
        payment_store: DynPaymentStorePort,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            ledger_store,
            session_store,
            payment_store,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_balance(&self, user_id: &UserId) -> AppResult<BalanceSummary> {
        let balance = self.ledger_store.get_balance(user_id).await?;
        Ok(BalanceSummary::from(balance))
    }

    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        user_id: &UserId,
        query: HistoryQuery,
    ) -> AppResult<TransactionHistory> {
        let limit = query
            .limit
            .unwrap_or(self.settings.history_default_limit)
            .min(self.settings.history_max_limit);

        let page = self
            .ledger_store
            .list_transactions(
                user_id,
                &TransactionQuery {
                    limit,
                    offset: query.offset,
                    transaction_type: query.transaction_type,
                    start_date: query.start_date,
                    end_date: query.end_date,
                },
            )
            .await?;

        let mut transactions = Vec::with_capacity(page.transactions.len());
        for entry in page.transactions {
            let context = self.context_for(&entry).await;
            transactions.push(TransactionView { entry, context });
        }

        Ok(TransactionHistory {
            transactions,
            total: page.total,
            has_more: page.has_more,
        })
    }

    /// Joins a log entry's reference against its owning collaborator for
    /// display. Advisory only: lookup failures degrade to no context.
    async fn context_for(&self, entry: &TransactionEntry) -> Option<TransactionContext> {
        let reference_id = entry.reference_id?;
        match entry.reference_type? {
            ReferenceType::Interview => {
                let session_id = SessionId::from_uuid(reference_id);
                let session = self.session_store.get_session(&session_id).await.ok()??;
                Some(TransactionContext::Interview {
                    requested_minutes: session.requested_minutes,
                    elapsed_seconds: session.elapsed_seconds,
                })
            }
            ReferenceType::Payment => {
                let payment_id = PaymentId::from_uuid(reference_id);
                let payment = self.payment_store.get_payment(&payment_id).await.ok()??;
                Some(TransactionContext::Payment {
                    receipt_number: payment.receipt_number,
                })
            }
            ReferenceType::Manual => None,
        }
    }

    #[instrument(skip(self))]
    pub async fn validate_duration(
        &self,
        user_id: &UserId,
        minutes: u32,
    ) -> AppResult<DurationValidation> {
        let balance = self.ledger_store.get_balance(user_id).await?;
        Ok(validate_for_duration(balance.available(), minutes))
    }

    #[instrument(skip(self))]
    pub async fn credit_completed_payment(
        &self,
        payment_id: &PaymentId,
    ) -> AppResult<PurchaseOutcome> {
        let payment = self
            .payment_store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                message: format!("Payment {} not found", payment_id),
            })?;

        if payment.status != PaymentStatus::Completed {
            return Err(AppError::ValidationError {
                message: format!(
                    "Payment {} is {}, only completed payments can be credited",
                    payment_id,
                    payment.status.as_str()
                ),
            });
        }

        if payment.credits <= Decimal::ZERO {
            return Err(AppError::Domain(DomainError::InvalidAmount(format!(
                "Payment {} carries a non-positive credit amount {}",
                payment_id, payment.credits
            ))));
        }

        if payment.is_credited() {
            debug!("Payment {} already credited, skipping", payment_id);
            return Ok(PurchaseOutcome::AlreadyCredited);
        }

        // Claim the latch before touching the balance so a concurrent
        // duplicate webhook cannot credit the same payment twice.
        if !self.payment_store.claim_for_crediting(payment_id).await? {
            debug!("Payment {} claimed by a concurrent caller, skipping", payment_id);
            return Ok(PurchaseOutcome::AlreadyCredited);
        }

        let reference = LedgerReference::payment(payment_id);
        match self
            .ledger_store
            .add_credits(&payment.user_id, payment.credits, &reference)
            .await
        {
            Ok(balance) => {
                info!(
                    "Credited {} credits to user {} for payment {}",
                    payment.credits, payment.user_id, payment_id
                );
                Ok(PurchaseOutcome::Credited {
                    credits_added: payment.credits,
                    new_balance: BalanceSummary::from(balance),
                })
            }
            Err(credit_err) => {
                // The payment succeeded but the ledger update did not; this
                // must never be silently dropped.
                error!(
                    "Payment {} is paid but crediting {} credits failed, \
                     requires manual support intervention: {}",
                    payment_id, payment.credits, credit_err
                );
                if let Err(release_err) =
                    self.payment_store.release_credit_claim(payment_id).await
                {
                    error!(
                        "Failed to release credit claim for payment {}: {}",
                        payment_id, release_err
                    );
                }
                Err(credit_err)
            }
        }
    }
}

#[async_trait::async_trait]
impl BalanceQueryUseCase for CreditService {
    async fn get_balance(&self, user_id: &UserId) -> AppResult<BalanceSummary> {
        self.get_balance(user_id).await
    }
}

#[async_trait::async_trait]
impl TransactionHistoryUseCase for CreditService {
    async fn list_transactions(
        &self,
        user_id: &UserId,
        query: HistoryQuery,
    ) -> AppResult<TransactionHistory> {
        self.list_transactions(user_id, query).await
    }
}

#[async_trait::async_trait]
impl DurationOptionsUseCase for CreditService {
    async fn validate_duration(
        &self,
        user_id: &UserId,
        minutes: u32,
    ) -> AppResult<DurationValidation> {
        self.validate_duration(user_id, minutes).await
    }
}

#[async_trait::async_trait]
impl PurchaseCreditsUseCase for CreditService {
    async fn credit_completed_payment(
        &self,
        payment_id: &PaymentId,
    ) -> AppResult<PurchaseOutcome> {
        self.credit_completed_payment(payment_id).await
    }
}

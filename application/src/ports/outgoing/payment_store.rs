use std::sync::Arc;

use crate::error::AppResult;
use domain::payment::{PaymentId, PaymentRecord};

/// Access to the collaborator-owned payment records. AddCredits trusts its
/// caller on idempotency; this port is where the caller-side check lives.
#[async_trait::async_trait]
pub trait PaymentStorePort: Send + Sync {
    async fn get_payment(&self, payment_id: &PaymentId) -> AppResult<Option<PaymentRecord>>;

    /// Atomically sets `credited_at` if it is still unset. Returns `false`
    /// when the payment was already claimed, so at most one caller proceeds
    /// to AddCredits.
    async fn claim_for_crediting(&self, payment_id: &PaymentId) -> AppResult<bool>;

    /// Clears the `credited_at` latch after a failed AddCredits so a retry
    /// can credit the payment. Best-effort; callers log when it fails too.
    async fn release_credit_claim(&self, payment_id: &PaymentId) -> AppResult<()>;
}

pub type DynPaymentStorePort = Arc<dyn PaymentStorePort>;

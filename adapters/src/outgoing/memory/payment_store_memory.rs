use dashmap::DashMap;
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use domain::payment::{PaymentId, PaymentRecord};
use intervox_application::{
    error::AppResult, ports::outgoing::payment_store::PaymentStorePort,
};

#[derive(Default)]
pub struct MemoryPaymentStoreAdapter {
    payments: DashMap<Uuid, PaymentRecord>,
}

impl MemoryPaymentStoreAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a payment record, standing in for the payment collaborator
    /// persisting a gateway notification.
    pub fn insert_payment(&self, record: PaymentRecord) {
        self.payments.insert(*record.id.as_uuid(), record);
    }
}

#[async_trait::async_trait]
impl PaymentStorePort for MemoryPaymentStoreAdapter {
    async fn get_payment(&self, payment_id: &PaymentId) -> AppResult<Option<PaymentRecord>> {
        Ok(self
            .payments
            .get(payment_id.as_uuid())
            .map(|entry| entry.value().clone()))
    }

    #[instrument(skip(self))]
    async fn claim_for_crediting(&self, payment_id: &PaymentId) -> AppResult<bool> {
        let Some(mut entry) = self.payments.get_mut(payment_id.as_uuid()) else {
            return Ok(false);
        };

        if entry.credited_at.is_some() {
            return Ok(false);
        }

        entry.credited_at = Some(OffsetDateTime::now_utc());
        debug!("Claimed payment {} for crediting", payment_id);
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn release_credit_claim(&self, payment_id: &PaymentId) -> AppResult<()> {
        if let Some(mut entry) = self.payments.get_mut(payment_id.as_uuid()) {
            entry.credited_at = None;
        }
        Ok(())
    }
}

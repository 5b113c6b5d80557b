use std::sync::Arc;

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::error::AppResult;
use domain::account::UserId;
use domain::session::{InterviewSession, SessionId, SessionStatus, SettlementState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub requested_minutes: u32,
    pub credits_blocked: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementWrite {
    pub credits_deducted: Decimal,
    pub credits_refunded: Decimal,
    pub settlement_state: SettlementState,
}

/// Access to the collaborator-owned session records. The ledger writes only
/// the credit fields, the settlement state, and end-of-life status.
#[async_trait::async_trait]
pub trait SessionStorePort: Send + Sync {
    async fn create_session(&self, session: &NewSession) -> AppResult<InterviewSession>;

    async fn get_session(&self, session_id: &SessionId) -> AppResult<Option<InterviewSession>>;

    /// Fills `credits_deducted`/`credits_refunded` only when both are still
    /// unset, atomically. Returns `false` when another trigger settled first;
    /// this is the at-most-once settlement guard.
    async fn record_settlement(
        &self,
        session_id: &SessionId,
        settlement: &SettlementWrite,
    ) -> AppResult<bool>;

    /// Unconditionally overwrites the settlement fields. Correction path for
    /// records that failed the conservation check; never used for first
    /// settlement.
    async fn overwrite_settlement(
        &self,
        session_id: &SessionId,
        settlement: &SettlementWrite,
    ) -> AppResult<()>;

    async fn mark_ended(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
        elapsed_seconds: Option<i64>,
        ended_at: OffsetDateTime,
    ) -> AppResult<()>;

    /// Sessions still holding a reservation with no end-of-call trigger:
    /// `settlement_state = reserved` and status pending/active, created
    /// before `cutoff`.
    async fn find_stale_reserved(
        &self,
        cutoff: OffsetDateTime,
        limit: u32,
    ) -> AppResult<Vec<InterviewSession>>;
}

pub type DynSessionStorePort = Arc<dyn SessionStorePort>;

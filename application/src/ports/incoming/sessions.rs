use crate::contracts::sessions::{
    SessionEndOutcome, SessionEndReport, StartedInterview, SweepReport,
};
use crate::error::AppResult;
use domain::account::UserId;
use domain::session::SessionId;

#[async_trait::async_trait]
pub trait StartInterviewUseCase: Send + Sync {
    /// Reserves credits for the requested duration and creates the session
    /// record. The reservation is in place before the caller may start the
    /// metered call; a setup failure after the reservation refunds it.
    async fn start_interview(
        &self,
        user_id: &UserId,
        requested_minutes: u32,
    ) -> AppResult<StartedInterview>;
}

#[async_trait::async_trait]
pub trait EndInterviewUseCase: Send + Sync {
    /// Single entry point for both session-end triggers (provider webhook and
    /// client fallback). Whichever arrives first settles; the other no-ops.
    async fn end_interview(
        &self,
        session_id: &SessionId,
        report: SessionEndReport,
    ) -> AppResult<SessionEndOutcome>;
}

#[async_trait::async_trait]
pub trait ReclaimStaleReservationsUseCase: Send + Sync {
    /// Releases reservations of sessions abandoned before any end-of-call
    /// trigger and marks them expired.
    async fn reclaim_stale_reservations(&self) -> AppResult<SweepReport>;
}

use dashmap::DashMap;
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use domain::session::{
    InterviewSession, SessionCredits, SessionId, SessionStatus, SettlementState,
};
use intervox_application::{
    error::{AppError, AppResult},
    ports::outgoing::session_store::{NewSession, SessionStorePort, SettlementWrite},
};

#[derive(Default)]
pub struct MemorySessionStoreAdapter {
    sessions: DashMap<Uuid, InterviewSession>,
}

impl MemorySessionStoreAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStorePort for MemorySessionStoreAdapter {
    #[instrument(skip(self, session))]
    async fn create_session(&self, session: &NewSession) -> AppResult<InterviewSession> {
        let record = InterviewSession {
            id: session.id,
            user_id: session.user_id,
            status: SessionStatus::Pending,
            requested_minutes: session.requested_minutes,
            elapsed_seconds: None,
            credits: SessionCredits::reserved(session.credits_blocked),
            created_at: OffsetDateTime::now_utc(),
            ended_at: None,
        };

        match self.sessions.entry(*session.id.as_uuid()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::AlreadyProcessed {
                message: format!("Session {} already exists", session.id),
            }),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(record.clone());
                debug!("Created session {}", session.id);
                Ok(record)
            }
        }
    }

    async fn get_session(&self, session_id: &SessionId) -> AppResult<Option<InterviewSession>> {
        Ok(self
            .sessions
            .get(session_id.as_uuid())
            .map(|entry| entry.value().clone()))
    }

    #[instrument(skip(self, settlement))]
    async fn record_settlement(
        &self,
        session_id: &SessionId,
        settlement: &SettlementWrite,
    ) -> AppResult<bool> {
        let Some(mut entry) = self.sessions.get_mut(session_id.as_uuid()) else {
            return Ok(false);
        };

        // Both fields still unset is the at-most-once guard.
        if !entry.credits.is_unsettled() {
            return Ok(false);
        }

        entry.credits.credits_deducted = Some(settlement.credits_deducted);
        entry.credits.credits_refunded = Some(settlement.credits_refunded);
        entry.credits.settlement_state = settlement.settlement_state;
        Ok(true)
    }

    #[instrument(skip(self, settlement))]
    async fn overwrite_settlement(
        &self,
        session_id: &SessionId,
        settlement: &SettlementWrite,
    ) -> AppResult<()> {
        let mut entry = self
            .sessions
            .get_mut(session_id.as_uuid())
            .ok_or_else(|| AppError::NotFound {
                message: format!("Session {} not found", session_id),
            })?;

        entry.credits.credits_deducted = Some(settlement.credits_deducted);
        entry.credits.credits_refunded = Some(settlement.credits_refunded);
        entry.credits.settlement_state = settlement.settlement_state;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn mark_ended(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
        elapsed_seconds: Option<i64>,
        ended_at: OffsetDateTime,
    ) -> AppResult<()> {
        let mut entry = self
            .sessions
            .get_mut(session_id.as_uuid())
            .ok_or_else(|| AppError::NotFound {
                message: format!("Session {} not found", session_id),
            })?;

        entry.status = status;
        if elapsed_seconds.is_some() {
            entry.elapsed_seconds = elapsed_seconds;
        }
        entry.ended_at = Some(ended_at);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_stale_reserved(
        &self,
        cutoff: OffsetDateTime,
        limit: u32,
    ) -> AppResult<Vec<InterviewSession>> {
        let mut stale: Vec<InterviewSession> = self
            .sessions
            .iter()
            .filter(|entry| {
                let session = entry.value();
                session.credits.settlement_state == SettlementState::Reserved
                    && matches!(
                        session.status,
                        SessionStatus::Pending | SessionStatus::Active
                    )
                    && session.created_at < cutoff
            })
            .map(|entry| entry.value().clone())
            .collect();

        stale.sort_by_key(|session| session.created_at);
        stale.truncate(limit as usize);
        Ok(stale)
    }
}

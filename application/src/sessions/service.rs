use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, error, instrument, warn};

use domain::account::UserId;
use domain::conversion::{credits_for_duration, validate_for_duration};
use domain::error::DomainError;
use domain::ledger::{LedgerReference, MetadataValue, TransactionMetadata};
use domain::session::{InterviewSession, SessionId, SessionStatus, SettlementState};

use crate::{
    config::BillingSettings,
    contracts::{
        credits::BalanceSummary,
        sessions::{SessionEndOutcome, SessionEndReport, StartedInterview, SweepReport},
    },
    error::{AppError, AppResult},
    ports::{
        incoming::sessions::{
            EndInterviewUseCase, ReclaimStaleReservationsUseCase, StartInterviewUseCase,
        },
        outgoing::{
            ledger_store::DynLedgerStorePort,
            session_store::{DynSessionStorePort, NewSession, SettlementWrite},
        },
    },
};

use super::reconciliation::{SettlementDecision, decide};

pub struct SessionService {
    settings: BillingSettings,
    ledger_store: DynLedgerStorePort,
    session_store: DynSessionStorePort,
}

impl SessionService {
    pub fn new(
        settings: BillingSettings,
        ledger_store: DynLedgerStorePort,
        session_store: DynSessionStorePort,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            ledger_store,
            session_store,
        })
    }

    #[instrument(skip(self))]
    pub async fn start_interview(
        &self,
        user_id: &UserId,
        requested_minutes: u32,
    ) -> AppResult<StartedInterview> {
        if requested_minutes == 0 {
            return Err(AppError::Domain(DomainError::InvalidDuration(
                "requested duration must be at least one minute".to_string(),
            )));
        }

        let balance = self.ledger_store.get_balance(user_id).await?;
        let validation = validate_for_duration(balance.available(), requested_minutes);
        if !validation.valid {
            return Err(AppError::InsufficientCredits {
                available: validation.credits_available,
                needed: validation.credits_needed,
            });
        }

        let session_id = SessionId::new();
        let amount = credits_for_duration(requested_minutes);
        let reference = LedgerReference::interview(&session_id);

        let new_balance = self
            .ledger_store
            .block_credits(user_id, amount, &reference)
            .await?;

        let new_session = NewSession {
            id: session_id,
            user_id: *user_id,
            requested_minutes,
            credits_blocked: amount,
        };

        match self.session_store.create_session(&new_session).await {
            Ok(session) => {
                debug!(
                    "Blocked {} credits for session {} ({} min)",
                    amount, session_id, requested_minutes
                );
                Ok(StartedInterview {
                    session,
                    blocked_credits: amount,
                    new_balance: BalanceSummary::from(new_balance),
                })
            }
            Err(create_err) => {
                // Setup failed after the reservation; undo it explicitly.
                warn!(
                    "Session {} setup failed after blocking {} credits, refunding: {}",
                    session_id, amount, create_err
                );
                let metadata = setup_failure_metadata();
                if let Err(refund_err) = self
                    .ledger_store
                    .refund_blocked(user_id, amount, &reference, Some(metadata))
                    .await
                {
                    error!(
                        "Failed to refund {} blocked credits for aborted session {}, \
                         requires manual support intervention: {}",
                        amount, session_id, refund_err
                    );
                }
                Err(create_err)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn end_interview(
        &self,
        session_id: &SessionId,
        report: SessionEndReport,
    ) -> AppResult<SessionEndOutcome> {
        let session = self
            .session_store
            .get_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                message: format!("Session {} not found", session_id),
            })?;

        match decide(&session, &report) {
            SettlementDecision::AlreadySettled => {
                debug!(
                    "Session {} already settled, {} trigger is a no-op",
                    session_id,
                    report.trigger.as_str()
                );
                Ok(SessionEndOutcome::AlreadySettled)
            }
            SettlementDecision::Settle { actual_credits } => {
                self.settle(&session, &report, actual_credits).await
            }
            SettlementDecision::RefundAll => self.refund_all(&session, &report).await,
            SettlementDecision::Correct {
                credits_deducted,
                credits_refunded,
                previous_deducted,
                previous_refunded,
            } => {
                self.correct(
                    &session,
                    &report,
                    credits_deducted,
                    credits_refunded,
                    previous_deducted,
                    previous_refunded,
                )
                .await
            }
            SettlementDecision::AwaitUsageData => {
                warn!(
                    "Session {} ended via {} with no usage data, \
                     flagged for manual follow-up",
                    session_id,
                    report.trigger.as_str()
                );
                self.session_store
                    .mark_ended(
                        session_id,
                        SessionStatus::Completed,
                        None,
                        OffsetDateTime::now_utc(),
                    )
                    .await?;
                Ok(SessionEndOutcome::AwaitingUsageData)
            }
        }
    }

    async fn settle(
        &self,
        session: &InterviewSession,
        report: &SessionEndReport,
        actual_credits: Decimal,
    ) -> AppResult<SessionEndOutcome> {
        let blocked = session.credits.credits_blocked;
        let deducted = actual_credits.min(blocked).max(Decimal::ZERO);
        let refunded = blocked - deducted;

        let write = SettlementWrite {
            credits_deducted: deducted,
            credits_refunded: refunded,
            settlement_state: SettlementState::Settled,
        };

        // Claim the session first: the conditional write is the at-most-once
        // guard between the two racing triggers.
        if !self.session_store.record_settlement(&session.id, &write).await? {
            debug!(
                "Session {} settled by the other trigger, {} is a no-op",
                session.id,
                report.trigger.as_str()
            );
            return Ok(SessionEndOutcome::AlreadySettled);
        }

        let reference = LedgerReference::interview(&session.id);
        let settled = match self
            .ledger_store
            .deduct_and_settle(
                &session.user_id,
                blocked,
                actual_credits,
                &reference,
                Some(trigger_metadata(report)),
            )
            .await
        {
            Ok(settled) => settled,
            Err(err) => {
                error!(
                    "Session {} claimed settlement but the ledger charge failed, \
                     requires manual support intervention: {}",
                    session.id, err
                );
                return Err(err);
            }
        };

        self.session_store
            .mark_ended(
                &session.id,
                SessionStatus::Completed,
                report.elapsed_seconds.and_then(|s| i64::try_from(s).ok()),
                OffsetDateTime::now_utc(),
            )
            .await?;

        debug!(
            "Session {} settled: deducted {}, refunded {}",
            session.id, settled.settlement.deducted, settled.settlement.refunded
        );

        Ok(SessionEndOutcome::Settled {
            credits_deducted: settled.settlement.deducted,
            credits_refunded: settled.settlement.refunded,
            new_balance: BalanceSummary::from(settled.balance),
        })
    }

    async fn refund_all(
        &self,
        session: &InterviewSession,
        report: &SessionEndReport,
    ) -> AppResult<SessionEndOutcome> {
        let blocked = session.credits.credits_blocked;
        let write = SettlementWrite {
            credits_deducted: Decimal::ZERO,
            credits_refunded: blocked,
            settlement_state: SettlementState::Refunded,
        };

        if !self.session_store.record_settlement(&session.id, &write).await? {
            return Ok(SessionEndOutcome::AlreadySettled);
        }

        let reference = LedgerReference::interview(&session.id);
        let balance = self
            .ledger_store
            .refund_blocked(
                &session.user_id,
                blocked,
                &reference,
                Some(trigger_metadata(report)),
            )
            .await?;

        self.session_store
            .mark_ended(
                &session.id,
                SessionStatus::Failed,
                None,
                OffsetDateTime::now_utc(),
            )
            .await?;

        debug!(
            "Session {} failed before producing output, refunded {} blocked credits",
            session.id, blocked
        );

        Ok(SessionEndOutcome::Refunded {
            credits_refunded: blocked,
            new_balance: BalanceSummary::from(balance),
        })
    }

    async fn correct(
        &self,
        session: &InterviewSession,
        report: &SessionEndReport,
        credits_deducted: Decimal,
        credits_refunded: Decimal,
        previous_deducted: Option<Decimal>,
        previous_refunded: Option<Decimal>,
    ) -> AppResult<SessionEndOutcome> {
        error!(
            "Session {} settlement is inconsistent (blocked {}, deducted {:?}, \
             refunded {:?}), re-running settlement",
            session.id, session.credits.credits_blocked, previous_deducted, previous_refunded
        );

        let write = SettlementWrite {
            credits_deducted,
            credits_refunded,
            settlement_state: SettlementState::Settled,
        };
        self.session_store
            .overwrite_settlement(&session.id, &write)
            .await?;

        // The old charge (if any) already left the balance; apply only the
        // difference between it and the recomputed charge.
        let delta = previous_deducted.unwrap_or(Decimal::ZERO) - credits_deducted;
        if !delta.is_zero() {
            let mut metadata = trigger_metadata(report);
            metadata.insert(
                "previous_deducted".to_string(),
                MetadataValue::Number(previous_deducted.unwrap_or(Decimal::ZERO)),
            );
            metadata.insert(
                "previous_refunded".to_string(),
                MetadataValue::Number(previous_refunded.unwrap_or(Decimal::ZERO)),
            );

            let reference = LedgerReference::interview(&session.id);
            self.ledger_store
                .apply_adjustment(&session.user_id, delta, &reference, Some(metadata))
                .await?;
        }

        self.session_store
            .mark_ended(
                &session.id,
                SessionStatus::Completed,
                report.elapsed_seconds.and_then(|s| i64::try_from(s).ok()),
                OffsetDateTime::now_utc(),
            )
            .await?;

        Ok(SessionEndOutcome::Corrected {
            credits_deducted,
            credits_refunded,
        })
    }

    /// Releases reservations of sessions that never reached an end-of-call
    /// trigger. Per-session failures are logged and skipped so one bad row
    /// cannot wedge the sweep.
    #[instrument(skip(self))]
    pub async fn reclaim_stale_reservations(&self) -> AppResult<SweepReport> {
        let ttl = Duration::from_secs(self.settings.stale_reservation_ttl_secs);
        let cutoff = OffsetDateTime::now_utc() - ttl;

        let stale = self
            .session_store
            .find_stale_reserved(cutoff, self.settings.stale_sweep_batch_size)
            .await?;

        let mut report = SweepReport {
            sessions_scanned: stale.len(),
            ..SweepReport::default()
        };

        for session in stale {
            let blocked = session.credits.credits_blocked;
            let write = SettlementWrite {
                credits_deducted: Decimal::ZERO,
                credits_refunded: blocked,
                settlement_state: SettlementState::Refunded,
            };

            let claimed = match self.session_store.record_settlement(&session.id, &write).await {
                Ok(claimed) => claimed,
                Err(err) => {
                    warn!("Skipping stale session {}: {}", session.id, err);
                    continue;
                }
            };
            if !claimed {
                continue;
            }

            let reference = LedgerReference::interview(&session.id);
            if let Err(err) = self
                .ledger_store
                .refund_blocked(&session.user_id, blocked, &reference, Some(sweep_metadata()))
                .await
            {
                error!(
                    "Stale session {} claimed but refund of {} credits failed, \
                     requires manual support intervention: {}",
                    session.id, blocked, err
                );
                continue;
            }

            if let Err(err) = self
                .session_store
                .mark_ended(
                    &session.id,
                    SessionStatus::Expired,
                    None,
                    OffsetDateTime::now_utc(),
                )
                .await
            {
                warn!("Failed to mark swept session {} expired: {}", session.id, err);
            }

            report.sessions_released += 1;
            report.credits_released += blocked;
        }

        if report.sessions_released > 0 {
            debug!(
                "Reclaimed {} credits from {} stale sessions",
                report.credits_released, report.sessions_released
            );
        }

        Ok(report)
    }
}

fn trigger_metadata(report: &SessionEndReport) -> TransactionMetadata {
    let mut metadata = TransactionMetadata::new();
    metadata.insert(
        "trigger".to_string(),
        MetadataValue::Text(report.trigger.as_str().to_string()),
    );
    metadata
}

fn setup_failure_metadata() -> TransactionMetadata {
    let mut metadata = TransactionMetadata::new();
    metadata.insert("setup_failure".to_string(), MetadataValue::Flag(true));
    metadata
}

fn sweep_metadata() -> TransactionMetadata {
    let mut metadata = TransactionMetadata::new();
    metadata.insert("sweep".to_string(), MetadataValue::Flag(true));
    metadata
}

#[async_trait::async_trait]
impl StartInterviewUseCase for SessionService {
    async fn start_interview(
        &self,
        user_id: &UserId,
        requested_minutes: u32,
    ) -> AppResult<StartedInterview> {
        self.start_interview(user_id, requested_minutes).await
    }
}

#[async_trait::async_trait]
impl EndInterviewUseCase for SessionService {
    async fn end_interview(
        &self,
        session_id: &SessionId,
        report: SessionEndReport,
    ) -> AppResult<SessionEndOutcome> {
        self.end_interview(session_id, report).await
    }
}

#[async_trait::async_trait]
impl ReclaimStaleReservationsUseCase for SessionService {
    async fn reclaim_stale_reservations(&self) -> AppResult<SweepReport> {
        self.reclaim_stale_reservations().await
    }
}

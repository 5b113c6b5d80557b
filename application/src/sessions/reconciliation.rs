//! Session-end decision logic.
//!
//! Two triggers race to settle every session: the provider webhook and the
//! client-driven fallback. Whichever arrives first performs settlement; the
//! second must observe already-settled fields and no-op. A settled record
//! whose parts no longer add up to the blocked amount is a data-integrity
//! signal and is corrected, never silently accepted.

use rust_decimal::Decimal;

use domain::conversion::credits_from_elapsed_seconds;
use domain::session::{InterviewSession, SessionStatus};

use crate::contracts::sessions::{ReportedOutcome, SessionEndReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementDecision {
    /// Settlement already happened; nothing to do.
    AlreadySettled,
    /// The record claims settlement but fails the conservation check (or has
    /// exactly one field set). Re-run settlement with the recomputed split
    /// and adjust the balance by the difference.
    Correct {
        credits_deducted: Decimal,
        credits_refunded: Decimal,
        previous_deducted: Option<Decimal>,
        previous_refunded: Option<Decimal>,
    },
    /// Unsettled with usage known: run DeductAndSettle with this amount.
    Settle { actual_credits: Decimal },
    /// Unsettled and the call never produced usable output: full refund.
    RefundAll,
    /// Unsettled with no usage data: cannot bill without guessing.
    AwaitUsageData,
}

pub fn decide(session: &InterviewSession, report: &SessionEndReport) -> SettlementDecision {
    let credits = &session.credits;

    if session.status == SessionStatus::Completed && credits.credits_deducted.is_some() {
        return SettlementDecision::AlreadySettled;
    }

    if credits.is_settled() {
        if credits.conserves_blocked_amount() {
            return SettlementDecision::AlreadySettled;
        }
        return correction(session, report);
    }

    if !credits.is_unsettled() {
        // Exactly one field set: a state no operation produces.
        return correction(session, report);
    }

    if report.outcome == ReportedOutcome::Failed {
        return SettlementDecision::RefundAll;
    }

    match effective_elapsed(session, report) {
        Some(seconds) if seconds > 0 => SettlementDecision::Settle {
            actual_credits: credits_from_elapsed_seconds(seconds),
        },
        _ => SettlementDecision::AwaitUsageData,
    }
}

/// Recomputes the clamped split from the blocked amount and the best usage
/// figure available: the report's elapsed time, the session's recorded
/// elapsed time, or failing both, the previously recorded charge.
fn correction(session: &InterviewSession, report: &SessionEndReport) -> SettlementDecision {
    let credits = &session.credits;
    let blocked = credits.credits_blocked;

    let actual = effective_elapsed(session, report)
        .map(credits_from_elapsed_seconds)
        .or(credits.credits_deducted)
        .unwrap_or(Decimal::ZERO);

    let deducted = actual.min(blocked).max(Decimal::ZERO);
    let refunded = blocked - deducted;

    SettlementDecision::Correct {
        credits_deducted: deducted,
        credits_refunded: refunded,
        previous_deducted: credits.credits_deducted,
        previous_refunded: credits.credits_refunded,
    }
}

fn effective_elapsed(session: &InterviewSession, report: &SessionEndReport) -> Option<u64> {
    report
        .elapsed_seconds
        .or_else(|| session.elapsed_seconds.and_then(|s| u64::try_from(s).ok()))
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use domain::account::UserId;
    use domain::session::{SessionCredits, SessionId, SettlementState};

    use super::*;
    use crate::contracts::sessions::EndTrigger;

    fn session(status: SessionStatus, credits: SessionCredits) -> InterviewSession {
        InterviewSession {
            id: SessionId::from_uuid(Uuid::new_v4()),
            user_id: UserId::new(),
            status,
            requested_minutes: 5,
            elapsed_seconds: None,
            credits,
            created_at: OffsetDateTime::UNIX_EPOCH,
            ended_at: None,
        }
    }

    fn report(elapsed: Option<u64>) -> SessionEndReport {
        SessionEndReport {
            trigger: EndTrigger::ProviderWebhook,
            outcome: ReportedOutcome::Completed,
            elapsed_seconds: elapsed,
        }
    }

    fn settled_credits(blocked: i64, deducted: i64, refunded: i64) -> SessionCredits {
        SessionCredits {
            credits_blocked: Decimal::from(blocked),
            credits_deducted: Some(Decimal::from(deducted)),
            credits_refunded: Some(Decimal::from(refunded)),
            settlement_state: SettlementState::Settled,
        }
    }

    #[test]
    fn completed_and_settled_is_a_no_op() {
        let session = session(SessionStatus::Completed, settled_credits(50, 30, 20));
        assert_eq!(
            decide(&session, &report(Some(200))),
            SettlementDecision::AlreadySettled
        );
    }

    #[test]
    fn consistent_settlement_is_a_no_op_regardless_of_status() {
        let session = session(SessionStatus::Active, settled_credits(50, 30, 20));
        assert_eq!(
            decide(&session, &report(Some(200))),
            SettlementDecision::AlreadySettled
        );
    }

    #[test]
    fn mismatched_settlement_is_recomputed() {
        // 30 + 10 != 50: two triggers computed different durations.
        let session = session(SessionStatus::Active, settled_credits(50, 30, 10));
        let decision = decide(&session, &report(Some(150)));
        assert_eq!(
            decision,
            SettlementDecision::Correct {
                credits_deducted: Decimal::from(25),
                credits_refunded: Decimal::from(25),
                previous_deducted: Some(Decimal::from(30)),
                previous_refunded: Some(Decimal::from(10)),
            }
        );
    }

    #[test]
    fn mismatch_without_usage_data_clamps_previous_charge() {
        let session = session(SessionStatus::Active, settled_credits(50, 80, 10));
        let decision = decide(&session, &report(None));
        assert_eq!(
            decision,
            SettlementDecision::Correct {
                credits_deducted: Decimal::from(50),
                credits_refunded: Decimal::ZERO,
                previous_deducted: Some(Decimal::from(80)),
                previous_refunded: Some(Decimal::from(10)),
            }
        );
    }

    #[test]
    fn half_written_settlement_is_treated_as_mismatch() {
        let mut credits = SessionCredits::reserved(Decimal::from(50));
        credits.credits_deducted = Some(Decimal::from(30));
        let session = session(SessionStatus::Active, credits);
        assert!(matches!(
            decide(&session, &report(None)),
            SettlementDecision::Correct { .. }
        ));
    }

    #[test]
    fn unsettled_with_elapsed_duration_settles_from_usage() {
        let session = session(
            SessionStatus::Active,
            SessionCredits::reserved(Decimal::from(50)),
        );
        assert_eq!(
            decide(&session, &report(Some(125))),
            SettlementDecision::Settle {
                actual_credits: Decimal::new(225, 1),
            }
        );
    }

    #[test]
    fn unsettled_failed_call_refunds_everything() {
        let session = session(
            SessionStatus::Active,
            SessionCredits::reserved(Decimal::from(50)),
        );
        let failed = SessionEndReport {
            trigger: EndTrigger::ClientFallback,
            outcome: ReportedOutcome::Failed,
            elapsed_seconds: None,
        };
        assert_eq!(decide(&session, &failed), SettlementDecision::RefundAll);
    }

    #[test]
    fn unsettled_without_usage_data_waits_for_manual_follow_up() {
        let session = session(
            SessionStatus::Active,
            SessionCredits::reserved(Decimal::from(50)),
        );
        assert_eq!(
            decide(&session, &report(None)),
            SettlementDecision::AwaitUsageData
        );
        assert_eq!(
            decide(&session, &report(Some(0))),
            SettlementDecision::AwaitUsageData
        );
    }

    #[test]
    fn session_recorded_elapsed_backs_up_a_silent_report() {
        let mut session = session(
            SessionStatus::Active,
            SessionCredits::reserved(Decimal::from(50)),
        );
        session.elapsed_seconds = Some(150);
        assert_eq!(
            decide(&session, &report(None)),
            SettlementDecision::Settle {
                actual_credits: Decimal::from(25),
            }
        );
    }
}

use std::fmt::{Display, Formatter, Result as FmtResult};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::account::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Active,
    Completed,
    Failed,
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// Explicit settlement lifecycle for a session's reservation. The nullable
/// deducted/refunded pair below stays the contract with the session record;
/// this enum removes the ambiguity of partially-set fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    Reserved,
    Settled,
    Refunded,
}

impl SettlementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Settled => "settled",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reserved" => Some(Self::Reserved),
            "settled" => Some(Self::Settled),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// Absolute mismatch tolerated when validating a settled record, since other
/// components may have written the fields with float arithmetic.
pub fn settlement_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// The four ledger-owned credit fields on a session record.
/// `credits_blocked` is set once at reservation time; exactly one settlement
/// later fills both `credits_deducted` and `credits_refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCredits {
    pub credits_blocked: Decimal,
    pub credits_deducted: Option<Decimal>,
    pub credits_refunded: Option<Decimal>,
    pub settlement_state: SettlementState,
}

impl SessionCredits {
    pub fn reserved(credits_blocked: Decimal) -> Self {
        Self {
            credits_blocked,
            credits_deducted: None,
            credits_refunded: None,
            settlement_state: SettlementState::Reserved,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.credits_deducted.is_some() && self.credits_refunded.is_some()
    }

    pub fn is_unsettled(&self) -> bool {
        self.credits_deducted.is_none() && self.credits_refunded.is_none()
    }

    /// Conservation check: `deducted + refunded == blocked` within tolerance.
    /// Only meaningful for settled records.
    pub fn conserves_blocked_amount(&self) -> bool {
        match (self.credits_deducted, self.credits_refunded) {
            (Some(deducted), Some(refunded)) => {
                (deducted + refunded - self.credits_blocked).abs() < settlement_tolerance()
            }
            _ => false,
        }
    }
}

/// Session record owned by the session collaborator. The ledger only
/// reads/writes the `credits` fields and the settlement state.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub status: SessionStatus,
    pub requested_minutes: u32,
    pub elapsed_seconds: Option<i64>,
    pub credits: SessionCredits,
    pub created_at: OffsetDateTime,
    pub ended_at: Option<OffsetDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settled(blocked: i64, deducted: i64, refunded: i64) -> SessionCredits {
        SessionCredits {
            credits_blocked: Decimal::from(blocked),
            credits_deducted: Some(Decimal::from(deducted)),
            credits_refunded: Some(Decimal::from(refunded)),
            settlement_state: SettlementState::Settled,
        }
    }

    #[test]
    fn conservation_holds_for_exact_split() {
        assert!(settled(50, 30, 20).conserves_blocked_amount());
    }

    #[test]
    fn conservation_tolerates_sub_cent_drift() {
        let mut credits = settled(50, 30, 20);
        credits.credits_refunded = Some(Decimal::new(19_995, 3)); // 19.995
        assert!(credits.conserves_blocked_amount());
    }

    #[test]
    fn conservation_fails_for_real_mismatch() {
        assert!(!settled(50, 30, 10).conserves_blocked_amount());
    }

    #[test]
    fn unsettled_record_never_conserves() {
        assert!(!SessionCredits::reserved(Decimal::from(50)).conserves_blocked_amount());
    }
}

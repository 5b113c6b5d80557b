use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::account::UserId;
use crate::payment::PaymentId;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Purchase,
    Block,
    Deduct,
    Refund,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Block => "block",
            Self::Deduct => "deduct",
            Self::Refund => "refund",
            Self::Adjustment => "adjustment",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "purchase" => Some(Self::Purchase),
            "block" => Some(Self::Block),
            "deduct" => Some(Self::Deduct),
            "refund" => Some(Self::Refund),
            "adjustment" => Some(Self::Adjustment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Interview,
    Payment,
    Manual,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interview => "interview",
            Self::Payment => "payment",
            Self::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "interview" => Some(Self::Interview),
            "payment" => Some(Self::Payment),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Link from a log entry to the session or payment that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerReference {
    pub reference_id: Uuid,
    pub reference_type: ReferenceType,
}

impl LedgerReference {
    pub fn interview(session_id: &SessionId) -> Self {
        Self {
            reference_id: *session_id.as_uuid(),
            reference_type: ReferenceType::Interview,
        }
    }

    pub fn payment(payment_id: &PaymentId) -> Self {
        Self {
            reference_id: *payment_id.as_uuid(),
            reference_type: ReferenceType::Payment,
        }
    }

    pub fn manual(reference_id: Uuid) -> Self {
        Self {
            reference_id,
            reference_type: ReferenceType::Manual,
        }
    }
}

/// Advisory audit payload. Typed map of primitives; never branched on by
/// ledger logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Flag(bool),
    Number(Decimal),
    Text(String),
}

pub type TransactionMetadata = BTreeMap<String, MetadataValue>;

/// One append-only log entry per balance-changing event. Entries are
/// immutable once written. `amount` is the signed delta applied to
/// availability: negative for block/deduct, positive for purchase/refund.
/// `balance_after` records the available credits right after the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEntry {
    pub id: Uuid,
    pub user_id: UserId,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<ReferenceType>,
    pub metadata: Option<TransactionMetadata>,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_labels_round_trip() {
        for kind in [
            TransactionType::Purchase,
            TransactionType::Block,
            TransactionType::Deduct,
            TransactionType::Refund,
            TransactionType::Adjustment,
        ] {
            assert_eq!(TransactionType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionType::parse("chargeback"), None);
    }

    #[test]
    fn reference_type_labels_round_trip() {
        for kind in [
            ReferenceType::Interview,
            ReferenceType::Payment,
            ReferenceType::Manual,
        ] {
            assert_eq!(ReferenceType::parse(kind.as_str()), Some(kind));
        }
    }
}

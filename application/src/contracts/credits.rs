use rust_decimal::Decimal;

use domain::account::AccountBalance;
use domain::ledger::TransactionEntry;

/// Balance snapshot shaped for query surfaces: the derived available figure
/// is computed once here so callers never re-derive it inconsistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSummary {
    pub credits: Decimal,
    pub blocked_credits: Decimal,
    pub available_credits: Decimal,
}

impl From<AccountBalance> for BalanceSummary {
    fn from(balance: AccountBalance) -> Self {
        Self {
            credits: balance.credits,
            blocked_credits: balance.blocked_credits,
            available_credits: balance.available(),
        }
    }
}

/// Human-readable context joined from the referenced session or payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionContext {
    Interview {
        requested_minutes: u32,
        elapsed_seconds: Option<i64>,
    },
    Payment {
        receipt_number: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionView {
    pub entry: TransactionEntry,
    pub context: Option<TransactionContext>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionHistory {
    pub transactions: Vec<TransactionView>,
    pub total: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Credited {
        credits_added: Decimal,
        new_balance: BalanceSummary,
    },
    /// Benign idempotency short-circuit: the payment was credited earlier.
    AlreadyCredited,
}

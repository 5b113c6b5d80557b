use rust_decimal::Decimal;

use domain::session::InterviewSession;

use crate::contracts::credits::BalanceSummary;

#[derive(Debug, Clone, PartialEq)]
pub struct StartedInterview {
    pub session: InterviewSession,
    pub blocked_credits: Decimal,
    pub new_balance: BalanceSummary,
}

/// Which of the two racing session-end triggers produced this report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndTrigger {
    ProviderWebhook,
    ClientFallback,
}

impl EndTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProviderWebhook => "provider_webhook",
            Self::ClientFallback => "client_fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedOutcome {
    /// The call ran; usage may or may not be known.
    Completed,
    /// The call never produced usable output (failed before connecting).
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEndReport {
    pub trigger: EndTrigger,
    pub outcome: ReportedOutcome,
    pub elapsed_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEndOutcome {
    Settled {
        credits_deducted: Decimal,
        credits_refunded: Decimal,
        new_balance: BalanceSummary,
    },
    Refunded {
        credits_refunded: Decimal,
        new_balance: BalanceSummary,
    },
    /// The other trigger settled first; nothing changed.
    AlreadySettled,
    Corrected {
        credits_deducted: Decimal,
        credits_refunded: Decimal,
    },
    /// No usage data; flagged for manual follow-up instead of guessing.
    AwaitingUsageData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub sessions_scanned: usize,
    pub sessions_released: usize,
    pub credits_released: Decimal,
}

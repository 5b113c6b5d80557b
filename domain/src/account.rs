use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
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

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

/// Per-user credit balance. `credits` is everything the user owns,
/// `blocked_credits` the portion reserved against in-flight sessions.
/// Invariant: `0 <= blocked_credits <= credits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountBalance {
    pub credits: Decimal,
    pub blocked_credits: Decimal,
}

/// Split of a released reservation into the charged and returned parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub deducted: Decimal,
    pub refunded: Decimal,
}

impl AccountBalance {
    pub fn new(credits: Decimal, blocked_credits: Decimal) -> Self {
        Self {
            credits,
            blocked_credits,
        }
    }

    pub fn empty() -> Self {
        Self {
            credits: Decimal::ZERO,
            blocked_credits: Decimal::ZERO,
        }
    }

    pub fn available(&self) -> Decimal {
        self.credits - self.blocked_credits
    }

    /// Reserves `amount` against the available balance.
    pub fn block(&mut self, amount: Decimal) -> Result<(), InsufficientCreditsError> {
        let available = self.available();
        if available < amount {
            return Err(InsufficientCreditsError {
                needed: amount,
                available,
            });
        }
        self.blocked_credits += amount;
        Ok(())
    }

    /// Converts a reservation of `blocked_amount` into a final charge once
    /// `actual_amount` is known. The charge is clamped to the reservation, so
    /// a session can never cost more than what was blocked for it.
    pub fn settle(
        &mut self,
        blocked_amount: Decimal,
        actual_amount: Decimal,
    ) -> DomainResult<Settlement> {
        if blocked_amount > self.blocked_credits {
            return Err(DomainError::ReservationExceedsBlocked {
                requested: blocked_amount,
                blocked: self.blocked_credits,
            });
        }
        let deducted = actual_amount.min(blocked_amount).max(Decimal::ZERO);
        let refunded = blocked_amount - deducted;
        self.credits -= deducted;
        self.blocked_credits -= blocked_amount;
        Ok(Settlement { deducted, refunded })
    }

    /// Returns a full reservation to the available balance.
    pub fn release(&mut self, amount: Decimal) -> DomainResult<()> {
        if amount > self.blocked_credits {
            return Err(DomainError::ReservationExceedsBlocked {
                requested: amount,
                blocked: self.blocked_credits,
            });
        }
        self.blocked_credits -= amount;
        Ok(())
    }

    /// Adds purchased credits. The only routine operation that increases
    /// `credits`.
    pub fn add(&mut self, amount: Decimal) {
        self.credits += amount;
    }

    /// Applies a signed correction to total credits. Reconciliation-only.
    pub fn adjust(&mut self, delta: Decimal) {
        self.credits += delta;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientCreditsError {
    pub needed: Decimal,
    pub available: Decimal,
}

impl Display for InsufficientCreditsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "Insufficient credits: required {}, available {}",
            self.needed, self.available
        )
    }
}

impl Error for InsufficientCreditsError {}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn balance(credits: u32, blocked: u32) -> AccountBalance {
        AccountBalance::new(Decimal::from(credits), Decimal::from(blocked))
    }

    #[test]
    fn block_reserves_within_available() {
        let mut account = balance(100, 0);
        account.block(Decimal::from(50)).unwrap();
        assert_eq!(account.blocked_credits, Decimal::from(50));
        assert_eq!(account.available(), Decimal::from(50));
    }

    #[test]
    fn block_rejects_over_available() {
        let mut account = balance(100, 80);
        let err = account.block(Decimal::from(30)).unwrap_err();
        assert_eq!(err.needed, Decimal::from(30));
        assert_eq!(err.available, Decimal::from(20));
        assert_eq!(account.blocked_credits, Decimal::from(80));
    }

    #[test]
    fn settle_splits_into_deduct_and_refund() {
        let mut account = balance(100, 50);
        let settlement = account
            .settle(Decimal::from(50), Decimal::from(30))
            .unwrap();
        assert_eq!(settlement.deducted, Decimal::from(30));
        assert_eq!(settlement.refunded, Decimal::from(20));
        assert_eq!(account.credits, Decimal::from(70));
        assert_eq!(account.blocked_credits, Decimal::ZERO);
        assert_eq!(account.available(), Decimal::from(70));
    }

    #[test]
    fn settle_clamps_to_blocked_amount() {
        let mut account = balance(100, 50);
        let settlement = account
            .settle(Decimal::from(50), Decimal::from(80))
            .unwrap();
        assert_eq!(settlement.deducted, Decimal::from(50));
        assert_eq!(settlement.refunded, Decimal::ZERO);
        assert_eq!(account.credits, Decimal::from(50));
    }

    #[test]
    fn release_restores_available() {
        let mut account = balance(100, 50);
        account.release(Decimal::from(50)).unwrap();
        assert_eq!(account, balance(100, 0));
    }

    #[test]
    fn release_beyond_blocked_is_rejected() {
        let mut account = balance(100, 20);
        assert!(account.release(Decimal::from(30)).is_err());
    }
}

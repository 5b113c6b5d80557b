//! Duration/credit conversion. Pure functions, no state.
//!
//! Usage is billed in 15-second increments rounded up, at 10 credits per
//! minute, so a caller is never charged for more than elapsed-rounded-up and
//! sub-increment slivers never go unbilled.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

pub const CREDITS_PER_MINUTE: u32 = 10;
pub const BILLING_INCREMENT_SECONDS: u64 = 15;
pub const STANDARD_DURATIONS_MINUTES: [u32; 4] = [3, 5, 8, 10];

pub fn credits_for_duration(minutes: u32) -> Decimal {
    Decimal::from(minutes * CREDITS_PER_MINUTE)
}

pub fn credits_from_elapsed_seconds(seconds: u64) -> Decimal {
    let billed_seconds = seconds.div_ceil(BILLING_INCREMENT_SECONDS) * BILLING_INCREMENT_SECONDS;
    Decimal::from(billed_seconds * u64::from(CREDITS_PER_MINUTE)) / Decimal::from(60_u64)
}

pub fn max_duration_minutes(credits: Decimal) -> u32 {
    (credits / Decimal::from(CREDITS_PER_MINUTE))
        .floor()
        .to_u32()
        .unwrap_or(0)
}

/// Standard durations that fit the available balance; falls back to the
/// single longest affordable duration when none of the standard ones fit.
pub fn suggest_durations(available_credits: Decimal) -> Vec<u32> {
    let max_minutes = max_duration_minutes(available_credits);
    let fitting: Vec<u32> = STANDARD_DURATIONS_MINUTES
        .iter()
        .copied()
        .filter(|minutes| *minutes <= max_minutes)
        .collect();

    if !fitting.is_empty() {
        fitting
    } else if max_minutes > 0 {
        vec![max_minutes]
    } else {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationValidation {
    pub valid: bool,
    pub credits_needed: Decimal,
    pub credits_available: Decimal,
    pub suggested_durations: Option<Vec<u32>>,
    pub max_duration: Option<u32>,
}

pub fn validate_for_duration(available_credits: Decimal, minutes: u32) -> DurationValidation {
    let credits_needed = credits_for_duration(minutes);
    if available_credits >= credits_needed {
        DurationValidation {
            valid: true,
            credits_needed,
            credits_available: available_credits,
            suggested_durations: None,
            max_duration: None,
        }
    } else {
        DurationValidation {
            valid: false,
            credits_needed,
            credits_available: available_credits,
            suggested_durations: Some(suggest_durations(available_credits)),
            max_duration: Some(max_duration_minutes(available_credits)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap_or_default()
    }

    #[test]
    fn whole_minutes_convert_at_flat_rate() {
        assert_eq!(credits_for_duration(3), Decimal::from(30));
        assert_eq!(credits_for_duration(8), Decimal::from(80));
    }

    #[test]
    fn elapsed_seconds_round_up_to_billing_increment() {
        // 125s rounds up to 135s = 2.25 min
        assert_eq!(credits_from_elapsed_seconds(125), dec("22.5"));
        // 150s is already on an increment boundary
        assert_eq!(credits_from_elapsed_seconds(150), Decimal::from(25));
        // 305s rounds up to 315s = 5.25 min
        assert_eq!(credits_from_elapsed_seconds(305), dec("52.5"));
        assert_eq!(credits_from_elapsed_seconds(0), Decimal::ZERO);
        assert_eq!(credits_from_elapsed_seconds(1), dec("2.5"));
    }

    #[test]
    fn max_duration_floors_partial_minutes() {
        assert_eq!(max_duration_minutes(Decimal::from(20)), 2);
        assert_eq!(max_duration_minutes(dec("29.9")), 2);
        assert_eq!(max_duration_minutes(Decimal::ZERO), 0);
        assert_eq!(max_duration_minutes(dec("-5")), 0);
    }

    #[test]
    fn suggestions_prefer_standard_durations() {
        assert_eq!(suggest_durations(Decimal::from(100)), vec![3, 5, 8, 10]);
        assert_eq!(suggest_durations(Decimal::from(55)), vec![3, 5]);
    }

    #[test]
    fn suggestions_fall_back_to_longest_affordable() {
        // 20 credits affords 2 minutes, below every standard duration
        assert_eq!(suggest_durations(Decimal::from(20)), vec![2]);
        assert_eq!(suggest_durations(Decimal::from(5)), Vec::<u32>::new());
    }

    #[test]
    fn validation_reports_shortfall_with_recovery_options() {
        let result = validate_for_duration(Decimal::from(20), 5);
        assert!(!result.valid);
        assert_eq!(result.credits_needed, Decimal::from(50));
        assert_eq!(result.credits_available, Decimal::from(20));
        assert_eq!(result.suggested_durations, Some(vec![2]));
        assert_eq!(result.max_duration, Some(2));

        let result = validate_for_duration(Decimal::from(50), 5);
        assert!(result.valid);
        assert_eq!(result.suggested_durations, None);
    }
}

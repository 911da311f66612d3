//! Pure fire decisions.
//!
//! Every decision is made by modulo arithmetic on the current phase, so the
//! tick path never builds trigger tables, even when a row's pattern length is
//! the product of two divisors.

use crate::LogicOperator;

/// Whether a row dividing by `divisor` fires at `phase`.
///
/// True exactly once per `divisor` consecutive phases, on the last one.
/// A zero divisor behaves like 1.
pub fn base_fires(divisor: u32, phase: u32) -> bool {
    let divisor = u64::from(divisor.max(1));
    (u64::from(phase) + 1) % divisor == 0
}

/// Fire decision for a row, optionally combined with a second divisor.
///
/// With no operator only `divisor_a` matters.
pub fn combined_fires(
    operator: Option<LogicOperator>,
    divisor_a: u32,
    divisor_b: u32,
    phase: u32,
) -> bool {
    let a = base_fires(divisor_a, phase);
    match operator {
        None => a,
        Some(op) => op.combine(a, base_fires(divisor_b, phase)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_fires_on_last_phase() {
        assert!(!base_fires(4, 0));
        assert!(!base_fires(4, 2));
        assert!(base_fires(4, 3));
        assert!(base_fires(4, 7));
        assert!(base_fires(1, 0));
    }

    #[test]
    fn test_zero_divisor_acts_as_one() {
        assert!(base_fires(0, 0));
        assert!(base_fires(0, 41));
    }

    #[test]
    fn test_and_of_four_and_three() {
        // (11 + 1) is divisible by both 4 and 3
        assert!(combined_fires(Some(LogicOperator::And), 4, 3, 11));
        assert!(!combined_fires(Some(LogicOperator::And), 4, 3, 3));
        assert!(combined_fires(Some(LogicOperator::Or), 4, 3, 3));
        assert!(combined_fires(Some(LogicOperator::Xor), 4, 3, 2));
        assert!(!combined_fires(Some(LogicOperator::Xor), 4, 3, 11));
        assert!(combined_fires(Some(LogicOperator::Nor), 4, 3, 0));
    }

    #[test]
    fn test_no_operator_ignores_second_divisor() {
        for phase in 0..24 {
            assert_eq!(combined_fires(None, 4, 3, phase), base_fires(4, phase));
        }
    }
}

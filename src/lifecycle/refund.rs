use serde::Serialize;

use crate::lifecycle::policy::{CancellationCharge, FeeFraction};
use crate::types::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundBreakdown {
    pub fee: Money,
    pub refund: Money,
    /// Refund share of the total, rounded half-up to a whole percent.
    pub refund_percentage: u8,
}

pub struct RefundCalculator;

impl RefundCalculator {
    /// `total * fraction`, rounded half-up in minor units.
    pub fn fee_for(total: Money, fraction: FeeFraction) -> Money {
        let total = i128::from(total.minor().max(0));
        let bps = i128::from(fraction.basis_points());
        let fee = (total * bps + 5_000) / 10_000;
        Money::from_minor(fee as i64)
    }

    /// Splits `total` into fee and refund. The fee is clamped to `[0, total]`
    /// so `fee + refund == total` always holds.
    pub fn refund(total: Money, charge: CancellationCharge) -> RefundBreakdown {
        let total = total.max(Money::ZERO);
        let fee = match charge {
            CancellationCharge::Fraction(fraction) => Self::fee_for(total, fraction),
            CancellationCharge::Flat(amount) => amount,
        }
        .max(Money::ZERO)
        .min(total);
        let refund = total - fee;
        RefundBreakdown {
            fee,
            refund,
            refund_percentage: Self::percentage(refund, total),
        }
    }

    fn percentage(part: Money, total: Money) -> u8 {
        if total == Money::ZERO {
            return 100;
        }
        let part = i128::from(part.minor());
        let total = i128::from(total.minor());
        ((part * 200 + total) / (total * 2)).clamp(0, 100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg_next(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        *state
    }

    #[test]
    fn flight_thirty_hours_out() {
        let breakdown = RefundCalculator::refund(
            Money::from_major(5_390),
            CancellationCharge::Fraction(FeeFraction::percent(10)),
        );
        assert_eq!(breakdown.fee, Money::from_major(539));
        assert_eq!(breakdown.refund, Money::from_major(4_851));
        assert_eq!(breakdown.refund_percentage, 90);
    }

    #[test]
    fn hotel_half_fee() {
        let breakdown = RefundCalculator::refund(
            Money::from_major(9_520),
            CancellationCharge::Fraction(FeeFraction::percent(50)),
        );
        assert_eq!(breakdown.fee, Money::from_major(4_760));
        assert_eq!(breakdown.refund, Money::from_major(4_760));
        assert_eq!(breakdown.refund_percentage, 50);
    }

    #[test]
    fn full_fee_leaves_nothing() {
        let breakdown = RefundCalculator::refund(
            Money::from_major(2_500),
            CancellationCharge::Fraction(FeeFraction::FULL),
        );
        assert_eq!(breakdown.fee, Money::from_major(2_500));
        assert_eq!(breakdown.refund, Money::ZERO);
        assert_eq!(breakdown.refund_percentage, 0);
    }

    #[test]
    fn flat_fee_is_capped_at_total() {
        let breakdown = RefundCalculator::refund(
            Money::from_major(30),
            CancellationCharge::Flat(Money::from_major(50)),
        );
        assert_eq!(breakdown.fee, Money::from_major(30));
        assert_eq!(breakdown.refund, Money::ZERO);

        let breakdown = RefundCalculator::refund(
            Money::from_major(450),
            CancellationCharge::Flat(Money::from_major(50)),
        );
        assert_eq!(breakdown.refund, Money::from_major(400));
        assert_eq!(breakdown.refund_percentage, 89);
    }

    #[test]
    fn half_minor_unit_rounds_up() {
        // 10% of 0.05 is 0.005
        assert_eq!(
            RefundCalculator::fee_for(Money::from_minor(5), FeeFraction::percent(10)),
            Money::from_minor(1)
        );
        assert_eq!(
            RefundCalculator::fee_for(Money::from_minor(4), FeeFraction::percent(10)),
            Money::ZERO
        );
    }

    #[test]
    fn zero_total_refunds_everything() {
        let breakdown = RefundCalculator::refund(
            Money::ZERO,
            CancellationCharge::Flat(Money::from_major(50)),
        );
        assert_eq!(breakdown.fee, Money::ZERO);
        assert_eq!(breakdown.refund_percentage, 100);
    }

    #[test]
    fn fee_and_refund_always_sum_to_total() {
        let mut seed = 0xA11CE_u64;
        for _ in 0..20_000 {
            let total = Money::from_minor((lcg_next(&mut seed) % 50_000_000) as i64);
            let charge = if lcg_next(&mut seed) % 3 == 0 {
                CancellationCharge::Flat(Money::from_minor(
                    (lcg_next(&mut seed) % 100_000) as i64,
                ))
            } else {
                CancellationCharge::Fraction(FeeFraction::percent(
                    (lcg_next(&mut seed) % 101) as u16,
                ))
            };
            let breakdown = RefundCalculator::refund(total, charge);

            assert!(breakdown.fee >= Money::ZERO);
            assert!(breakdown.fee <= total);
            assert_eq!(breakdown.fee + breakdown.refund, total);
            assert!(breakdown.refund_percentage <= 100);
        }
    }
}

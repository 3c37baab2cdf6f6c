use chrono::{DateTime, Duration, Utc};

use crate::config::FoodConfig;
use crate::error::Error;
use crate::services::rules_for;
use crate::types::{Booking, BookingStatus, Money, ServiceType};

/// Fee share of the booking total in basis points (`0..=10_000`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeeFraction(u16);

impl FeeFraction {
    pub const ZERO: FeeFraction = FeeFraction(0);
    pub const FULL: FeeFraction = FeeFraction(10_000);

    /// Clamps to 100%.
    pub const fn percent(percent: u16) -> Self {
        let bps = percent.saturating_mul(100);
        if bps > 10_000 { Self::FULL } else { Self(bps) }
    }

    pub const fn basis_points(self) -> u16 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 10_000.0
    }
}

/// A tier applies when at least `at_least_hours` remain before service start.
/// `None` is the catch-all and must come last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeTier {
    pub at_least_hours: Option<i64>,
    pub fee: FeeFraction,
}

impl FeeTier {
    pub const fn from_hours(hours: i64, fee: FeeFraction) -> Self {
        Self {
            at_least_hours: Some(hours),
            fee,
        }
    }

    pub const fn otherwise(fee: FeeFraction) -> Self {
        Self {
            at_least_hours: None,
            fee,
        }
    }

    fn matches(&self, time_until_start: Duration) -> bool {
        match self.at_least_hours {
            Some(hours) => time_until_start >= Duration::hours(hours),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationRule {
    /// Fee depends on time remaining until service start; tiers are ordered
    /// from most lenient to most punitive.
    TimeTiered(&'static [FeeTier]),
    /// Fee depends on the order status and time since placement.
    OrderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationCharge {
    Fraction(FeeFraction),
    Flat(Money),
}

/// Picks the first tier whose threshold is met.
///
/// An exact threshold value belongs to the lenient side: with 24h remaining a
/// `>= 24h` tier applies. Negative durations fall through to the last tier.
pub fn tiered_fee_fraction(tiers: &[FeeTier], time_until_start: Duration) -> FeeFraction {
    tiers
        .iter()
        .find(|tier| tier.matches(time_until_start))
        .or_else(|| tiers.last())
        .map_or(FeeFraction::FULL, |tier| tier.fee)
}

#[derive(Debug, Clone)]
pub struct CancellationPolicy {
    food_fee: Money,
    food_free_window: Duration,
}

impl CancellationPolicy {
    pub fn new(food: &FoodConfig) -> Self {
        Self {
            food_fee: food.cancellation_fee,
            food_free_window: Duration::minutes(food.free_cancellation_minutes),
        }
    }

    /// Fee fraction for a time-tiered service; `None` when the service uses a
    /// status-based rule instead.
    pub fn fee_fraction(
        &self,
        service: ServiceType,
        time_until_start: Duration,
    ) -> Option<FeeFraction> {
        match rules_for(service).cancellation_rule() {
            CancellationRule::TimeTiered(tiers) => {
                Some(tiered_fee_fraction(tiers, time_until_start))
            }
            CancellationRule::OrderStatus => None,
        }
    }

    /// Charge for cancelling a food order in `status`, `since_placement` after
    /// it was placed.
    pub fn order_status_charge(
        &self,
        status: BookingStatus,
        since_placement: Duration,
    ) -> Result<CancellationCharge, Error> {
        match status {
            BookingStatus::Confirmed => Ok(CancellationCharge::Fraction(FeeFraction::ZERO)),
            BookingStatus::Preparing if since_placement > self.food_free_window => {
                Ok(CancellationCharge::Flat(self.food_fee))
            }
            BookingStatus::Preparing => Ok(CancellationCharge::Fraction(FeeFraction::ZERO)),
            BookingStatus::OutForDelivery => Err(Error::invalid_transition(
                status,
                "cancel",
                "order is already out for delivery",
            )),
            other => Err(Error::invalid_transition(
                other,
                "cancel",
                format!("food orders cannot be cancelled while {other}"),
            )),
        }
    }

    /// Charge for cancelling `booking` at `now`.
    pub fn assess(&self, booking: &Booking, now: DateTime<Utc>) -> Result<CancellationCharge, Error> {
        match rules_for(booking.service_type).cancellation_rule() {
            CancellationRule::TimeTiered(tiers) => Ok(CancellationCharge::Fraction(
                tiered_fee_fraction(tiers, booking.schedule - now),
            )),
            CancellationRule::OrderStatus => {
                self.order_status_charge(booking.status, now - booking.created_at)
            }
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn policy() -> CancellationPolicy {
        CancellationPolicy::new(&EngineConfig::default().food)
    }

    fn lcg_next(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        *state
    }

    fn fraction_at(service: ServiceType, minutes: i64) -> FeeFraction {
        policy()
            .fee_fraction(service, Duration::minutes(minutes))
            .unwrap()
    }

    #[test]
    fn flight_tiers() {
        let s = ServiceType::Flight;
        assert_eq!(fraction_at(s, 30 * 60), FeeFraction::percent(10));
        assert_eq!(fraction_at(s, 10 * 60), FeeFraction::percent(25));
        assert_eq!(fraction_at(s, 90), FeeFraction::FULL);
    }

    #[test]
    fn hotel_tiers() {
        let s = ServiceType::Hotel;
        assert_eq!(fraction_at(s, 72 * 60), FeeFraction::ZERO);
        assert_eq!(fraction_at(s, 30 * 60), FeeFraction::percent(25));
        assert_eq!(fraction_at(s, 10 * 60), FeeFraction::percent(50));
        assert_eq!(fraction_at(s, 30), FeeFraction::percent(50));
    }

    #[test]
    fn local_service_tiers() {
        let s = ServiceType::LocalService;
        assert_eq!(fraction_at(s, 25 * 60), FeeFraction::percent(10));
        assert_eq!(fraction_at(s, 5 * 60), FeeFraction::percent(50));
        assert_eq!(fraction_at(s, 90), FeeFraction::FULL);
    }

    #[test]
    fn exact_boundaries_land_in_the_lenient_tier() {
        assert_eq!(fraction_at(ServiceType::Flight, 24 * 60), FeeFraction::percent(10));
        assert_eq!(fraction_at(ServiceType::Flight, 24 * 60 - 1), FeeFraction::percent(25));
        assert_eq!(fraction_at(ServiceType::Flight, 2 * 60), FeeFraction::percent(25));
        assert_eq!(fraction_at(ServiceType::Hotel, 48 * 60), FeeFraction::ZERO);
        assert_eq!(fraction_at(ServiceType::Hotel, 24 * 60), FeeFraction::percent(25));
        assert_eq!(
            fraction_at(ServiceType::LocalService, 2 * 60),
            FeeFraction::percent(50)
        );
    }

    #[test]
    fn past_service_start_is_most_punitive() {
        assert_eq!(fraction_at(ServiceType::Flight, -30), FeeFraction::FULL);
        assert_eq!(fraction_at(ServiceType::Hotel, -24 * 60), FeeFraction::percent(50));
        assert_eq!(fraction_at(ServiceType::LocalService, -1), FeeFraction::FULL);
    }

    #[test]
    fn food_orders_have_no_time_tiers() {
        assert_eq!(
            policy().fee_fraction(ServiceType::FoodOrder, Duration::hours(1)),
            None
        );
    }

    #[test]
    fn fee_fraction_is_monotone_in_remaining_time() {
        let mut seed = 0x00C0_FFEE_u64;
        for service in [
            ServiceType::Flight,
            ServiceType::Hotel,
            ServiceType::LocalService,
        ] {
            for _ in 0..5_000 {
                let a = (lcg_next(&mut seed) % 20_000) as i64 - 2_000;
                let b = (lcg_next(&mut seed) % 20_000) as i64 - 2_000;
                let (earlier, later) = if a <= b { (a, b) } else { (b, a) };
                assert!(
                    fraction_at(service, later) <= fraction_at(service, earlier),
                    "{service}: fee at {later}min exceeds fee at {earlier}min"
                );
            }
        }
    }

    #[test]
    fn food_order_status_rule() {
        let p = policy();
        assert_eq!(
            p.order_status_charge(BookingStatus::Confirmed, Duration::minutes(2))
                .unwrap(),
            CancellationCharge::Fraction(FeeFraction::ZERO)
        );
        assert_eq!(
            p.order_status_charge(BookingStatus::Preparing, Duration::minutes(12))
                .unwrap(),
            CancellationCharge::Flat(Money::from_major(50))
        );
        assert_eq!(
            p.order_status_charge(BookingStatus::Preparing, Duration::minutes(10))
                .unwrap(),
            CancellationCharge::Fraction(FeeFraction::ZERO)
        );
        assert!(matches!(
            p.order_status_charge(BookingStatus::OutForDelivery, Duration::minutes(30)),
            Err(Error::InvalidTransition { .. })
        ));
        assert!(
            p.order_status_charge(BookingStatus::Delivered, Duration::minutes(60))
                .is_err()
        );
    }

    #[test]
    fn percent_clamps_to_full() {
        assert_eq!(FeeFraction::percent(250), FeeFraction::FULL);
        assert_eq!(FeeFraction::percent(25).basis_points(), 2_500);
        assert!((FeeFraction::percent(10).as_f64() - 0.1).abs() < f64::EPSILON);
    }
}

use crate::config::EngineConfig;
use crate::lifecycle::policy::{CancellationRule, FeeFraction, FeeTier};
use crate::lifecycle::{BookingAction, TransitionRule};
use crate::services::{HOTEL_ID_PREFIX, ServiceRules};
use crate::types::{Booking, BookingStatus, Money, ServiceDetails, ServiceType};

pub const CANCELLATION_TIERS: &[FeeTier] = &[
    FeeTier::from_hours(48, FeeFraction::ZERO),
    FeeTier::from_hours(24, FeeFraction::percent(25)),
    FeeTier::otherwise(FeeFraction::percent(50)),
];

const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule::advance(
        BookingStatus::Confirmed,
        BookingAction::Cancel,
        BookingStatus::Cancelled,
    ),
    TransitionRule::soft(
        BookingStatus::Confirmed,
        BookingAction::Modify,
        BookingStatus::Modified,
    ),
    TransitionRule::advance(
        BookingStatus::Confirmed,
        BookingAction::Complete,
        BookingStatus::Completed,
    ),
    TransitionRule::metadata(BookingStatus::Completed, BookingAction::Rate),
];

pub struct HotelRules;

impl ServiceRules for HotelRules {
    fn service_type(&self) -> ServiceType {
        ServiceType::Hotel
    }

    fn id_prefix(&self) -> &'static str {
        HOTEL_ID_PREFIX
    }

    fn transitions(&self) -> &'static [TransitionRule] {
        TRANSITIONS
    }

    fn cancellation_rule(&self) -> CancellationRule {
        CancellationRule::TimeTiered(CANCELLATION_TIERS)
    }

    fn change_fee(&self, config: &EngineConfig) -> Money {
        config.hotel.modification_fee
    }

    fn refund_time(&self) -> &'static str {
        "3-5 business days"
    }

    fn instructions(&self, booking: &Booking, config: &EngineConfig) -> Vec<String> {
        let ServiceDetails::Hotel(details) = &booking.details else {
            return Vec::new();
        };
        vec![
            format!(
                "{} room at {} for {} guest(s), {} night(s), checking in {}.",
                details.room_type,
                details.hotel_name,
                details.guests,
                details.nights,
                booking.schedule.format("%d %b %Y %H:%M UTC")
            ),
            "Carry a government photo ID for every adult guest at check-in.".to_string(),
            "Free cancellation up to 48 hours before check-in; 25% fee within 48 hours and 50% within 24 hours."
                .to_string(),
            format!(
                "Date or guest changes cost {} {}.",
                config.hotel.modification_fee, config.currency
            ),
        ]
    }
}

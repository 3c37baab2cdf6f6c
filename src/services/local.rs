use crate::config::EngineConfig;
use crate::lifecycle::policy::{CancellationRule, FeeFraction, FeeTier};
use crate::lifecycle::{BookingAction, TransitionRule};
use crate::services::{LOCAL_SERVICE_ID_PREFIX, ServiceRules};
use crate::types::{Booking, BookingStatus, Money, ServiceDetails, ServiceType};

pub const CANCELLATION_TIERS: &[FeeTier] = &[
    FeeTier::from_hours(24, FeeFraction::percent(10)),
    FeeTier::from_hours(2, FeeFraction::percent(50)),
    FeeTier::otherwise(FeeFraction::FULL),
];

const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule::advance(
        BookingStatus::Confirmed,
        BookingAction::Cancel,
        BookingStatus::Cancelled,
    ),
    TransitionRule::soft(
        BookingStatus::Confirmed,
        BookingAction::Reschedule,
        BookingStatus::Rescheduled,
    ),
    TransitionRule::advance(
        BookingStatus::Confirmed,
        BookingAction::Complete,
        BookingStatus::Completed,
    ),
    TransitionRule::metadata(BookingStatus::Completed, BookingAction::Rate),
];

pub struct LocalServiceRules;

impl ServiceRules for LocalServiceRules {
    fn service_type(&self) -> ServiceType {
        ServiceType::LocalService
    }

    fn id_prefix(&self) -> &'static str {
        LOCAL_SERVICE_ID_PREFIX
    }

    fn transitions(&self) -> &'static [TransitionRule] {
        TRANSITIONS
    }

    fn cancellation_rule(&self) -> CancellationRule {
        CancellationRule::TimeTiered(CANCELLATION_TIERS)
    }

    fn change_fee(&self, config: &EngineConfig) -> Money {
        config.local_service.reschedule_fee
    }

    fn refund_time(&self) -> &'static str {
        "3-5 business days"
    }

    fn instructions(&self, booking: &Booking, config: &EngineConfig) -> Vec<String> {
        let ServiceDetails::LocalService(details) = &booking.details else {
            return Vec::new();
        };
        vec![
            format!(
                "{} by {} at {} on {}.",
                details.service_name,
                details.provider,
                details.address,
                booking.schedule.format("%d %b %Y %H:%M UTC")
            ),
            "The provider will call you 30 minutes before the appointment.".to_string(),
            format!(
                "Rescheduling costs {} {}; cancelling within 2 hours of the appointment forfeits the full amount.",
                config.local_service.reschedule_fee, config.currency
            ),
        ]
    }
}

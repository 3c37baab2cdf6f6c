use chrono::{DateTime, Duration, Utc};

use crate::config::{EngineConfig, FlightConfig};
use crate::error::Error;
use crate::lifecycle::policy::{CancellationRule, FeeFraction, FeeTier};
use crate::lifecycle::{BookingAction, TransitionRule};
use crate::services::{FLIGHT_ID_PREFIX, ServiceRules};
use crate::types::{Booking, BookingStatus, Money, ServiceDetails, ServiceType};

pub const CANCELLATION_TIERS: &[FeeTier] = &[
    FeeTier::from_hours(24, FeeFraction::percent(10)),
    FeeTier::from_hours(2, FeeFraction::percent(25)),
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
        BookingAction::CheckIn,
        BookingStatus::CheckedIn,
    ),
    TransitionRule::metadata(BookingStatus::Confirmed, BookingAction::SelectSeat),
    TransitionRule::metadata(BookingStatus::CheckedIn, BookingAction::SelectSeat),
    TransitionRule::advance(
        BookingStatus::CheckedIn,
        BookingAction::Complete,
        BookingStatus::Completed,
    ),
    TransitionRule::metadata(BookingStatus::Completed, BookingAction::Rate),
];

const SEAT_LETTERS: &[u8] = b"ABCDEFGHJK";
const MAX_ROW: u32 = 60;

pub struct FlightRules;

impl ServiceRules for FlightRules {
    fn service_type(&self) -> ServiceType {
        ServiceType::Flight
    }

    fn id_prefix(&self) -> &'static str {
        FLIGHT_ID_PREFIX
    }

    fn transitions(&self) -> &'static [TransitionRule] {
        TRANSITIONS
    }

    fn cancellation_rule(&self) -> CancellationRule {
        CancellationRule::TimeTiered(CANCELLATION_TIERS)
    }

    fn change_fee(&self, config: &EngineConfig) -> Money {
        config.flight.reschedule_fee
    }

    fn refund_time(&self) -> &'static str {
        "5-7 business days"
    }

    fn instructions(&self, booking: &Booking, config: &EngineConfig) -> Vec<String> {
        let ServiceDetails::Flight(details) = &booking.details else {
            return Vec::new();
        };
        vec![
            format!(
                "Your PNR is {} for {} {} from {} to {}.",
                details.pnr,
                details.airline,
                details.flight_number,
                details.origin,
                details.destination
            ),
            format!(
                "Web check-in opens {} hours before departure and closes {} hour(s) before.",
                config.flight.check_in_opens_hours, config.flight.check_in_closes_hours
            ),
            "Arrive at the airport at least 2 hours before departure with a valid photo ID."
                .to_string(),
            format!(
                "Cancellations 24 hours or more before departure carry a 10% fee; refunds take {}.",
                self.refund_time()
            ),
        ]
    }
}

/// Check-in is open while departure is at most `check_in_opens_hours` and more
/// than `check_in_closes_hours` away.
pub fn check_in_window(
    config: &FlightConfig,
    departure: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    let remaining = departure - now;
    if remaining > Duration::hours(config.check_in_opens_hours) {
        return Err(Error::invalid_transition(
            BookingStatus::Confirmed,
            BookingAction::CheckIn.as_ref(),
            format!(
                "web check-in opens {} hours before departure",
                config.check_in_opens_hours
            ),
        ));
    }
    if remaining <= Duration::hours(config.check_in_closes_hours) {
        return Err(Error::invalid_transition(
            BookingStatus::Confirmed,
            BookingAction::CheckIn.as_ref(),
            format!(
                "web check-in closes {} hour(s) before departure",
                config.check_in_closes_hours
            ),
        ));
    }
    Ok(())
}

/// Accepts seats such as `7C` or `23K`.
pub fn validate_seat(seat: &str) -> Result<(), Error> {
    let invalid =
        || Error::validation(format!("invalid seat {seat:?}, expected row and letter like 12A"));
    if !seat.is_ascii() {
        return Err(invalid());
    }
    let (row, letter) = seat.split_at(seat.len().saturating_sub(1));
    let letter = letter.as_bytes().first().copied().ok_or_else(invalid)?;
    if !SEAT_LETTERS.contains(&letter) || row.is_empty() || row.len() > 2 {
        return Err(invalid());
    }
    let row: u32 = row.parse().map_err(|_| invalid())?;
    if row == 0 || row > MAX_ROW {
        return Err(invalid());
    }
    Ok(())
}

/// Deterministic seat for passengers who never picked one.
pub fn auto_assign_seat(booking_id: &str) -> String {
    let hash = booking_id
        .bytes()
        .fold(0_u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    let row = hash % 30 + 1;
    let letter = char::from(SEAT_LETTERS[(hash / 30) as usize % 6]);
    format!("{row}{letter}")
}

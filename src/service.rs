//! Booking facade: loads a record under its lock, asks the lifecycle engine
//! whether the requested action is legal, applies fees, and commits.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, IdGenerator, RandomIdGenerator, SystemClock};
use crate::collaborators::{
    BookingEvent, NoopNotifier, NoopPayments, Notifier, PaymentProcessor,
};
use crate::config::EngineConfig;
use crate::error::Error;
use crate::lifecycle::mapping::{decision_target, decision_to_display};
use crate::lifecycle::policy::CancellationPolicy;
use crate::lifecycle::progress::{OrderProgressTracker, ProgressStep, TrackingView};
use crate::lifecycle::refund::RefundCalculator;
use crate::lifecycle::{BookingAction, LifecycleEngine, TransitionDecision};
use crate::services::{flight, rules_for};
use crate::store::{BookingStore, InMemoryBookingStore};
use crate::types::{
    Booking, BookingStatus, Cancellation, ChangeKind, ChangeRecord, Money, Pricing, Rating,
    ServiceDetails, ServiceType,
};

const MAX_ID_ATTEMPTS: usize = 8;
const PNR_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub owner_id: String,
    /// Required except for food orders, whose delivery time is estimated.
    #[serde(default)]
    pub schedule: Option<DateTime<Utc>>,
    pub base: Money,
    #[serde(default)]
    pub taxes: Money,
    #[serde(default)]
    pub fees: Money,
    #[serde(default)]
    pub discount: Money,
    pub details: ServiceDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelModification {
    #[serde(default)]
    pub new_schedule: Option<DateTime<Utc>>,
    #[serde(default)]
    pub guests: Option<u32>,
    #[serde(default)]
    pub nights: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking: Booking,
    pub instructions: Vec<String>,
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationOutcome {
    pub booking: Booking,
    pub cancellation_fee: Money,
    pub refund_amount: Money,
    pub refund_percentage: u8,
    pub refund_time: String,
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOutcome {
    pub booking: Booking,
    pub change_fee: Money,
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardingPass {
    pub pnr: String,
    pub flight_number: String,
    pub seat: String,
    pub boarding_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInOutcome {
    pub booking: Booking,
    pub boarding_pass: BoardingPass,
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingOutcome {
    pub booking: Booking,
    pub loyalty_points: u32,
    pub notified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutcome {
    pub booking: Booking,
    pub notified: bool,
}

pub struct BookingService<S: BookingStore = InMemoryBookingStore> {
    store: S,
    config: EngineConfig,
    policy: CancellationPolicy,
    tracker: OrderProgressTracker,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    payments: Arc<dyn PaymentProcessor>,
    notifier: Arc<dyn Notifier>,
}

impl BookingService<InMemoryBookingStore> {
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(InMemoryBookingStore::new(), config)
    }
}

impl<S: BookingStore> BookingService<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            policy: CancellationPolicy::new(&config.food),
            tracker: OrderProgressTracker::new(&config.food),
            config,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIdGenerator),
            payments: Arc::new(NoopPayments::default()),
            notifier: Arc::new(NoopNotifier),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentProcessor>) -> Self {
        self.payments = payments;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn book(&self, request: BookingRequest) -> Result<BookingConfirmation, Error> {
        let now = self.clock.now();
        let service = request.details.service_type();
        let rules = rules_for(service);

        if request.owner_id.trim().is_empty() {
            return Err(Error::validation("ownerId is required"));
        }
        let pricing = Pricing::new(request.base, request.taxes, request.fees, request.discount)?;
        let mut details = request.details;
        validate_details(&mut details)?;

        let schedule = if service == ServiceType::FoodOrder {
            now + self.tracker.expected_duration()
        } else {
            let schedule = request
                .schedule
                .ok_or_else(|| Error::validation(format!("schedule is required for {service}")))?;
            if schedule <= now {
                return Err(Error::validation("schedule must be in the future"));
            }
            schedule
        };

        if let ServiceDetails::Flight(flight) = &mut details {
            flight.pnr = self.ids.next_code(PNR_LENGTH);
        }

        let mut booking = Booking {
            id: String::new(),
            service_type: service,
            owner_id: request.owner_id,
            schedule,
            created_at: now,
            pricing,
            status: BookingStatus::Confirmed,
            details,
            cancellation: None,
            rating: None,
            changes: Vec::new(),
            payment_reference: None,
            progress: (service == ServiceType::FoodOrder).then(|| self.tracker.start(now)),
        };

        booking.id = self.reserve_id(&booking)?;

        // The reserved record is only kept once the total is captured.
        let total = booking.pricing.total;
        let captured = self.store.update(&booking.id, |reserved| {
            reserved.payment_reference = self.charge(total, "booking")?;
            Ok(reserved.clone())
        });
        let booking = match captured {
            Ok(booking) => booking,
            Err(err) => {
                self.store.remove(&booking.id);
                tracing::debug!(booking_id = %booking.id, "reservation released");
                return Err(err);
            }
        };

        tracing::info!(
            booking_id = %booking.id,
            service = %service,
            owner_id = %booking.owner_id,
            total = %booking.pricing.total,
            "booking created"
        );
        let notified = self.notify(
            &booking.id,
            &BookingEvent::Booked {
                total: booking.pricing.total,
            },
        );
        let instructions = rules.instructions(&booking, &self.config);
        Ok(BookingConfirmation {
            booking,
            instructions,
            notified,
        })
    }

    /// Current record; food orders are advanced to `now` first.
    pub fn get(&self, id: &str) -> Result<Booking, Error> {
        let now = self.clock.now();
        let (booking, steps) = self.store.update(id, |booking| {
            let steps = self.tracker.advance(booking, now)?;
            Ok((booking.clone(), steps))
        })?;
        self.notify_steps(&booking.id, &steps);
        Ok(booking)
    }

    pub fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Booking>, Error> {
        self.store
            .list_by_owner(owner_id)
            .into_iter()
            .map(|booking| {
                if booking.progress.is_some() && !booking.status.is_terminal() {
                    self.get(&booking.id)
                } else {
                    Ok(booking)
                }
            })
            .collect()
    }

    pub fn cancel(&self, id: &str, reason: &str) -> Result<CancellationOutcome, Error> {
        let now = self.clock.now();
        let (booking, breakdown, steps) = self.store.update(id, |booking| {
            let steps = self.tracker.advance(booking, now)?;
            let decision =
                LifecycleEngine::decide(booking.service_type, booking.status, BookingAction::Cancel)?;
            let charge = self.policy.assess(booking, now)?;
            let breakdown = RefundCalculator::refund(booking.pricing.total, charge);
            apply_decision(booking, decision);
            booking.cancellation = Some(Cancellation {
                reason: if reason.trim().is_empty() {
                    "cancelled by customer".to_string()
                } else {
                    reason.trim().to_string()
                },
                timestamp: now,
                fee_charged: breakdown.fee,
                refund_amount: breakdown.refund,
            });
            Ok((booking.clone(), breakdown, steps))
        })?;
        self.notify_steps(&booking.id, &steps);

        tracing::info!(
            booking_id = %booking.id,
            service = %booking.service_type,
            fee = %breakdown.fee,
            refund = %breakdown.refund,
            "booking cancelled"
        );
        let notified = self.notify(
            &booking.id,
            &BookingEvent::Cancelled {
                fee: breakdown.fee,
                refund: breakdown.refund,
            },
        );
        Ok(CancellationOutcome {
            refund_time: rules_for(booking.service_type).refund_time().to_string(),
            booking,
            cancellation_fee: breakdown.fee,
            refund_amount: breakdown.refund,
            refund_percentage: breakdown.refund_percentage,
            notified,
        })
    }

    /// Moves a flight or local-service booking to `new_schedule`. A flight may
    /// also change fare; only an increase is charged.
    pub fn reschedule(
        &self,
        id: &str,
        new_schedule: DateTime<Utc>,
        new_fare: Option<Money>,
    ) -> Result<ChangeOutcome, Error> {
        let now = self.clock.now();
        let (booking, fee) = self.store.update(id, |booking| {
            let decision = LifecycleEngine::decide(
                booking.service_type,
                booking.status,
                BookingAction::Reschedule,
            )?;
            if new_schedule <= now {
                return Err(Error::validation("new schedule must be in the future"));
            }
            let mut fee = rules_for(booking.service_type).change_fee(&self.config);
            if let Some(fare) = new_fare {
                if booking.service_type != ServiceType::Flight {
                    return Err(Error::validation("fare changes only apply to flights"));
                }
                let difference = fare.saturating_sub(booking.pricing.base).max(Money::ZERO);
                if difference > Money::ZERO {
                    booking.pricing = booking.pricing.with_base(fare)?;
                }
                fee = fee
                    .checked_add(difference)
                    .ok_or_else(|| Error::validation("change fee overflows"))?;
            }
            if let Some(reference) = self.charge(fee, "reschedule")? {
                booking.payment_reference = Some(reference);
            }
            record_change(booking, decision, ChangeKind::Rescheduled, fee, new_schedule, now);
            Ok((booking.clone(), fee))
        })?;

        tracing::info!(
            booking_id = %booking.id,
            service = %booking.service_type,
            fee = %fee,
            schedule = %booking.schedule,
            "booking rescheduled"
        );
        let notified = self.notify(&booking.id, &BookingEvent::Rescheduled { fee });
        Ok(ChangeOutcome {
            booking,
            change_fee: fee,
            notified,
        })
    }

    /// Changes hotel dates and/or party size for a flat fee.
    pub fn modify(&self, id: &str, change: &HotelModification) -> Result<ChangeOutcome, Error> {
        let now = self.clock.now();
        if change.new_schedule.is_none() && change.guests.is_none() && change.nights.is_none() {
            return Err(Error::validation(
                "modification needs a new schedule, guest count or nights",
            ));
        }
        let (booking, fee) = self.store.update(id, |booking| {
            let decision =
                LifecycleEngine::decide(booking.service_type, booking.status, BookingAction::Modify)?;
            let ServiceDetails::Hotel(details) = &mut booking.details else {
                return Err(Error::validation("only hotel bookings can be modified"));
            };
            if let Some(guests) = change.guests {
                if guests == 0 {
                    return Err(Error::validation("guests must be at least 1"));
                }
                details.guests = guests;
            }
            if let Some(nights) = change.nights {
                if nights == 0 {
                    return Err(Error::validation("nights must be at least 1"));
                }
                details.nights = nights;
            }
            let new_schedule = change.new_schedule.unwrap_or(booking.schedule);
            if change.new_schedule.is_some() && new_schedule <= now {
                return Err(Error::validation("new check-in must be in the future"));
            }
            let fee = rules_for(booking.service_type).change_fee(&self.config);
            if let Some(reference) = self.charge(fee, "modification")? {
                booking.payment_reference = Some(reference);
            }
            record_change(booking, decision, ChangeKind::Modified, fee, new_schedule, now);
            Ok((booking.clone(), fee))
        })?;

        tracing::info!(booking_id = %booking.id, fee = %fee, "booking modified");
        let notified = self.notify(&booking.id, &BookingEvent::Modified { fee });
        Ok(ChangeOutcome {
            booking,
            change_fee: fee,
            notified,
        })
    }

    /// Flight web check-in; assigns a seat when none was selected.
    pub fn check_in(&self, id: &str) -> Result<CheckInOutcome, Error> {
        let now = self.clock.now();
        let (booking, boarding_pass) = self.store.update(id, |booking| {
            let decision = LifecycleEngine::decide(
                booking.service_type,
                booking.status,
                BookingAction::CheckIn,
            )?;
            flight::check_in_window(&self.config.flight, booking.schedule, now)?;
            let boarding_time =
                booking.schedule - Duration::minutes(self.config.flight.boarding_closes_minutes);
            let booking_id = booking.id.clone();
            let ServiceDetails::Flight(details) = &mut booking.details else {
                return Err(Error::validation("only flights support web check-in"));
            };
            let seat = details
                .seat
                .get_or_insert_with(|| flight::auto_assign_seat(&booking_id))
                .clone();
            let boarding_pass = BoardingPass {
                pnr: details.pnr.clone(),
                flight_number: details.flight_number.clone(),
                seat,
                boarding_time,
            };
            apply_decision(booking, decision);
            Ok((booking.clone(), boarding_pass))
        })?;

        tracing::info!(booking_id = %booking.id, seat = %boarding_pass.seat, "checked in");
        let notified = self.notify(
            &booking.id,
            &BookingEvent::CheckedIn {
                seat: boarding_pass.seat.clone(),
            },
        );
        Ok(CheckInOutcome {
            booking,
            boarding_pass,
            notified,
        })
    }

    pub fn select_seat(&self, id: &str, seat: &str) -> Result<Booking, Error> {
        let seat = seat.trim().to_ascii_uppercase();
        flight::validate_seat(&seat)?;
        let booking = self.store.update(id, |booking| {
            LifecycleEngine::decide(
                booking.service_type,
                booking.status,
                BookingAction::SelectSeat,
            )?;
            let ServiceDetails::Flight(details) = &mut booking.details else {
                return Err(Error::validation("only flights have seats"));
            };
            details.seat = Some(seat.clone());
            Ok(booking.clone())
        })?;
        tracing::info!(booking_id = %booking.id, seat = %seat, "seat selected");
        Ok(booking)
    }

    /// Marks the service as rendered (`completed`, or `delivered` for food).
    pub fn complete(&self, id: &str) -> Result<StatusOutcome, Error> {
        let now = self.clock.now();
        let (booking, from, steps) = self.store.update(id, |booking| {
            let steps = self.tracker.advance(booking, now)?;
            let from = booking.status;
            let decision = LifecycleEngine::decide(
                booking.service_type,
                booking.status,
                BookingAction::Complete,
            )?;
            apply_decision(booking, decision);
            if let Some(progress) = booking.progress.as_mut()
                && progress.delivered_at.is_none()
            {
                progress.delivered_at = Some(now);
            }
            Ok((booking.clone(), from, steps))
        })?;
        self.notify_steps(&booking.id, &steps);
        let notified = self.notify(
            &booking.id,
            &BookingEvent::StatusChanged {
                from,
                to: booking.status,
            },
        );
        Ok(StatusOutcome { booking, notified })
    }

    /// Food-order status with a synthetic timeline.
    pub fn track(&self, id: &str) -> Result<TrackingView, Error> {
        let now = self.clock.now();
        let (view, steps) = self.store.update(id, |booking| {
            if booking.service_type != ServiceType::FoodOrder {
                return Err(Error::validation(format!(
                    "{} is a {} booking; tracking is only available for food orders",
                    booking.id, booking.service_type
                )));
            }
            let steps = self.tracker.advance(booking, now)?;
            Ok((self.tracker.view(booking)?, steps))
        })?;
        self.notify_steps(&view.booking_id, &steps);
        Ok(view)
    }

    pub fn rate(&self, id: &str, rating: Rating) -> Result<RatingOutcome, Error> {
        rating.validate()?;
        let now = self.clock.now();
        let overall = rating.overall;
        let (booking, steps) = self.store.update(id, |booking| {
            let steps = self.tracker.advance(booking, now)?;
            LifecycleEngine::decide(booking.service_type, booking.status, BookingAction::Rate)?;
            if booking.rating.is_some() {
                return Err(Error::invalid_transition(
                    booking.status,
                    BookingAction::Rate.as_ref(),
                    "booking has already been rated",
                ));
            }
            booking.rating = Some(rating);
            Ok((booking.clone(), steps))
        })?;
        self.notify_steps(&booking.id, &steps);

        let loyalty_points = self.loyalty_points(booking.rating.as_ref());
        tracing::info!(
            booking_id = %booking.id,
            overall,
            loyalty_points,
            "booking rated"
        );
        let notified = self.notify(&booking.id, &BookingEvent::Rated { overall });
        Ok(RatingOutcome {
            booking,
            loyalty_points,
            notified,
        })
    }

    /// Inserts `booking` under a fresh id, retrying on collision.
    fn reserve_id(&self, booking: &Booking) -> Result<String, Error> {
        let prefix = rules_for(booking.service_type).id_prefix();
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id(prefix);
            let mut candidate = booking.clone();
            candidate.id.clone_from(&id);
            match self.store.insert(candidate) {
                Ok(()) => return Ok(id),
                Err(Error::Validation { .. }) => {
                    tracing::debug!(booking_id = %id, "booking id collision, retrying");
                }
                Err(other) => return Err(other),
            }
        }
        tracing::error!(service = %booking.service_type, "could not allocate a booking id");
        Err(Error::Upstream {
            service: "id generator".to_string(),
            reason: format!("no free {prefix} id after {MAX_ID_ATTEMPTS} attempts"),
        })
    }

    fn loyalty_points(&self, rating: Option<&Rating>) -> u32 {
        rating.map_or(0, |rating| {
            let bonus = if rating.feedback.trim().is_empty() {
                0
            } else {
                self.config.rating.feedback_bonus
            };
            u32::from(rating.overall) * self.config.rating.points_per_star + bonus
        })
    }

    /// Charges `amount` unless it is zero. Failures become `Upstream` so the
    /// surrounding update is not committed.
    fn charge(&self, amount: Money, purpose: &str) -> Result<Option<String>, Error> {
        if amount <= Money::ZERO {
            return Ok(None);
        }
        match self.payments.charge(amount, &self.config.currency) {
            Ok(receipt) => {
                tracing::debug!(reference = %receipt.reference, amount = %amount, purpose, "payment captured");
                Ok(Some(receipt.reference))
            }
            Err(err) => {
                tracing::error!(amount = %amount, purpose, error = %err, "payment failed");
                Err(Error::Upstream {
                    service: "payment".to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Notifications go out after commit; a failure is logged and reported
    /// back as `notified: false`.
    fn notify(&self, booking_id: &str, event: &BookingEvent) -> bool {
        match self.notifier.send(booking_id, event) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(booking_id, error = %err, "notification failed");
                false
            }
        }
    }

    fn notify_steps(&self, booking_id: &str, steps: &[ProgressStep]) {
        for step in steps {
            self.notify(
                booking_id,
                &BookingEvent::StatusChanged {
                    from: step.from,
                    to: step.to,
                },
            );
        }
    }
}

fn apply_decision(booking: &mut Booking, decision: TransitionDecision) {
    let from = booking.status;
    if let Some(to) = decision_target(&decision) {
        booking.status = to;
    }
    tracing::debug!(
        booking_id = %booking.id,
        from = %from,
        decision = %decision_to_display(&decision),
        "transition applied"
    );
}

fn record_change(
    booking: &mut Booking,
    decision: TransitionDecision,
    kind: ChangeKind,
    fee: Money,
    new_schedule: DateTime<Utc>,
    now: DateTime<Utc>,
) {
    booking.changes.push(ChangeRecord {
        kind,
        at: now,
        fee,
        previous_schedule: booking.schedule,
        new_schedule,
    });
    booking.schedule = new_schedule;
    apply_decision(booking, decision);
}

fn validate_details(details: &mut ServiceDetails) -> Result<(), Error> {
    fn required(value: &str, name: &str) -> Result<(), Error> {
        if value.trim().is_empty() {
            Err(Error::validation(format!("{name} is required")))
        } else {
            Ok(())
        }
    }

    match details {
        ServiceDetails::Flight(flight) => {
            required(&flight.airline, "airline")?;
            required(&flight.flight_number, "flightNumber")?;
            required(&flight.origin, "origin")?;
            required(&flight.destination, "destination")?;
            if flight.origin.eq_ignore_ascii_case(&flight.destination) {
                return Err(Error::validation("origin and destination must differ"));
            }
            if flight.passengers == 0 {
                return Err(Error::validation("passengers must be at least 1"));
            }
            if let Some(seat) = flight.seat.as_mut() {
                *seat = seat.trim().to_ascii_uppercase();
                flight::validate_seat(seat)?;
            }
        }
        ServiceDetails::Hotel(hotel) => {
            required(&hotel.hotel_name, "hotelName")?;
            required(&hotel.room_type, "roomType")?;
            if hotel.guests == 0 || hotel.nights == 0 {
                return Err(Error::validation("guests and nights must be at least 1"));
            }
        }
        ServiceDetails::FoodOrder(food) => {
            required(&food.restaurant, "restaurant")?;
            required(&food.delivery_address, "deliveryAddress")?;
            if food.items.is_empty() {
                return Err(Error::validation("a food order needs at least one item"));
            }
            if let Some(item) = food
                .items
                .iter()
                .find(|item| item.quantity == 0 || item.unit_price.is_negative())
            {
                return Err(Error::validation(format!(
                    "item {} needs a positive quantity and non-negative price",
                    item.name
                )));
            }
        }
        ServiceDetails::LocalService(local) => {
            required(&local.provider, "provider")?;
            required(&local.service_name, "serviceName")?;
            required(&local.address, "address")?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[expect(clippy::unwrap_used, clippy::panic, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SequentialIdGenerator};
    use crate::collaborators::{NotifyError, PaymentError, Receipt};
    use crate::types::{FlightDetails, FoodItem, FoodOrderDetails, HotelDetails, LocalServiceDetails};
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out the same id every time.
    struct FixedIds;

    impl IdGenerator for FixedIds {
        fn next_id(&self, prefix: &str) -> String {
            format!("{prefix}1")
        }

        fn next_code(&self, len: usize) -> String {
            "A".repeat(len)
        }
    }

    #[derive(Default)]
    struct CountingPayments {
        charges: AtomicUsize,
    }

    impl PaymentProcessor for CountingPayments {
        fn charge(&self, amount: Money, currency: &str) -> Result<Receipt, PaymentError> {
            let n = self.charges.fetch_add(1, Ordering::SeqCst);
            Ok(Receipt {
                reference: format!("pay-{n}"),
                amount,
                currency: currency.to_string(),
            })
        }
    }

    struct DecliningPayments;

    impl PaymentProcessor for DecliningPayments {
        fn charge(&self, _amount: Money, _currency: &str) -> Result<Receipt, PaymentError> {
            Err(PaymentError::Declined {
                reason: "insufficient funds".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<(String, BookingEvent)>>,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, booking_id: &str, event: &BookingEvent) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError {
                    reason: "smtp down".to_string(),
                });
            }
            self.events
                .lock()
                .push((booking_id.to_string(), event.clone()));
            Ok(())
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap()
    }

    fn service(clock: &Arc<ManualClock>) -> BookingService {
        BookingService::in_memory(EngineConfig::default())
            .with_clock(clock.clone())
            .with_id_generator(Arc::new(SequentialIdGenerator::default()))
    }

    fn flight_request(departure: DateTime<Utc>) -> BookingRequest {
        BookingRequest {
            owner_id: "traveller-7".to_string(),
            schedule: Some(departure),
            base: Money::from_major(4_500),
            taxes: Money::from_major(540),
            fees: Money::from_major(350),
            discount: Money::ZERO,
            details: ServiceDetails::Flight(FlightDetails {
                airline: "IndiGo".to_string(),
                flight_number: "6E-2134".to_string(),
                origin: "DEL".to_string(),
                destination: "GOI".to_string(),
                passengers: 1,
                seat: None,
                pnr: String::new(),
            }),
        }
    }

    fn food_request() -> BookingRequest {
        BookingRequest {
            owner_id: "traveller-7".to_string(),
            schedule: None,
            base: Money::from_major(400),
            taxes: Money::from_major(20),
            fees: Money::from_major(30),
            discount: Money::ZERO,
            details: ServiceDetails::FoodOrder(FoodOrderDetails {
                restaurant: "Ritz Classic".to_string(),
                items: vec![FoodItem {
                    name: "Fish thali".to_string(),
                    quantity: 1,
                    unit_price: Money::from_major(400),
                }],
                delivery_address: "Room 204".to_string(),
            }),
        }
    }

    fn hotel_request(check_in: DateTime<Utc>) -> BookingRequest {
        BookingRequest {
            owner_id: "traveller-7".to_string(),
            schedule: Some(check_in),
            base: Money::from_major(8_500),
            taxes: Money::from_major(820),
            fees: Money::from_major(200),
            discount: Money::ZERO,
            details: ServiceDetails::Hotel(HotelDetails {
                hotel_name: "Sea Breeze".to_string(),
                room_type: "Deluxe".to_string(),
                guests: 2,
                nights: 2,
            }),
        }
    }

    #[test]
    fn book_assigns_prefixed_id_and_pnr() {
        let clock = Arc::new(ManualClock::new(start()));
        let svc = service(&clock);
        let confirmation = svc.book(flight_request(start() + Duration::days(3))).unwrap();
        let booking = &confirmation.booking;
        assert!(booking.id.starts_with("FL"));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.pricing.total, Money::from_major(5_390));
        let ServiceDetails::Flight(details) = &booking.details else {
            panic!("expected flight details");
        };
        assert_eq!(details.pnr.len(), PNR_LENGTH);
        assert!(confirmation.instructions[0].contains(&details.pnr));
        assert!(booking.payment_reference.is_some());
    }

    #[test]
    fn book_rejects_past_schedule_and_mismatched_input() {
        let clock = Arc::new(ManualClock::new(start()));
        let svc = service(&clock);
        let err = svc.book(flight_request(start() - Duration::hours(1))).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let mut request = flight_request(start() + Duration::days(1));
        request.owner_id = "  ".to_string();
        assert!(matches!(svc.book(request), Err(Error::Validation { .. })));

        let mut request = flight_request(start() + Duration::days(1));
        request.discount = Money::from_major(10_000);
        assert!(matches!(svc.book(request), Err(Error::Validation { .. })));

        let mut request = hotel_request(start() + Duration::days(1));
        request.schedule = None;
        assert!(matches!(svc.book(request), Err(Error::Validation { .. })));
        assert!(svc.store().is_empty());
    }

    #[test]
    fn declined_booking_payment_stores_nothing() {
        let clock = Arc::new(ManualClock::new(start()));
        let svc = service(&clock).with_payments(Arc::new(DecliningPayments));
        let err = svc.book(hotel_request(start() + Duration::days(5))).unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));
        assert_eq!(err.status_code(), 500);
        assert!(svc.store().is_empty());
        assert!(svc.list_by_owner("traveller-7").unwrap().is_empty());
    }

    #[test]
    fn exhausted_id_space_charges_nothing() {
        let clock = Arc::new(ManualClock::new(start()));
        let payments = Arc::new(CountingPayments::default());
        let svc = service(&clock)
            .with_id_generator(Arc::new(FixedIds))
            .with_payments(payments.clone());
        let first = svc
            .book(hotel_request(start() + Duration::days(5)))
            .unwrap()
            .booking;
        assert_eq!(first.id, "HT1");
        assert_eq!(first.payment_reference.as_deref(), Some("pay-0"));

        let err = svc
            .book(hotel_request(start() + Duration::days(6)))
            .unwrap_err();
        assert!(
            matches!(&err, Error::Upstream { service, .. } if service == "id generator"),
            "{err}"
        );
        assert_eq!(payments.charges.load(Ordering::SeqCst), 1);
        assert_eq!(svc.store().len(), 1);
        assert_eq!(svc.get("HT1").unwrap(), first);
    }

    #[test]
    fn declined_reschedule_fee_leaves_booking_untouched() {
        let clock = Arc::new(ManualClock::new(start()));
        let svc = service(&clock);
        let booking = svc
            .book(flight_request(start() + Duration::days(3)))
            .unwrap()
            .booking;
        let svc = svc.with_payments(Arc::new(DecliningPayments));
        let err = svc
            .reschedule(&booking.id, start() + Duration::days(4), None)
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));
        assert_eq!(svc.get(&booking.id).unwrap(), booking);
    }

    #[test]
    fn flight_reschedule_charges_fee_plus_fare_increase() {
        let clock = Arc::new(ManualClock::new(start()));
        let svc = service(&clock);
        let booking = svc
            .book(flight_request(start() + Duration::days(3)))
            .unwrap()
            .booking;
        let new_departure = start() + Duration::days(6);
        let outcome = svc
            .reschedule(&booking.id, new_departure, Some(Money::from_major(5_000)))
            .unwrap();
        assert_eq!(outcome.change_fee, Money::from_major(3_500));
        assert_eq!(outcome.booking.status, BookingStatus::Confirmed);
        assert_eq!(outcome.booking.schedule, new_departure);
        assert_eq!(outcome.booking.pricing.base, Money::from_major(5_000));
        assert!(outcome.booking.pricing.is_consistent());
        assert_eq!(outcome.booking.changes.len(), 1);
        assert_eq!(outcome.booking.changes[0].kind, ChangeKind::Rescheduled);

        let cheaper = svc
            .reschedule(&booking.id, new_departure, Some(Money::from_major(3_000)))
            .unwrap();
        assert_eq!(cheaper.change_fee, Money::from_major(3_000));
        assert_eq!(cheaper.booking.pricing.base, Money::from_major(5_000));
    }

    #[test]
    fn hotel_cannot_be_rescheduled_but_can_be_modified() {
        let clock = Arc::new(ManualClock::new(start()));
        let svc = service(&clock);
        let booking = svc
            .book(hotel_request(start() + Duration::days(10)))
            .unwrap()
            .booking;
        assert!(matches!(
            svc.reschedule(&booking.id, start() + Duration::days(11), None),
            Err(Error::InvalidTransition { .. })
        ));
        let outcome = svc
            .modify(
                &booking.id,
                &HotelModification {
                    guests: Some(3),
                    ..HotelModification::default()
                },
            )
            .unwrap();
        assert_eq!(outcome.change_fee, Money::from_major(500));
        let ServiceDetails::Hotel(details) = &outcome.booking.details else {
            panic!("expected hotel details");
        };
        assert_eq!(details.guests, 3);
        assert_eq!(outcome.booking.schedule, booking.schedule);
        assert_eq!(outcome.booking.changes[0].kind, ChangeKind::Modified);
        assert!(matches!(
            svc.modify(&booking.id, &HotelModification::default()),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn check_in_respects_window_and_assigns_seat() {
        let clock = Arc::new(ManualClock::new(start()));
        let svc = service(&clock);
        let departure = start() + Duration::days(3);
        let booking = svc.book(flight_request(departure)).unwrap().booking;

        let err = svc.check_in(&booking.id).unwrap_err();
        assert!(err.to_string().contains("opens 48 hours"), "{err}");

        clock.set(departure - Duration::hours(5));
        let outcome = svc.check_in(&booking.id).unwrap();
        assert_eq!(outcome.booking.status, BookingStatus::CheckedIn);
        assert_eq!(
            outcome.boarding_pass.boarding_time,
            departure - Duration::minutes(45)
        );
        assert!(flight::validate_seat(&outcome.boarding_pass.seat).is_ok());

        assert!(matches!(
            svc.cancel(&booking.id, "plans changed"),
            Err(Error::InvalidTransition { .. })
        ));
        let completed = svc.complete(&booking.id).unwrap();
        assert_eq!(completed.booking.status, BookingStatus::Completed);
    }

    #[test]
    fn selected_seat_survives_check_in() {
        let clock = Arc::new(ManualClock::new(start()));
        let svc = service(&clock);
        let departure = start() + Duration::hours(20);
        let booking = svc.book(flight_request(departure)).unwrap().booking;
        svc.select_seat(&booking.id, " 14c ").unwrap();
        assert!(matches!(
            svc.select_seat(&booking.id, "99Z"),
            Err(Error::Validation { .. })
        ));
        let outcome = svc.check_in(&booking.id).unwrap();
        assert_eq!(outcome.boarding_pass.seat, "14C");
    }

    #[test]
    fn rating_requires_completion_and_happens_once() {
        let clock = Arc::new(ManualClock::new(start()));
        let svc = service(&clock);
        let booking = svc
            .book(BookingRequest {
                owner_id: "traveller-7".to_string(),
                schedule: Some(start() + Duration::hours(30)),
                base: Money::from_major(2_000),
                taxes: Money::from_major(360),
                fees: Money::from_major(140),
                discount: Money::ZERO,
                details: ServiceDetails::LocalService(LocalServiceDetails {
                    provider: "Goa Scuba".to_string(),
                    service_name: "Discover dive".to_string(),
                    address: "Baga".to_string(),
                }),
            })
            .unwrap()
            .booking;
        let rating = Rating {
            overall: 5,
            categories: std::collections::BTreeMap::new(),
            feedback: "Great instructor".to_string(),
        };
        assert!(matches!(
            svc.rate(&booking.id, rating.clone()),
            Err(Error::InvalidTransition { .. })
        ));
        svc.complete(&booking.id).unwrap();
        let outcome = svc.rate(&booking.id, rating.clone()).unwrap();
        assert_eq!(outcome.loyalty_points, 70);
        assert_eq!(outcome.booking.status, BookingStatus::Completed);
        assert!(matches!(
            svc.rate(&booking.id, rating),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn notifier_failure_is_reported_not_fatal() {
        let clock = Arc::new(ManualClock::new(start()));
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        });
        let svc = service(&clock).with_notifier(notifier);
        let confirmation = svc.book(hotel_request(start() + Duration::days(5))).unwrap();
        assert!(!confirmation.notified);
        let outcome = svc.cancel(&confirmation.booking.id, "").unwrap();
        assert!(!outcome.notified);
        assert_eq!(outcome.booking.status, BookingStatus::Cancelled);
        assert_eq!(
            outcome.booking.cancellation.unwrap().reason,
            "cancelled by customer"
        );
    }

    #[test]
    fn notifier_sees_each_transition() {
        let clock = Arc::new(ManualClock::new(start()));
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = service(&clock).with_notifier(notifier.clone());
        let booking = svc
            .book(hotel_request(start() + Duration::days(5)))
            .unwrap()
            .booking;
        svc.cancel(&booking.id, "weather").unwrap();
        let events = notifier.events.lock();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].1, BookingEvent::Booked { .. }));
        assert_eq!(
            events[1].1,
            BookingEvent::Cancelled {
                fee: Money::ZERO,
                refund: Money::from_major(9_520)
            }
        );
    }

    #[test]
    fn cancel_announces_kitchen_progress_first() {
        let clock = Arc::new(ManualClock::new(start()));
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = service(&clock).with_notifier(notifier.clone());
        let booking = svc.book(food_request()).unwrap().booking;

        clock.advance(Duration::minutes(12));
        let outcome = svc.cancel(&booking.id, "too slow").unwrap();
        assert_eq!(outcome.cancellation_fee, Money::from_major(50));

        let events: Vec<BookingEvent> = notifier
            .events
            .lock()
            .iter()
            .map(|(_, event)| event.clone())
            .collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], BookingEvent::Booked { .. }));
        assert_eq!(
            events[1],
            BookingEvent::StatusChanged {
                from: BookingStatus::Confirmed,
                to: BookingStatus::Preparing,
            }
        );
        assert_eq!(
            events[2],
            BookingEvent::Cancelled {
                fee: Money::from_major(50),
                refund: Money::from_major(400),
            }
        );
    }

    #[test]
    fn complete_and_rate_announce_catch_up_steps() {
        let clock = Arc::new(ManualClock::new(start()));
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = service(&clock).with_notifier(notifier.clone());
        let booking = svc.book(food_request()).unwrap().booking;

        clock.advance(Duration::minutes(25));
        let outcome = svc.complete(&booking.id).unwrap();
        assert_eq!(outcome.booking.status, BookingStatus::Delivered);

        let transitions: Vec<(BookingStatus, BookingStatus)> = notifier
            .events
            .lock()
            .iter()
            .filter_map(|(_, event)| match event {
                BookingEvent::StatusChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec![
                (BookingStatus::Confirmed, BookingStatus::Preparing),
                (BookingStatus::Preparing, BookingStatus::OutForDelivery),
                (BookingStatus::OutForDelivery, BookingStatus::Delivered),
            ]
        );

        let late = svc.book(food_request()).unwrap().booking;
        clock.advance(Duration::hours(1));
        notifier.events.lock().clear();
        svc.rate(
            &late.id,
            Rating {
                overall: 4,
                categories: std::collections::BTreeMap::new(),
                feedback: String::new(),
            },
        )
        .unwrap();
        let events = notifier.events.lock();
        assert_eq!(events.len(), 4, "{events:?}");
        assert!(matches!(
            events[2].1,
            BookingEvent::StatusChanged {
                to: BookingStatus::Delivered,
                ..
            }
        ));
        assert_eq!(events[3].1, BookingEvent::Rated { overall: 4 });
    }

    #[test]
    fn unknown_booking_is_not_found() {
        let clock = Arc::new(ManualClock::new(start()));
        let svc = service(&clock);
        assert!(matches!(svc.get("FL404"), Err(Error::NotFound { .. })));
        assert!(matches!(
            svc.cancel("FL404", "x"),
            Err(Error::NotFound { .. })
        ));
        assert!(svc.list_by_owner("nobody").unwrap().is_empty());
    }
}

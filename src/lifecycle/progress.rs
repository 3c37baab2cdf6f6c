//! Time-driven advancement of food orders.
//!
//! Progress is a pure function of the injected `now`: each query recomputes
//! where the kitchen and courier should be, applies every stage that has come
//! due since the last check, and records the timestamps so nothing is applied
//! twice. There are no timers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FoodConfig;
use crate::error::Error;
use crate::lifecycle::{BookingAction, LifecycleEngine};
use crate::types::{Booking, BookingStatus, ServiceType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProgress {
    pub placed_at: DateTime<Utc>,
    #[serde(default)]
    pub preparing_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dispatched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    pub preparation_remaining_minutes: i64,
    pub last_checked_at: DateTime<Utc>,
}

/// A status change applied by [`OrderProgressTracker::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStep {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub status: BookingStatus,
    pub at: DateTime<Utc>,
    pub reached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingView {
    pub booking_id: String,
    pub status: BookingStatus,
    pub timeline: Vec<TimelineEntry>,
    pub preparation_remaining_minutes: i64,
    pub estimated_delivery: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrderProgressTracker {
    confirm_delay: Duration,
    preparation: Duration,
    transit: Duration,
}

impl OrderProgressTracker {
    pub fn new(food: &FoodConfig) -> Self {
        Self {
            confirm_delay: Duration::minutes(food.confirm_delay_minutes),
            preparation: Duration::minutes(food.preparation_minutes),
            transit: Duration::minutes(food.transit_minutes),
        }
    }

    /// Placement to doorstep.
    pub fn expected_duration(&self) -> Duration {
        self.confirm_delay + self.preparation + self.transit
    }

    pub fn start(&self, placed_at: DateTime<Utc>) -> OrderProgress {
        OrderProgress {
            placed_at,
            preparing_at: None,
            dispatched_at: None,
            delivered_at: None,
            preparation_remaining_minutes: self.preparation.num_minutes(),
            last_checked_at: placed_at,
        }
    }

    /// Applies every stage due at `now`. Bookings without progress, terminal
    /// bookings and a `now` earlier than the last check are left untouched.
    pub fn advance(
        &self,
        booking: &mut Booking,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressStep>, Error> {
        let mut steps = Vec::new();
        let service = booking.service_type;
        let Some(progress) = booking.progress.as_mut() else {
            return Ok(steps);
        };
        if booking.status.is_terminal() || now < progress.last_checked_at {
            return Ok(steps);
        }
        progress.last_checked_at = now;

        if booking.status == BookingStatus::Confirmed && progress.preparing_at.is_none() {
            let due = progress.placed_at + self.confirm_delay;
            if now >= due {
                let step = apply(
                    &mut booking.status,
                    service,
                    BookingAction::StartPreparing,
                    due,
                )?;
                progress.preparing_at = Some(due);
                steps.push(step);
            }
        }

        if booking.status == BookingStatus::Preparing
            && let Some(started) = progress.preparing_at
        {
            let remaining = (self.preparation - (now - started))
                .num_minutes()
                .max(0);
            progress.preparation_remaining_minutes =
                progress.preparation_remaining_minutes.min(remaining);
            let due = started + self.preparation;
            if now >= due && progress.dispatched_at.is_none() {
                progress.preparation_remaining_minutes = 0;
                let step = apply(&mut booking.status, service, BookingAction::Dispatch, due)?;
                progress.dispatched_at = Some(due);
                steps.push(step);
            }
        }

        if booking.status == BookingStatus::OutForDelivery
            && let Some(dispatched) = progress.dispatched_at
            && progress.delivered_at.is_none()
        {
            let due = dispatched + self.transit;
            if now >= due {
                let step = apply(&mut booking.status, service, BookingAction::Complete, due)?;
                progress.delivered_at = Some(due);
                steps.push(step);
            }
        }

        for step in &steps {
            tracing::debug!(
                booking_id = %booking.id,
                from = %step.from,
                to = %step.to,
                "order progressed"
            );
        }
        Ok(steps)
    }

    /// Timeline with actual timestamps for reached stages and estimates for
    /// the rest.
    pub fn view(&self, booking: &Booking) -> Result<TrackingView, Error> {
        let progress = booking.progress.as_ref().ok_or_else(|| Error::Validation {
            reason: format!("booking {} has no order progress", booking.id),
        })?;

        let preparing = progress
            .preparing_at
            .unwrap_or(progress.placed_at + self.confirm_delay);
        let dispatched = progress
            .dispatched_at
            .unwrap_or(preparing + self.preparation);
        let delivered = progress.delivered_at.unwrap_or(dispatched + self.transit);

        let mut timeline = vec![
            TimelineEntry {
                status: BookingStatus::Confirmed,
                at: progress.placed_at,
                reached: true,
            },
            TimelineEntry {
                status: BookingStatus::Preparing,
                at: preparing,
                reached: progress.preparing_at.is_some(),
            },
            TimelineEntry {
                status: BookingStatus::OutForDelivery,
                at: dispatched,
                reached: progress.dispatched_at.is_some(),
            },
            TimelineEntry {
                status: BookingStatus::Delivered,
                at: delivered,
                reached: progress.delivered_at.is_some()
                    || booking.status == BookingStatus::Delivered,
            },
        ];

        if let Some(cancellation) = &booking.cancellation {
            timeline.retain(|entry| entry.reached);
            timeline.push(TimelineEntry {
                status: BookingStatus::Cancelled,
                at: cancellation.timestamp,
                reached: true,
            });
        }

        Ok(TrackingView {
            booking_id: booking.id.clone(),
            status: booking.status,
            timeline,
            preparation_remaining_minutes: progress.preparation_remaining_minutes,
            estimated_delivery: delivered,
        })
    }
}

fn apply(
    status: &mut BookingStatus,
    service: ServiceType,
    action: BookingAction,
    at: DateTime<Utc>,
) -> Result<ProgressStep, Error> {
    let from = *status;
    let to = LifecycleEngine::decide(service, from, action)?.resulting_status(from);
    *status = to;
    Ok(ProgressStep { from, to, at })
}

pub mod mapping;
pub mod policy;
pub mod progress;
pub mod refund;

use crate::error::Error;
use crate::services::rules_for;
use crate::types::{BookingStatus, ServiceType};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum BookingAction {
    Cancel,
    Reschedule,
    Modify,
    CheckIn,
    SelectSeat,
    StartPreparing,
    Dispatch,
    Complete,
    Rate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDecision {
    /// Status moves to `to`.
    Advance { to: BookingStatus },
    /// Passes through `via` and lands back on the current status.
    Soft { via: BookingStatus },
    /// Status untouched; only metadata changes.
    MetadataOnly,
}

impl TransitionDecision {
    /// Status the booking holds once the transition is applied.
    pub fn resulting_status(self, current: BookingStatus) -> BookingStatus {
        match self {
            Self::Advance { to } => to,
            Self::Soft { .. } | Self::MetadataOnly => current,
        }
    }
}

/// One legal `(from, action)` edge of a service's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: BookingStatus,
    pub action: BookingAction,
    pub decision: TransitionDecision,
}

impl TransitionRule {
    pub const fn advance(from: BookingStatus, action: BookingAction, to: BookingStatus) -> Self {
        Self {
            from,
            action,
            decision: TransitionDecision::Advance { to },
        }
    }

    pub const fn soft(from: BookingStatus, action: BookingAction, via: BookingStatus) -> Self {
        Self {
            from,
            action,
            decision: TransitionDecision::Soft { via },
        }
    }

    pub const fn metadata(from: BookingStatus, action: BookingAction) -> Self {
        Self {
            from,
            action,
            decision: TransitionDecision::MetadataOnly,
        }
    }
}

pub struct LifecycleEngine;

impl LifecycleEngine {
    /// Looks up `(current, action)` in the service's transition table.
    ///
    /// Anything not in the table is an `InvalidTransition`; the reason names the
    /// service-specific refusal when one exists (a food order that is already out
    /// for delivery), otherwise terminal state or the missing edge.
    pub fn decide(
        service: ServiceType,
        current: BookingStatus,
        action: BookingAction,
    ) -> Result<TransitionDecision, Error> {
        let rules = rules_for(service);
        if let Some(rule) = rules
            .transitions()
            .iter()
            .find(|rule| rule.from == current && rule.action == action)
        {
            return Ok(rule.decision);
        }

        let reason = if let Some(refusal) = rules.refusal(current, action) {
            refusal.to_string()
        } else if current.is_terminal() {
            format!("{current} is a terminal status")
        } else if rules.transitions().iter().any(|rule| rule.action == action) {
            format!("{action} is not allowed from {current} for {service} bookings")
        } else {
            format!("{service} bookings do not support {action}")
        };
        Err(Error::invalid_transition(current, action.as_ref(), reason))
    }

    pub fn is_allowed(service: ServiceType, current: BookingStatus, action: BookingAction) -> bool {
        Self::decide(service, current, action).is_ok()
    }
}

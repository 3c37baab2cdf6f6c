use crate::lifecycle::{BookingAction, TransitionDecision};
use crate::types::BookingStatus;

/// Canonical mapping from a client-facing action name to a [`BookingAction`].
///
/// `book`, `track` and `search` are not transitions and map to `None`.
pub fn action_from_api_name(name: &str) -> Option<BookingAction> {
    match name {
        "cancel" => Some(BookingAction::Cancel),
        "reschedule" => Some(BookingAction::Reschedule),
        "modify" => Some(BookingAction::Modify),
        "web-checkin" => Some(BookingAction::CheckIn),
        "seat-select" => Some(BookingAction::SelectSeat),
        "complete" => Some(BookingAction::Complete),
        "rate" => Some(BookingAction::Rate),
        _ => None,
    }
}

/// Human-readable display string for a decision.
pub fn decision_to_display(decision: &TransitionDecision) -> String {
    match decision {
        TransitionDecision::Advance { to } => format!("Advance({})", pascal_case(to.as_ref())),
        TransitionDecision::Soft { via } => format!("Soft({})", pascal_case(via.as_ref())),
        TransitionDecision::MetadataOnly => "MetadataOnly".to_string(),
    }
}

/// Returns the status a decision moves to, or `None` for status-preserving decisions.
pub fn decision_target(decision: &TransitionDecision) -> Option<BookingStatus> {
    match decision {
        TransitionDecision::Advance { to } => Some(*to),
        TransitionDecision::Soft { .. } | TransitionDecision::MetadataOnly => None,
    }
}

/// `out_for_delivery` -> `OutForDelivery`.
fn pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            format!(
                "{}{}",
                word.get(..1).unwrap_or_default().to_uppercase(),
                word.get(1..).unwrap_or_default()
            )
        })
        .collect()
}

use crate::config::EngineConfig;
use crate::lifecycle::policy::CancellationRule;
use crate::lifecycle::{BookingAction, TransitionRule};
use crate::services::{FOOD_ORDER_ID_PREFIX, ServiceRules};
use crate::types::{Booking, BookingStatus, ServiceDetails, ServiceType};

const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule::advance(
        BookingStatus::Confirmed,
        BookingAction::StartPreparing,
        BookingStatus::Preparing,
    ),
    TransitionRule::advance(
        BookingStatus::Preparing,
        BookingAction::Dispatch,
        BookingStatus::OutForDelivery,
    ),
    TransitionRule::advance(
        BookingStatus::OutForDelivery,
        BookingAction::Complete,
        BookingStatus::Delivered,
    ),
    TransitionRule::advance(
        BookingStatus::Confirmed,
        BookingAction::Cancel,
        BookingStatus::Cancelled,
    ),
    TransitionRule::advance(
        BookingStatus::Preparing,
        BookingAction::Cancel,
        BookingStatus::Cancelled,
    ),
    TransitionRule::metadata(BookingStatus::Delivered, BookingAction::Rate),
];

pub struct FoodOrderRules;

impl ServiceRules for FoodOrderRules {
    fn service_type(&self) -> ServiceType {
        ServiceType::FoodOrder
    }

    fn id_prefix(&self) -> &'static str {
        FOOD_ORDER_ID_PREFIX
    }

    fn transitions(&self) -> &'static [TransitionRule] {
        TRANSITIONS
    }

    fn refusal(&self, from: BookingStatus, action: BookingAction) -> Option<&'static str> {
        match (from, action) {
            (BookingStatus::OutForDelivery, BookingAction::Cancel) => {
                Some("order is already out for delivery")
            }
            _ => None,
        }
    }

    fn cancellation_rule(&self) -> CancellationRule {
        CancellationRule::OrderStatus
    }

    fn refund_time(&self) -> &'static str {
        "instant to original payment method"
    }

    fn instructions(&self, booking: &Booking, config: &EngineConfig) -> Vec<String> {
        let ServiceDetails::FoodOrder(details) = &booking.details else {
            return Vec::new();
        };
        let items: u32 = details.items.iter().map(|item| item.quantity).sum();
        vec![
            format!(
                "{} is confirming your order of {} item(s); expected at {} by {}.",
                details.restaurant,
                items,
                details.delivery_address,
                booking.schedule.format("%H:%M UTC")
            ),
            "Track the order to follow the kitchen and courier.".to_string(),
            format!(
                "Cancel free of charge within {} minutes; after that a {} {} fee applies while the food is being prepared. Orders out for delivery cannot be cancelled.",
                config.food.free_cancellation_minutes, config.food.cancellation_fee, config.currency
            ),
        ]
    }
}

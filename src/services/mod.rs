pub mod flight;
pub mod food;
pub mod hotel;
pub mod local;

use strum::IntoEnumIterator;

use crate::config::EngineConfig;
use crate::lifecycle::policy::CancellationRule;
use crate::lifecycle::{BookingAction, TransitionRule};
use crate::types::{Booking, BookingStatus, Money, ServiceType};

pub const FLIGHT_ID_PREFIX: &str = "FL";
pub const HOTEL_ID_PREFIX: &str = "HT";
pub const FOOD_ORDER_ID_PREFIX: &str = "FD";
pub const LOCAL_SERVICE_ID_PREFIX: &str = "SV";

/// Per-service parameters of the shared booking engine.
pub trait ServiceRules: Sync {
    fn service_type(&self) -> ServiceType;

    fn id_prefix(&self) -> &'static str;

    /// Every legal `(from, action)` edge.
    fn transitions(&self) -> &'static [TransitionRule];

    /// Explanation for an edge that is deliberately refused rather than
    /// simply absent.
    fn refusal(&self, _from: BookingStatus, _action: BookingAction) -> Option<&'static str> {
        None
    }

    fn cancellation_rule(&self) -> CancellationRule;

    /// Flat fee for a reschedule or modification.
    fn change_fee(&self, _config: &EngineConfig) -> Money {
        Money::ZERO
    }

    /// When the customer can expect refunded money.
    fn refund_time(&self) -> &'static str;

    /// Human-readable next steps shown after booking.
    fn instructions(&self, booking: &Booking, config: &EngineConfig) -> Vec<String>;
}

pub fn rules_for(service: ServiceType) -> &'static dyn ServiceRules {
    match service {
        ServiceType::Flight => &flight::FlightRules,
        ServiceType::Hotel => &hotel::HotelRules,
        ServiceType::FoodOrder => &food::FoodOrderRules,
        ServiceType::LocalService => &local::LocalServiceRules,
    }
}

/// Service type encoded in a booking id prefix.
pub fn service_for_id(id: &str) -> Option<ServiceType> {
    ServiceType::iter().find(|service| id.starts_with(rules_for(*service).id_prefix()))
}

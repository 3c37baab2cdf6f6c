#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::dbg_macro,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::panic,
    )
)]

pub mod api;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod service;
pub mod services;
pub mod store;
pub mod types;

pub use api::{ApiResponse, BookingApi, GetQuery, PostRequest};
pub use clock::{Clock, IdGenerator, ManualClock, RandomIdGenerator, SequentialIdGenerator, SystemClock};
pub use collaborators::{
    BookingEvent, Catalog, EmptyCatalog, NoopNotifier, NoopPayments, Notifier, NotifyError,
    PaymentError, PaymentProcessor, Receipt,
};
pub use config::EngineConfig;
pub use error::Error;
pub use lifecycle::mapping::{action_from_api_name, decision_target, decision_to_display};
pub use lifecycle::policy::{CancellationCharge, CancellationPolicy, FeeFraction};
pub use lifecycle::progress::{OrderProgressTracker, TrackingView};
pub use lifecycle::refund::{RefundBreakdown, RefundCalculator};
pub use lifecycle::{BookingAction, LifecycleEngine, TransitionDecision};
pub use service::{
    BoardingPass, BookingConfirmation, BookingRequest, BookingService, CancellationOutcome,
    ChangeOutcome, CheckInOutcome, HotelModification, RatingOutcome, StatusOutcome,
};
pub use store::{BookingStore, InMemoryBookingStore};
pub use types::{
    Booking, BookingStatus, Money, Pricing, Rating, ServiceDetails, ServiceType,
};

//! Availability and slot-selection engine for booking a fixed-length meeting
//! with a single host.
//!
//! The engine decides which dates and times are selectable in the viewer's
//! timezone, turns a chosen slot into a confirmed booking and supports
//! rescheduling it. Rendering is left to the embedding UI, which reads a
//! [`SchedulerView`] and forwards intents to a [`Session`].

pub mod availability;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod http_backend;
pub mod models;
pub mod session;
pub mod state;
pub mod view;

pub use availability::{AvailabilityProvider, BookingSubmitter, StaticBackend};
pub use clock::{Clock, FixedClock, LocalClock, SystemClock};
pub use config::SchedulerConfig;
pub use engine::{SlotFetch, SlotSelectionEngine, WeekDirection, WeekFetch};
pub use error::{ConfigError, FetchError, Notice, SelectionError, SubmitError};
pub use http_backend::HttpBackend;
pub use models::{
    BookingDraft, BookingReceipt, BookingRequest, ConfirmedBooking, GuestDetails, TimeSlot,
    WeekWindow, MEETING_DURATION_MINUTES,
};
pub use session::Session;
pub use state::{Phase, RequestToken, SchedulingState};
pub use view::{BookingSummary, DayCell, SchedulerView, SlotCell};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::models::TimeSlot;
use crate::state::Phase;

/// Why an intent was refused.
///
/// Every variant leaves the scheduling state exactly as it was. The
/// presentation layer is expected to disable the controls that would trigger
/// these, so in practice they only show up in logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("date {0} is in the past")]
    PastDate(NaiveDate),

    #[error("date {0} has no open slots")]
    DateUnavailable(NaiveDate),

    #[error("cannot navigate before the current week")]
    PastWeek,

    #[error("slot {0} is not offered for the selected date")]
    SlotUnavailable(TimeSlot),

    #[error("slot {0} has already started")]
    SlotInPast(TimeSlot),

    #[error("{intent} is not allowed while {phase}")]
    WrongPhase { intent: &'static str, phase: Phase },

    #[error("invalid guest details: {0}")]
    InvalidGuest(String),

    #[error("submission already in progress")]
    SubmissionInProgress,
}

/// Failure fetching slots or week availability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("availability request failed: {0}")]
    Transport(String),

    #[error("availability backend returned HTTP {0}")]
    Status(u16),

    #[error("malformed availability payload: {0}")]
    Payload(String),

    #[error("availability backend unavailable")]
    Unavailable,
}

/// Failure submitting a booking. The draft is kept so the visitor can retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("booking request failed: {0}")]
    Transport(String),

    #[error("booking backend returned HTTP {0}")]
    Status(u16),

    #[error("slot is no longer available")]
    Conflict,

    #[error("malformed booking response: {0}")]
    Payload(String),

    #[error("booking backend unavailable")]
    Unavailable,
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("invalid backend URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// User-facing notice left in the state after a recoverable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Notice {
    AvailabilityUnavailable(String),
    BookingFailed(String),
}

impl Notice {
    /// Short message suitable for a toast.
    pub fn message(&self) -> &'static str {
        match self {
            Notice::AvailabilityUnavailable(_) => "Failed to load available times",
            Notice::BookingFailed(_) => "Booking failed. Please try again",
        }
    }
}

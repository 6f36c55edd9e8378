use chrono::{NaiveDate, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::clock;

/// Every meeting with the host lasts this long.
pub const MEETING_DURATION_MINUTES: u32 = 30;

/// Slots offered by the demo backend on every open day.
pub const DEFAULT_SLOT_TIMES: [&str; 12] = [
    "11:30", "11:45", "12:00", "12:15", "12:30", "12:45", "13:00", "13:15", "13:30", "15:15",
    "15:30", "16:30",
];

// ── Time slots ──

/// Start time of a bookable interval, identified on the wire as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot {
    hour: u8,
    minute: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid slot time {0:?}, expected zero-padded 24-hour HH:MM")]
pub struct ParseSlotError(String);

impl TimeSlot {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour.into(), self.minute.into(), 0).unwrap_or(NaiveTime::MIN)
    }

    /// Wall-clock end of a meeting starting at this slot (wraps past midnight).
    pub fn ends_at(&self) -> NaiveTime {
        self.naive_time() + TimeDelta::minutes(MEETING_DURATION_MINUTES.into())
    }

    /// 12-hour label such as `1:00 PM`.
    pub fn label(&self) -> String {
        self.naive_time().format("%-I:%M %p").to_string()
    }
}

impl From<NaiveTime> for TimeSlot {
    fn from(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }
}

impl FromStr for TimeSlot {
    type Err = ParseSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 2 || b.is_ascii_digit());
        if !well_formed {
            return Err(ParseSlotError(s.to_string()));
        }
        let hour = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
        let minute = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
        TimeSlot::new(hour, minute).ok_or_else(|| ParseSlotError(s.to_string()))
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = ParseSlotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Parse the demo slot list.
pub fn default_slots() -> Vec<TimeSlot> {
    DEFAULT_SLOT_TIMES
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

// ── Week window ──

/// Seven consecutive days starting on a Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WeekWindow {
    start: NaiveDate,
}

impl WeekWindow {
    /// The week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            start: clock::start_of_week(date),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        clock::add_days(self.start, 6)
    }

    pub fn days(&self) -> [NaiveDate; 7] {
        std::array::from_fn(|i| clock::add_days(self.start, i as i64))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end()
    }

    pub fn shifted(&self, weeks: i64) -> Self {
        Self {
            start: clock::add_weeks(self.start, weeks),
        }
    }
}

// ── Booking ──

/// Contact details the visitor leaves with the booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl GuestDetails {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".into());
        }
        let valid_email = self
            .email
            .trim()
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !valid_email {
            return Err(format!("{:?} is not an email address", self.email));
        }
        Ok(())
    }
}

/// A tentative date + slot selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingDraft {
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub timezone: String,
    pub duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<GuestDetails>,
}

impl BookingDraft {
    pub fn new(date: NaiveDate, slot: TimeSlot, timezone: impl Into<String>) -> Self {
        Self {
            date,
            slot,
            timezone: timezone.into(),
            duration_minutes: MEETING_DURATION_MINUTES,
            guest: None,
        }
    }

    pub fn to_request(&self) -> BookingRequest {
        BookingRequest {
            date: self.date,
            time: self.slot,
            timezone: self.timezone.clone(),
            duration: self.duration_minutes,
            guest: self.guest.clone(),
        }
    }
}

/// A draft the backend accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedBooking {
    pub draft: BookingDraft,
    pub booking_id: Option<String>,
}

impl ConfirmedBooking {
    pub fn date(&self) -> NaiveDate {
        self.draft.date
    }

    pub fn slot(&self) -> TimeSlot {
        self.draft.slot
    }
}

// ── Wire types ──

/// `GET /api/slots?date=YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
}

/// `GET /api/slots/week?start=YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekAvailabilityResponse {
    pub start: NaiveDate,
    pub dates: Vec<NaiveDate>,
}

/// `POST /api/bookings` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub date: NaiveDate,
    pub time: TimeSlot,
    pub timezone: String,
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest: Option<GuestDetails>,
}

/// Acknowledgement of a booking. Backends that only echo the payload leave
/// `booking_id` empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingReceipt {
    #[serde(default)]
    pub booking_id: Option<String>,
}

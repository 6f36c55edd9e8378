//! Date and time arithmetic for the scheduler.
//!
//! All "today"/"now" questions go through [`LocalClock`], which pairs an
//! injectable [`Clock`] with the viewer's timezone. Week and day math lives in
//! the free functions below and nowhere else.

use chrono::{DateTime, LocalResult, NaiveDate, TimeDelta, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::models::TimeSlot;

/// Source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A clock seen from the viewer's timezone.
///
/// Nothing is cached: `today()` is recomputed from the source on every call.
#[derive(Debug, Clone)]
pub struct LocalClock {
    source: Arc<dyn Clock>,
    tz: Tz,
}

impl LocalClock {
    pub fn new(source: Arc<dyn Clock>, tz: Tz) -> Self {
        Self { source, tz }
    }

    pub fn system(tz: Tz) -> Self {
        Self::new(Arc::new(SystemClock), tz)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.source.now().with_timezone(&self.tz)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub fn slot_instant(&self, date: NaiveDate, slot: TimeSlot) -> DateTime<Tz> {
        to_slot_instant(date, slot, self.tz)
    }

    pub fn timezone_label(&self) -> String {
        format_timezone_label(self.tz, self.source.now())
    }
}

/// The Sunday on or before `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date.week(Weekday::Sun).first_day()
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + TimeDelta::days(days)
}

pub fn add_weeks(date: NaiveDate, weeks: i64) -> NaiveDate {
    add_days(date, weeks * 7)
}

/// Combine a calendar day and slot into an instant in `tz`.
///
/// Ambiguous wall times (DST fall-back) resolve to the earlier instant. Wall
/// times skipped by a DST jump resolve to the next representable half hour.
pub fn to_slot_instant(date: NaiveDate, slot: TimeSlot, tz: Tz) -> DateTime<Tz> {
    let local = date.and_time(slot.naive_time());
    match tz.from_local_datetime(&local) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => (1..=4)
            .find_map(|step| {
                tz.from_local_datetime(&(local + TimeDelta::minutes(30 * step)))
                    .earliest()
            })
            .unwrap_or_else(|| tz.from_utc_datetime(&local)),
    }
}

/// `"America/New York (14:05)"`. Display only.
pub fn format_timezone_label(tz: Tz, now: DateTime<Utc>) -> String {
    format!(
        "{} ({})",
        tz.name().replace('_', " "),
        now.with_timezone(&tz).format("%H:%M")
    )
}

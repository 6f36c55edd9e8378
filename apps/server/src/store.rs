use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use slotbook_core::clock::add_days;
use slotbook_core::{BookingRequest, TimeSlot};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::ServerConfig;

#[derive(Debug, Clone)]
pub struct BookingRecord {
    pub id: String,
    pub request: BookingRequest,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// Date closed, outside the horizon, or time not on the template.
    NotOffered,
    AlreadyBooked,
}

/// In-memory schedule: a daily slot template minus what has been booked.
pub struct AvailabilityStore {
    template: Vec<TimeSlot>,
    open_weekdays: HashSet<Weekday>,
    horizon_days: i64,
    timezone: Tz,
    bookings: DashMap<(NaiveDate, TimeSlot), BookingRecord>,
    next_id: AtomicU64,
}

impl AvailabilityStore {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            template: config.slot_times.clone(),
            open_weekdays: config.open_weekdays.clone(),
            horizon_days: config.horizon_days,
            timezone: config.timezone,
            bookings: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Current date in the schedule's timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    fn is_open(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let ahead = (date - today).num_days();
        (0..=self.horizon_days).contains(&ahead) && self.open_weekdays.contains(&date.weekday())
    }

    /// Free slots on `date`, in template order.
    pub fn slots_for(&self, date: NaiveDate, today: NaiveDate) -> Vec<TimeSlot> {
        if !self.is_open(date, today) {
            return Vec::new();
        }
        self.template
            .iter()
            .copied()
            .filter(|slot| !self.bookings.contains_key(&(date, *slot)))
            .collect()
    }

    /// Dates of the 7-day window from `start` with at least one free slot.
    pub fn dates_for_week(&self, start: NaiveDate, today: NaiveDate) -> Vec<NaiveDate> {
        (0..7)
            .map(|offset| add_days(start, offset))
            .filter(|date| !self.slots_for(*date, today).is_empty())
            .collect()
    }

    pub fn book(&self, request: BookingRequest, today: NaiveDate) -> Result<BookingRecord, BookError> {
        if !self.is_open(request.date, today) || !self.template.contains(&request.time) {
            return Err(BookError::NotOffered);
        }

        match self.bookings.entry((request.date, request.time)) {
            Entry::Occupied(_) => Err(BookError::AlreadyBooked),
            Entry::Vacant(vacant) => {
                let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
                let record = BookingRecord {
                    id: format!("bk_{seq:06}"),
                    request,
                    created_at: Utc::now(),
                };
                vacant.insert(record.clone());
                Ok(record)
            }
        }
    }

    pub fn bookings_held(&self) -> usize {
        self.bookings.len()
    }
}

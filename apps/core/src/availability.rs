use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{FetchError, SubmitError};
use crate::models::{default_slots, BookingReceipt, BookingRequest, TimeSlot, WeekWindow};

/// Read-only view of the host's open slots.
///
/// Calls may suspend; the engine never assumes they resolve in order.
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    /// Open slots for `date`, in the order they should be displayed.
    async fn slots_for_date(&self, date: NaiveDate) -> Result<Vec<TimeSlot>, FetchError>;

    /// Dates in `week` with at least one open slot.
    ///
    /// The default derives this from [`slots_for_date`](Self::slots_for_date)
    /// one day at a time; backends with a week endpoint override it.
    async fn available_dates_for_week(
        &self,
        week: WeekWindow,
    ) -> Result<BTreeSet<NaiveDate>, FetchError> {
        let mut dates = BTreeSet::new();
        for date in week.days() {
            if !self.slots_for_date(date).await?.is_empty() {
                dates.insert(date);
            }
        }
        Ok(dates)
    }
}

/// Hands a confirmed draft to whoever records bookings.
#[async_trait]
pub trait BookingSubmitter: Send + Sync {
    async fn submit(&self, request: &BookingRequest) -> Result<BookingReceipt, SubmitError>;
}

// ── Deterministic in-memory backend ──

/// Backend with a fixed daily slot list, used for tests and demo mode.
///
/// Booked slots disappear from later `slots_for_date` answers.
#[derive(Debug)]
pub struct StaticBackend {
    daily: Vec<TimeSlot>,
    inner: Mutex<StaticInner>,
    fail_fetches: AtomicBool,
    fail_submissions: AtomicBool,
    next_id: AtomicU64,
}

#[derive(Debug, Default)]
struct StaticInner {
    closed: HashSet<NaiveDate>,
    overrides: BTreeMap<NaiveDate, Vec<TimeSlot>>,
    booked: HashSet<(NaiveDate, TimeSlot)>,
    submitted: Vec<BookingRequest>,
}

impl StaticBackend {
    pub fn new(daily: Vec<TimeSlot>) -> Self {
        Self {
            daily,
            inner: Mutex::new(StaticInner::default()),
            fail_fetches: AtomicBool::new(false),
            fail_submissions: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    /// Every day offers [`DEFAULT_SLOT_TIMES`](crate::models::DEFAULT_SLOT_TIMES).
    pub fn with_default_slots() -> Self {
        Self::new(default_slots())
    }

    pub fn close_date(&self, date: NaiveDate) {
        self.lock().closed.insert(date);
    }

    /// Replace the slot list for one date, keeping the given order.
    pub fn set_slots(&self, date: NaiveDate, slots: Vec<TimeSlot>) {
        self.lock().overrides.insert(date, slots);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    /// Every accepted submission, oldest first.
    pub fn submitted(&self) -> Vec<BookingRequest> {
        self.lock().submitted.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StaticInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open_slots(&self, inner: &StaticInner, date: NaiveDate) -> Vec<TimeSlot> {
        if inner.closed.contains(&date) {
            return Vec::new();
        }
        inner
            .overrides
            .get(&date)
            .unwrap_or(&self.daily)
            .iter()
            .filter(|slot| !inner.booked.contains(&(date, **slot)))
            .copied()
            .collect()
    }
}

#[async_trait]
impl AvailabilityProvider for StaticBackend {
    async fn slots_for_date(&self, date: NaiveDate) -> Result<Vec<TimeSlot>, FetchError> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable);
        }
        let inner = self.lock();
        Ok(self.open_slots(&inner, date))
    }
}

#[async_trait]
impl BookingSubmitter for StaticBackend {
    async fn submit(&self, request: &BookingRequest) -> Result<BookingReceipt, SubmitError> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(SubmitError::Unavailable);
        }
        let mut inner = self.lock();
        if !self.open_slots(&inner, request.date).contains(&request.time) {
            return Err(SubmitError::Conflict);
        }
        inner.booked.insert((request.date, request.time));
        inner.submitted.push(request.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(BookingReceipt {
            booking_id: Some(format!("bk_{id:06}")),
        })
    }
}

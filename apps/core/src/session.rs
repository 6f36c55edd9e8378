use chrono::NaiveDate;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::availability::{AvailabilityProvider, BookingSubmitter};
use crate::clock::LocalClock;
use crate::config::SchedulerConfig;
use crate::engine::{SlotFetch, SlotSelectionEngine, WeekDirection, WeekFetch};
use crate::error::{ConfigError, SelectionError};
use crate::http_backend::HttpBackend;
use crate::models::{GuestDetails, TimeSlot};
use crate::state::SchedulingState;
use crate::view::SchedulerView;

/// Drives a [`SlotSelectionEngine`] against real providers.
///
/// Each intent is evaluated under the engine lock, and the lock is released
/// before any fetch or submission is awaited. A `Session` is cheap to clone so
/// the presentation layer can fire intents from independent tasks; late fetch
/// results are filtered by the engine's request tokens.
#[derive(Clone)]
pub struct Session {
    engine: Arc<Mutex<SlotSelectionEngine>>,
    availability: Arc<dyn AvailabilityProvider>,
    submitter: Arc<dyn BookingSubmitter>,
}

impl Session {
    pub fn new(
        clock: LocalClock,
        availability: Arc<dyn AvailabilityProvider>,
        submitter: Arc<dyn BookingSubmitter>,
    ) -> Self {
        Self {
            engine: Arc::new(Mutex::new(SlotSelectionEngine::new(clock))),
            availability,
            submitter,
        }
    }

    /// Use one backend for both availability and booking.
    pub fn with_backend<B>(clock: LocalClock, backend: Arc<B>) -> Self
    where
        B: AvailabilityProvider + BookingSubmitter + 'static,
    {
        Self::new(clock, backend.clone(), backend)
    }

    /// Wall clock in the configured timezone, talking to the configured server.
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, ConfigError> {
        let backend = Arc::new(HttpBackend::new(
            &config.backend_url,
            config.request_timeout,
        )?);
        tracing::info!(
            backend = %backend.base_url(),
            timezone = config.timezone.name(),
            host = %config.host_name,
            "scheduler session created"
        );
        let session = Self::with_backend(LocalClock::system(config.timezone), backend);
        session.set_host_name(config.host_name.clone());
        Ok(session)
    }

    pub fn set_host_name(&self, name: impl Into<String>) {
        self.lock().set_host_name(name);
    }

    fn lock(&self) -> MutexGuard<'_, SlotSelectionEngine> {
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn view(&self) -> SchedulerView {
        self.lock().view()
    }

    pub fn state(&self) -> SchedulingState {
        self.lock().state().clone()
    }

    /// Initial load. Same as [`refresh`](Self::refresh).
    pub async fn start(&self) {
        self.refresh().await;
    }

    /// Reload week availability and the selected date's slots.
    pub async fn refresh(&self) {
        let (week, slots) = self.lock().refresh();
        self.load_week(week).await;
        self.load_slots(slots).await;
    }

    pub async fn select_week(&self, direction: WeekDirection) -> Result<(), SelectionError> {
        let fetch = self.lock().select_week(direction)?;
        self.load_week(fetch).await;
        Ok(())
    }

    pub async fn select_date(&self, date: NaiveDate) -> Result<(), SelectionError> {
        let fetch = self.lock().select_date(date)?;
        self.load_slots(fetch).await;
        Ok(())
    }

    pub fn select_slot(&self, slot: TimeSlot) -> Result<(), SelectionError> {
        self.lock().select_slot(slot)
    }

    pub fn set_guest(&self, guest: GuestDetails) -> Result<(), SelectionError> {
        self.lock().set_guest(guest)
    }

    pub fn reset(&self) -> Result<(), SelectionError> {
        self.lock().reset()
    }

    /// Submit the draft. Submission failures end up in the state's notice,
    /// not in the returned error. Dropping the future before the submitter
    /// answers releases the engine with a failed-booking notice.
    pub async fn confirm(&self) -> Result<(), SelectionError> {
        let request = self.lock().begin_confirm()?;
        let mut pending = PendingSubmission {
            session: self,
            armed: true,
        };
        let result = self.submitter.submit(&request).await;
        pending.armed = false;
        self.lock().finish_confirm(result);
        Ok(())
    }

    pub async fn reschedule(&self) -> Result<(), SelectionError> {
        let fetch = self.lock().reschedule()?;
        self.load_slots(fetch).await;
        Ok(())
    }

    async fn load_week(&self, fetch: WeekFetch) {
        let result = self.availability.available_dates_for_week(fetch.week).await;
        self.lock().apply_week(fetch.token, result);
    }

    async fn load_slots(&self, fetch: SlotFetch) {
        let result = self.availability.slots_for_date(fetch.date).await;
        self.lock().apply_slots(fetch.token, result);
    }
}

/// Armed while a submission is awaited; firing means the confirm future was
/// dropped mid-flight.
struct PendingSubmission<'a> {
    session: &'a Session,
    armed: bool,
}

impl Drop for PendingSubmission<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.lock().abandon_confirm();
        }
    }
}

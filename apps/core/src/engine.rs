//! Slot selection rules and the transitions they drive.
//!
//! The engine never performs I/O. Intents that need data return a fetch
//! descriptor carrying a [`RequestToken`]; whoever runs the fetch hands the
//! result back through `apply_*`, and results whose token is no longer
//! current are dropped.

use chrono::NaiveDate;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::clock::{start_of_week, LocalClock};
use crate::config::DEFAULT_HOST_NAME;
use crate::error::{FetchError, Notice, SelectionError, SubmitError};
use crate::models::{
    BookingDraft, BookingReceipt, BookingRequest, ConfirmedBooking, GuestDetails, TimeSlot,
    WeekWindow,
};
use crate::state::{Phase, RequestToken, SchedulingState};
use crate::view::SchedulerView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekDirection {
    Prev,
    Next,
}

/// Load the dates with slots for `week`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekFetch {
    pub token: RequestToken,
    pub week: WeekWindow,
}

/// Load the slots for `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotFetch {
    pub token: RequestToken,
    pub date: NaiveDate,
}

#[derive(Debug)]
pub struct SlotSelectionEngine {
    clock: LocalClock,
    state: SchedulingState,
    host_name: String,
}

impl SlotSelectionEngine {
    /// Start on the current week with today selected. Call [`refresh`](Self::refresh)
    /// to get the initial fetches.
    pub fn new(clock: LocalClock) -> Self {
        let state = SchedulingState::new(clock.today());
        Self {
            clock,
            state,
            host_name: DEFAULT_HOST_NAME.to_string(),
        }
    }

    /// Display name of the person being booked.
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn set_host_name(&mut self, name: impl Into<String>) {
        self.host_name = name.into();
    }

    pub fn state(&self) -> &SchedulingState {
        &self.state
    }

    pub fn clock(&self) -> &LocalClock {
        &self.clock
    }

    pub fn view(&self) -> SchedulerView {
        SchedulerView::build(self)
    }

    // ── Eligibility ──

    pub fn is_date_disabled(&self, date: NaiveDate) -> bool {
        date < self.clock.today() || !self.state.available_dates.contains(&date)
    }

    /// Slots on today's date that have already started are disabled; slots on
    /// later dates never are.
    pub fn is_slot_disabled(&self, date: NaiveDate, slot: TimeSlot) -> bool {
        match date.cmp(&self.clock.today()) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.clock.slot_instant(date, slot) < self.clock.now(),
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.state.week.shifted(-1).start() >= start_of_week(self.clock.today())
    }

    // ── Intents ──

    /// Re-issue the week and slot fetches for the current view.
    pub fn refresh(&mut self) -> (WeekFetch, SlotFetch) {
        self.state.last_error = None;
        (self.issue_week_fetch(), self.issue_slot_fetch())
    }

    pub fn select_week(&mut self, direction: WeekDirection) -> Result<WeekFetch, SelectionError> {
        self.ensure_editable("select_week")?;

        let candidate = match direction {
            WeekDirection::Next => self.state.week.shifted(1),
            WeekDirection::Prev => self.state.week.shifted(-1),
        };
        if direction == WeekDirection::Prev
            && candidate.start() < start_of_week(self.clock.today())
        {
            return Err(self.reject(SelectionError::PastWeek));
        }

        self.cancel_pending_draft("week changed");
        self.state.week = candidate;
        self.state.available_dates.clear();
        Ok(self.issue_week_fetch())
    }

    pub fn select_date(&mut self, date: NaiveDate) -> Result<SlotFetch, SelectionError> {
        self.ensure_editable("select_date")?;

        if date < self.clock.today() {
            return Err(self.reject(SelectionError::PastDate(date)));
        }
        if !self.state.available_dates.contains(&date) {
            return Err(self.reject(SelectionError::DateUnavailable(date)));
        }

        self.cancel_pending_draft("date changed");
        self.state.selected_date = date;
        self.state.slots.clear();
        Ok(self.issue_slot_fetch())
    }

    pub fn select_slot(&mut self, slot: TimeSlot) -> Result<(), SelectionError> {
        self.ensure_editable("select_slot")?;

        let date = self.state.selected_date;
        if !self.state.slots.contains(&slot) {
            return Err(self.reject(SelectionError::SlotUnavailable(slot)));
        }
        if self.is_slot_disabled(date, slot) {
            return Err(self.reject(SelectionError::SlotInPast(slot)));
        }

        let guest = self.state.draft.take().and_then(|d| d.guest);
        let mut draft = BookingDraft::new(date, slot, self.clock.timezone().name());
        draft.guest = guest;
        self.state.draft = Some(draft);
        self.state.phase = Phase::Confirming;
        tracing::debug!(%date, %slot, "slot selected");
        Ok(())
    }

    pub fn set_guest(&mut self, guest: GuestDetails) -> Result<(), SelectionError> {
        self.ensure_phase("set_guest", Phase::Confirming)?;
        if let Err(reason) = guest.validate() {
            return Err(self.reject(SelectionError::InvalidGuest(reason)));
        }
        if let Some(draft) = self.state.draft.as_mut() {
            draft.guest = Some(guest);
        }
        Ok(())
    }

    /// Back out of `Confirming` without submitting.
    pub fn reset(&mut self) -> Result<(), SelectionError> {
        self.ensure_phase("reset", Phase::Confirming)?;
        self.state.clear_draft();
        Ok(())
    }

    /// Mark the draft as in flight and hand back the payload to submit.
    pub fn begin_confirm(&mut self) -> Result<BookingRequest, SelectionError> {
        self.ensure_phase("confirm", Phase::Confirming)?;
        let request = match self.state.draft.as_ref() {
            Some(draft) => draft.to_request(),
            None => {
                return Err(self.reject(SelectionError::WrongPhase {
                    intent: "confirm",
                    phase: self.state.phase,
                }))
            }
        };
        self.state.submitting = true;
        self.state.last_error = None;
        Ok(request)
    }

    pub fn finish_confirm(&mut self, result: Result<BookingReceipt, SubmitError>) {
        if !self.state.submitting {
            tracing::debug!("ignoring submission result with no submission in flight");
            return;
        }
        self.state.submitting = false;

        match result {
            Ok(receipt) => {
                let Some(draft) = self.state.draft.take() else {
                    return;
                };
                tracing::info!(
                    date = %draft.date,
                    slot = %draft.slot,
                    booking_id = receipt.booking_id.as_deref().unwrap_or("-"),
                    "booking confirmed"
                );
                self.state.confirmed = Some(ConfirmedBooking {
                    draft,
                    booking_id: receipt.booking_id,
                });
                self.state.previous = None;
                self.state.phase = Phase::Confirmed;
            }
            Err(e) => {
                tracing::warn!("booking submission failed: {}", e);
                self.state.last_error = Some(Notice::BookingFailed(e.to_string()));
            }
        }
    }

    /// Release an in-flight submission whose result will never arrive. The
    /// draft stays so the user can retry.
    pub fn abandon_confirm(&mut self) {
        if !self.state.submitting {
            return;
        }
        tracing::warn!("booking submission abandoned before it completed");
        self.state.submitting = false;
        self.state.last_error = Some(Notice::BookingFailed(
            SubmitError::Transport("submission abandoned".into()).to_string(),
        ));
    }

    /// Reopen selection from the confirmed booking's date and week.
    pub fn reschedule(&mut self) -> Result<SlotFetch, SelectionError> {
        self.ensure_phase("reschedule", Phase::Confirmed)?;
        self.state.previous = self.state.confirmed.take();
        self.state.clear_draft();
        self.state.slots.clear();
        Ok(self.issue_slot_fetch())
    }

    // ── Fetch results ──

    /// Returns whether the result was applied.
    pub fn apply_week(
        &mut self,
        token: RequestToken,
        result: Result<BTreeSet<NaiveDate>, FetchError>,
    ) -> bool {
        if self.state.week_request != Some(token) {
            tracing::debug!(?token, "discarding stale week availability");
            return false;
        }
        self.state.week_request = None;

        let week = self.state.week;
        match result {
            Ok(dates) => {
                self.state.available_dates = dates.into_iter().filter(|d| week.contains(*d)).collect();
            }
            Err(e) => {
                tracing::warn!(week_start = %week.start(), "week availability fetch failed: {}", e);
                self.state.available_dates.clear();
                self.state.last_error = Some(Notice::AvailabilityUnavailable(e.to_string()));
            }
        }
        true
    }

    /// Returns whether the result was applied. Never touches the draft.
    pub fn apply_slots(
        &mut self,
        token: RequestToken,
        result: Result<Vec<TimeSlot>, FetchError>,
    ) -> bool {
        if self.state.slots_request != Some(token) {
            tracing::debug!(?token, "discarding stale slot list");
            return false;
        }
        self.state.slots_request = None;

        match result {
            Ok(slots) => self.state.slots = slots,
            Err(e) => {
                tracing::warn!(date = %self.state.selected_date, "slot fetch failed: {}", e);
                self.state.slots.clear();
                self.state.last_error = Some(Notice::AvailabilityUnavailable(e.to_string()));
            }
        }
        true
    }

    // ── Helpers ──

    fn issue_week_fetch(&mut self) -> WeekFetch {
        let token = self.state.issue_token();
        self.state.week_request = Some(token);
        WeekFetch {
            token,
            week: self.state.week,
        }
    }

    fn issue_slot_fetch(&mut self) -> SlotFetch {
        let token = self.state.issue_token();
        self.state.slots_request = Some(token);
        SlotFetch {
            token,
            date: self.state.selected_date,
        }
    }

    /// Selection intents are refused mid-submission and once confirmed.
    fn ensure_editable(&self, intent: &'static str) -> Result<(), SelectionError> {
        if self.state.submitting {
            return Err(self.reject(SelectionError::SubmissionInProgress));
        }
        if self.state.phase == Phase::Confirmed {
            return Err(self.reject(SelectionError::WrongPhase {
                intent,
                phase: self.state.phase,
            }));
        }
        Ok(())
    }

    fn ensure_phase(&self, intent: &'static str, phase: Phase) -> Result<(), SelectionError> {
        if self.state.submitting {
            return Err(self.reject(SelectionError::SubmissionInProgress));
        }
        if self.state.phase != phase {
            return Err(self.reject(SelectionError::WrongPhase {
                intent,
                phase: self.state.phase,
            }));
        }
        Ok(())
    }

    fn cancel_pending_draft(&mut self, reason: &str) {
        if self.state.phase == Phase::Confirming {
            tracing::debug!("cancelling pending draft: {}", reason);
            self.state.clear_draft();
        }
    }

    fn reject(&self, err: SelectionError) -> SelectionError {
        tracing::debug!("intent rejected: {}", err);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use chrono_tz::Tz;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 3, h, m, 0).unwrap()
    }

    /// Engine pinned to Tuesday 2025-06-03 at `now` UTC.
    fn engine_at(now: DateTime<Utc>) -> (SlotSelectionEngine, Arc<FixedClock>) {
        let source = Arc::new(FixedClock::new(now));
        let engine = SlotSelectionEngine::new(LocalClock::new(source.clone(), Tz::UTC));
        (engine, source)
    }

    fn engine() -> SlotSelectionEngine {
        engine_at(at(12, 10)).0
    }

    /// Load the whole week as available and the default slots for the selected date.
    fn loaded(mut engine: SlotSelectionEngine) -> SlotSelectionEngine {
        let (week, slots) = engine.refresh();
        engine.apply_week(week.token, Ok(week.week.days().into_iter().collect()));
        engine.apply_slots(slots.token, Ok(vec![slot("11:30"), slot("13:00"), slot("15:30")]));
        engine
    }

    fn pick(engine: &mut SlotSelectionEngine, d: NaiveDate, s: &str) {
        let fetch = engine.select_date(d).unwrap();
        engine.apply_slots(fetch.token, Ok(vec![slot("11:30"), slot("13:00"), slot(s)]));
        engine.select_slot(slot(s)).unwrap();
    }

    fn confirmed(engine: &mut SlotSelectionEngine) {
        engine.begin_confirm().unwrap();
        engine.finish_confirm(Ok(BookingReceipt {
            booking_id: Some("bk_1".into()),
        }));
    }

    // ── select_week ──

    #[test]
    fn test_prev_from_current_week_rejected() {
        let mut engine = loaded(engine());
        let before = engine.state().week();
        assert_eq!(engine.select_week(WeekDirection::Prev), Err(SelectionError::PastWeek));
        assert_eq!(engine.state().week(), before);
        assert!(!engine.can_go_back());
    }

    #[test]
    fn test_next_then_prev_allowed() {
        let mut engine = loaded(engine());
        engine.select_week(WeekDirection::Next).unwrap();
        assert_eq!(engine.state().week().start(), date(2025, 6, 8));
        assert!(engine.can_go_back());
        engine.select_week(WeekDirection::Prev).unwrap();
        assert_eq!(engine.state().week().start(), date(2025, 6, 1));
    }

    #[test]
    fn test_week_change_keeps_selected_date() {
        let mut engine = loaded(engine());
        let fetch = engine.select_week(WeekDirection::Next).unwrap();
        assert_eq!(engine.state().selected_date(), date(2025, 6, 3));
        assert!(engine.state().available_dates().is_empty());
        assert_eq!(fetch.week.start(), date(2025, 6, 8));
        assert!(engine.state().is_loading_week());
    }

    #[test]
    fn test_week_change_cancels_draft() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        assert_eq!(engine.state().phase(), Phase::Confirming);
        engine.select_week(WeekDirection::Next).unwrap();
        assert_eq!(engine.state().phase(), Phase::Selecting);
        assert!(engine.state().draft().is_none());
    }

    // ── select_date ──

    #[test]
    fn test_past_date_rejected() {
        let mut engine = loaded(engine());
        let err = engine.select_date(date(2025, 6, 2)).unwrap_err();
        assert_eq!(err, SelectionError::PastDate(date(2025, 6, 2)));
        assert_eq!(engine.state().selected_date(), date(2025, 6, 3));
    }

    #[test]
    fn test_unavailable_date_rejected() {
        let mut engine = engine();
        let (week, _) = engine.refresh();
        engine.apply_week(week.token, Ok(BTreeSet::from([date(2025, 6, 4)])));
        assert_eq!(
            engine.select_date(date(2025, 6, 5)),
            Err(SelectionError::DateUnavailable(date(2025, 6, 5)))
        );
        assert!(engine.select_date(date(2025, 6, 4)).is_ok());
    }

    #[test]
    fn test_select_date_clears_slot() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        engine.select_date(date(2025, 6, 6)).unwrap();
        assert_eq!(engine.state().selected_slot(), None);
        assert_eq!(engine.state().phase(), Phase::Selecting);
        assert!(engine.state().slots().is_empty());
        assert!(engine.state().is_loading_slots());
    }

    #[test]
    fn test_date_disabled_rules() {
        let engine = loaded(engine());
        assert!(engine.is_date_disabled(date(2025, 6, 2)));
        assert!(!engine.is_date_disabled(date(2025, 6, 3)));
        assert!(engine.is_date_disabled(date(2025, 6, 9)));
    }

    // ── select_slot ──

    #[test]
    fn test_select_slot_forms_draft() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "13:00");
        let draft = engine.state().draft().unwrap();
        assert_eq!(draft.date, date(2025, 6, 5));
        assert_eq!(draft.slot, slot("13:00"));
        assert_eq!(draft.duration_minutes, 30);
        assert_eq!(draft.timezone, "UTC");
    }

    #[test]
    fn test_unknown_slot_rejected() {
        let mut engine = loaded(engine());
        assert_eq!(
            engine.select_slot(slot("09:00")),
            Err(SelectionError::SlotUnavailable(slot("09:00")))
        );
        assert_eq!(engine.state().phase(), Phase::Selecting);
    }

    #[test]
    fn test_started_slot_today_rejected() {
        // now = 12:10 on the selected date (today)
        let mut engine = loaded(engine());
        assert_eq!(
            engine.select_slot(slot("11:30")),
            Err(SelectionError::SlotInPast(slot("11:30")))
        );
        assert!(engine.select_slot(slot("13:00")).is_ok());
    }

    #[test]
    fn test_slot_at_exactly_now_is_selectable() {
        let (engine, _) = engine_at(at(13, 0));
        let engine = loaded(engine);
        assert!(!engine.is_slot_disabled(date(2025, 6, 3), slot("13:00")));
    }

    #[test]
    fn test_future_date_slots_never_time_disabled() {
        let (engine, _) = engine_at(at(23, 59));
        assert!(!engine.is_slot_disabled(date(2025, 6, 4), slot("00:00")));
    }

    #[test]
    fn test_slot_disabled_as_clock_advances() {
        let (engine, source) = engine_at(at(12, 10));
        assert!(!engine.is_slot_disabled(date(2025, 6, 3), slot("13:00")));
        source.advance(TimeDelta::minutes(51));
        assert!(engine.is_slot_disabled(date(2025, 6, 3), slot("13:00")));
    }

    #[test]
    fn test_reselect_slot_replaces_draft_and_keeps_guest() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        engine
            .set_guest(GuestDetails {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                phone: None,
            })
            .unwrap();
        engine.select_slot(slot("13:00")).unwrap();
        let draft = engine.state().draft().unwrap();
        assert_eq!(draft.slot, slot("13:00"));
        assert_eq!(draft.guest.as_ref().map(|g| g.name.as_str()), Some("Ada"));
    }

    // ── guest / reset ──

    #[test]
    fn test_set_guest_requires_confirming() {
        let mut engine = loaded(engine());
        let guest = GuestDetails {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: None,
        };
        assert!(matches!(
            engine.set_guest(guest),
            Err(SelectionError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_set_guest_validates() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        let guest = GuestDetails {
            name: "Ada".into(),
            email: "nope".into(),
            phone: None,
        };
        assert!(matches!(engine.set_guest(guest), Err(SelectionError::InvalidGuest(_))));
        assert!(engine.state().draft().unwrap().guest.is_none());
    }

    #[test]
    fn test_reset_returns_to_selecting() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        engine.reset().unwrap();
        assert_eq!(engine.state().phase(), Phase::Selecting);
        assert_eq!(engine.state().selected_date(), date(2025, 6, 5));
        assert_eq!(engine.state().selected_slot(), None);
    }

    // ── confirm ──

    #[test]
    fn test_confirm_requires_confirming() {
        let mut engine = loaded(engine());
        assert!(matches!(
            engine.begin_confirm(),
            Err(SelectionError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_confirm_success() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        let request = engine.begin_confirm().unwrap();
        assert_eq!(request.date, date(2025, 6, 5));
        assert_eq!(request.duration, 30);
        assert!(engine.state().is_submitting());
        engine.finish_confirm(Ok(BookingReceipt {
            booking_id: Some("bk_9".into()),
        }));
        assert_eq!(engine.state().phase(), Phase::Confirmed);
        let booking = engine.state().confirmed().unwrap();
        assert_eq!(booking.booking_id.as_deref(), Some("bk_9"));
        assert!(engine.state().draft().is_none());
    }

    #[test]
    fn test_second_confirm_rejected_while_in_flight() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        engine.begin_confirm().unwrap();
        assert_eq!(engine.begin_confirm(), Err(SelectionError::SubmissionInProgress));
        assert!(engine.state().is_submitting());
    }

    #[test]
    fn test_selection_frozen_while_submitting() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        engine.begin_confirm().unwrap();
        assert_eq!(
            engine.select_date(date(2025, 6, 6)),
            Err(SelectionError::SubmissionInProgress)
        );
        assert_eq!(
            engine.select_week(WeekDirection::Next),
            Err(SelectionError::SubmissionInProgress)
        );
        assert_eq!(engine.reset(), Err(SelectionError::SubmissionInProgress));
        assert_eq!(engine.state().selected_slot(), Some(slot("15:30")));
    }

    #[test]
    fn test_confirm_failure_keeps_draft() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        engine.begin_confirm().unwrap();
        engine.finish_confirm(Err(SubmitError::Status(503)));
        assert_eq!(engine.state().phase(), Phase::Confirming);
        assert_eq!(engine.state().selected_slot(), Some(slot("15:30")));
        assert!(!engine.state().is_submitting());
        assert!(matches!(
            engine.state().last_error(),
            Some(Notice::BookingFailed(_))
        ));
        // retry without reselecting
        assert!(engine.begin_confirm().is_ok());
        assert_eq!(engine.state().last_error(), None);
    }

    #[test]
    fn test_abandoned_submission_unlocks_engine() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        engine.begin_confirm().unwrap();
        engine.abandon_confirm();

        let state = engine.state();
        assert!(!state.is_submitting());
        assert_eq!(state.phase(), Phase::Confirming);
        assert_eq!(state.selected_slot(), Some(slot("15:30")));
        assert!(matches!(state.last_error(), Some(Notice::BookingFailed(_))));
        assert!(engine.reset().is_ok());
    }

    #[test]
    fn test_abandon_without_submission_is_noop() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        engine.abandon_confirm();
        assert_eq!(engine.state().last_error(), None);
        assert_eq!(engine.state().phase(), Phase::Confirming);
    }

    #[test]
    fn test_finish_without_begin_ignored() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        engine.finish_confirm(Ok(BookingReceipt::default()));
        assert_eq!(engine.state().phase(), Phase::Confirming);
    }

    // ── reschedule ──

    #[test]
    fn test_reschedule_snapshots_booking() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        confirmed(&mut engine);
        let fetch = engine.reschedule().unwrap();
        let state = engine.state();
        assert_eq!(state.phase(), Phase::Selecting);
        assert_eq!(state.selected_slot(), None);
        assert_eq!(state.selected_date(), date(2025, 6, 5));
        let previous = state.previous().unwrap();
        assert_eq!(previous.date(), date(2025, 6, 5));
        assert_eq!(previous.slot(), slot("15:30"));
        assert!(state.confirmed().is_none());
        assert_eq!(fetch.date, date(2025, 6, 5));
    }

    #[test]
    fn test_reschedule_only_from_confirmed() {
        let mut engine = loaded(engine());
        assert!(matches!(
            engine.reschedule(),
            Err(SelectionError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_new_confirmation_discards_previous() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        confirmed(&mut engine);
        let fetch = engine.reschedule().unwrap();
        engine.apply_slots(fetch.token, Ok(vec![slot("13:00")]));
        engine.select_slot(slot("13:00")).unwrap();
        assert!(engine.state().previous().is_some());
        confirmed(&mut engine);
        assert!(engine.state().previous().is_none());
        assert_eq!(engine.state().confirmed().unwrap().slot(), slot("13:00"));
    }

    #[test]
    fn test_selection_refused_once_confirmed() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        confirmed(&mut engine);
        assert!(matches!(
            engine.select_date(date(2025, 6, 6)),
            Err(SelectionError::WrongPhase { .. })
        ));
    }

    // ── stale responses ──

    #[test]
    fn test_stale_slot_response_discarded() {
        let mut engine = loaded(engine());
        let first = engine.select_date(date(2025, 6, 5)).unwrap();
        let second = engine.select_date(date(2025, 6, 6)).unwrap();
        assert!(!engine.apply_slots(first.token, Ok(vec![slot("09:00")])));
        assert!(engine.state().slots().is_empty());
        assert!(engine.apply_slots(second.token, Ok(vec![slot("10:00")])));
        assert_eq!(engine.state().slots(), &[slot("10:00")]);
        // late arrival after the current one resolved
        assert!(!engine.apply_slots(first.token, Ok(vec![slot("09:00")])));
        assert_eq!(engine.state().slots(), &[slot("10:00")]);
    }

    #[test]
    fn test_stale_week_response_discarded() {
        let mut engine = loaded(engine());
        let next = engine.select_week(WeekDirection::Next).unwrap();
        let after = engine.select_week(WeekDirection::Next).unwrap();
        assert!(!engine.apply_week(next.token, Ok(next.week.days().into_iter().collect())));
        assert!(engine.state().available_dates().is_empty());
        assert!(engine.apply_week(after.token, Ok(after.week.days().into_iter().collect())));
        assert_eq!(engine.state().available_dates().len(), 7);
    }

    #[test]
    fn test_week_response_outside_window_filtered() {
        let mut engine = engine();
        let (week, _) = engine.refresh();
        engine.apply_week(week.token, Ok(BTreeSet::from([date(2025, 6, 4), date(2025, 7, 1)])));
        assert_eq!(engine.state().available_dates().len(), 1);
    }

    #[test]
    fn test_slot_fetch_failure_sets_notice() {
        let mut engine = engine();
        let (_, slots) = engine.refresh();
        engine.apply_slots(slots.token, Err(FetchError::Unavailable));
        assert!(engine.state().slots().is_empty());
        assert!(matches!(
            engine.state().last_error(),
            Some(Notice::AvailabilityUnavailable(_))
        ));
        assert!(!engine.state().is_loading_slots());
    }

    #[test]
    fn test_refresh_does_not_touch_draft() {
        let mut engine = loaded(engine());
        pick(&mut engine, date(2025, 6, 5), "15:30");
        let (week, slots) = engine.refresh();
        engine.apply_week(week.token, Ok(BTreeSet::new()));
        engine.apply_slots(slots.token, Ok(vec![]));
        assert_eq!(engine.state().selected_slot(), Some(slot("15:30")));
        assert_eq!(engine.state().phase(), Phase::Confirming);
    }

    #[test]
    fn test_unsorted_slots_pass_through() {
        let mut engine = engine();
        let (_, slots) = engine.refresh();
        let unsorted = vec![slot("16:30"), slot("13:00"), slot("14:00")];
        engine.apply_slots(slots.token, Ok(unsorted.clone()));
        assert_eq!(engine.state().slots(), unsorted.as_slice());
    }
}

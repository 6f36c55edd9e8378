use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::Notice;
use crate::models::{BookingDraft, ConfirmedBooking, TimeSlot, WeekWindow};

/// Booking lifecycle: `Selecting → Confirming → Confirmed`, and back to
/// `Selecting` on reschedule or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Selecting,
    Confirming,
    Confirmed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Selecting => "selecting",
            Phase::Confirming => "confirming",
            Phase::Confirmed => "confirmed",
        })
    }
}

/// Identifies one availability request. Only the newest token of each kind
/// is allowed to write its result into the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// Everything the scheduler knows about the visitor's session.
///
/// Fields are only mutated by [`SlotSelectionEngine`](crate::engine::SlotSelectionEngine);
/// everything else reads through the accessors.
#[derive(Debug, Clone)]
pub struct SchedulingState {
    pub(crate) week: WeekWindow,
    pub(crate) selected_date: NaiveDate,
    pub(crate) phase: Phase,
    pub(crate) draft: Option<BookingDraft>,
    pub(crate) confirmed: Option<ConfirmedBooking>,
    pub(crate) previous: Option<ConfirmedBooking>,
    /// Dates in `week` that have slots. Emptied whenever `week` changes.
    pub(crate) available_dates: BTreeSet<NaiveDate>,
    /// Slots for `selected_date`, in provider order.
    pub(crate) slots: Vec<TimeSlot>,
    pub(crate) last_error: Option<Notice>,
    pub(crate) submitting: bool,
    pub(crate) week_request: Option<RequestToken>,
    pub(crate) slots_request: Option<RequestToken>,
    next_token: u64,
}

impl SchedulingState {
    pub(crate) fn new(today: NaiveDate) -> Self {
        Self {
            week: WeekWindow::containing(today),
            selected_date: today,
            phase: Phase::Selecting,
            draft: None,
            confirmed: None,
            previous: None,
            available_dates: BTreeSet::new(),
            slots: Vec::new(),
            last_error: None,
            submitting: false,
            week_request: None,
            slots_request: None,
            next_token: 0,
        }
    }

    pub fn week(&self) -> WeekWindow {
        self.week
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn selected_slot(&self) -> Option<TimeSlot> {
        self.draft.as_ref().map(|d| d.slot)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn draft(&self) -> Option<&BookingDraft> {
        self.draft.as_ref()
    }

    pub fn confirmed(&self) -> Option<&ConfirmedBooking> {
        self.confirmed.as_ref()
    }

    /// The booking being rescheduled, kept for display.
    pub fn previous(&self) -> Option<&ConfirmedBooking> {
        self.previous.as_ref()
    }

    pub fn available_dates(&self) -> &BTreeSet<NaiveDate> {
        &self.available_dates
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn last_error(&self) -> Option<&Notice> {
        self.last_error.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_loading_week(&self) -> bool {
        self.week_request.is_some()
    }

    pub fn is_loading_slots(&self) -> bool {
        self.slots_request.is_some()
    }

    pub(crate) fn issue_token(&mut self) -> RequestToken {
        self.next_token += 1;
        RequestToken(self.next_token)
    }

    /// Drop any selected slot and go back to picking.
    pub(crate) fn clear_draft(&mut self) {
        self.draft = None;
        self.phase = Phase::Selecting;
    }
}

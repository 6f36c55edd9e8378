use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::engine::SlotSelectionEngine;
use crate::models::{BookingDraft, ConfirmedBooking, TimeSlot, MEETING_DURATION_MINUTES};
use crate::state::Phase;

/// Render-ready snapshot of the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerView {
    pub phase: Phase,
    pub host_name: String,
    pub week_start: NaiveDate,
    pub can_go_back: bool,
    pub days: Vec<DayCell>,
    pub selected_date: NaiveDate,
    pub slots: Vec<SlotCell>,
    pub loading_week: bool,
    pub loading_slots: bool,
    pub submitting: bool,
    pub duration_minutes: u32,
    pub timezone: String,
    pub timezone_label: String,
    pub draft: Option<BookingSummary>,
    pub confirmed: Option<BookingSummary>,
    pub previous: Option<BookingSummary>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub weekday: String,
    pub day: u32,
    pub month: String,
    pub disabled: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotCell {
    pub time: TimeSlot,
    pub label: String,
    pub disabled: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSummary {
    pub date: NaiveDate,
    pub start: TimeSlot,
    pub end: TimeSlot,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    /// e.g. `Thursday, Jun 5th, 1:00 PM - 1:30 PM Europe/Berlin`
    pub text: String,
}

impl BookingSummary {
    pub fn from_draft(draft: &BookingDraft) -> Self {
        let end = TimeSlot::from(draft.slot.ends_at());
        let text = format!(
            "{}, {} {}{}, {} - {} {}",
            draft.date.format("%A"),
            draft.date.format("%b"),
            draft.date.day(),
            ordinal_suffix(draft.date.day()),
            draft.slot.label(),
            end.label(),
            draft.timezone
        );
        Self {
            date: draft.date,
            start: draft.slot,
            end,
            timezone: draft.timezone.clone(),
            booking_id: None,
            text,
        }
    }

    pub fn from_booking(booking: &ConfirmedBooking) -> Self {
        Self {
            booking_id: booking.booking_id.clone(),
            ..Self::from_draft(&booking.draft)
        }
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

impl SchedulerView {
    pub fn build(engine: &SlotSelectionEngine) -> Self {
        let state = engine.state();
        let clock = engine.clock();
        let selected_slot = state.selected_slot();
        // The confirmation screen owns the display once booked
        let editing = state.phase() != Phase::Confirmed;

        let days = state
            .week()
            .days()
            .into_iter()
            .map(|date| DayCell {
                date,
                weekday: date.format("%a").to_string(),
                day: date.day(),
                month: date.format("%b").to_string(),
                disabled: !editing || engine.is_date_disabled(date),
                selected: date == state.selected_date(),
            })
            .collect();

        let slots = state
            .slots()
            .iter()
            .map(|&time| SlotCell {
                time,
                label: time.label(),
                disabled: !editing || engine.is_slot_disabled(state.selected_date(), time),
                selected: selected_slot == Some(time),
            })
            .collect();

        Self {
            phase: state.phase(),
            host_name: engine.host_name().to_string(),
            week_start: state.week().start(),
            can_go_back: editing && engine.can_go_back(),
            days,
            selected_date: state.selected_date(),
            slots,
            loading_week: state.is_loading_week(),
            loading_slots: state.is_loading_slots(),
            submitting: state.is_submitting(),
            duration_minutes: MEETING_DURATION_MINUTES,
            timezone: clock.timezone().name().to_string(),
            timezone_label: clock.timezone_label(),
            draft: state.draft().map(BookingSummary::from_draft),
            confirmed: state.confirmed().map(BookingSummary::from_booking),
            previous: state.previous().map(BookingSummary::from_booking),
            notice: state.last_error().map(|n| n.message().to_string()),
        }
    }
}

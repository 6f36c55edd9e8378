use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use slotbook_core::BookingRequest;

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub start: NaiveDate,
}

/// Accepted booking: the request echoed back with its id.
#[derive(Debug, Serialize)]
pub struct BookingAck {
    pub booking_id: String,
    #[serde(flatten)]
    pub booking: BookingRequest,
}

/// Error body shared by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub ok: bool,
    pub error: String,
}

impl ApiError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: msg.into(),
        }
    }
}

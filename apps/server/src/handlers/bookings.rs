use axum::{extract::State, http::StatusCode, Json};
use slotbook_core::config::parse_timezone;
use slotbook_core::{BookingRequest, MEETING_DURATION_MINUTES};
use std::sync::Arc;

use crate::models::{ApiError, BookingAck};
use crate::store::BookError;
use crate::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn reject(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError::new(msg)))
}

/// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BookingRequest>,
) -> ApiResult<BookingAck> {
    if body.duration != MEETING_DURATION_MINUTES {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            format!("Meetings are {MEETING_DURATION_MINUTES} minutes long"),
        ));
    }
    if parse_timezone(&body.timezone).is_err() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            format!("Unknown timezone {:?}", body.timezone),
        ));
    }
    if let Some(guest) = &body.guest {
        guest
            .validate()
            .map_err(|e| reject(StatusCode::BAD_REQUEST, e))?;
    }

    let record = state
        .store
        .book(body, state.store.today())
        .map_err(|e| match e {
            BookError::NotOffered => reject(StatusCode::NOT_FOUND, "That time is not offered"),
            BookError::AlreadyBooked => {
                reject(StatusCode::CONFLICT, "That time has just been booked")
            }
        })?;

    tracing::info!(
        booking_id = %record.id,
        date = %record.request.date,
        time = %record.request.time,
        timezone = %record.request.timezone,
        created_at = %record.created_at,
        "booking created"
    );

    Ok(Json(BookingAck {
        booking_id: record.id,
        booking: record.request,
    }))
}

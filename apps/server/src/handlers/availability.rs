use axum::{
    extract::{Query, State},
    Json,
};
use slotbook_core::models::{SlotsResponse, WeekAvailabilityResponse};
use std::sync::Arc;

use crate::models::{SlotsQuery, WeekQuery};
use crate::AppState;

/// GET /api/slots?date=YYYY-MM-DD
pub async fn slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Json<SlotsResponse> {
    let slots = state.store.slots_for(query.date, state.store.today());
    tracing::debug!(date = %query.date, count = slots.len(), "slots served");
    Json(SlotsResponse {
        date: query.date,
        slots,
    })
}

/// GET /api/slots/week?start=YYYY-MM-DD
pub async fn week(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeekQuery>,
) -> Json<WeekAvailabilityResponse> {
    let dates = state.store.dates_for_week(query.start, state.store.today());
    Json(WeekAvailabilityResponse {
        start: query.start,
        dates,
    })
}

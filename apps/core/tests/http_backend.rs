use axum::{
    extract::Query,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use slotbook_core::models::{SlotsResponse, WeekAvailabilityResponse};
use slotbook_core::{
    AvailabilityProvider, BookingRequest, BookingSubmitter, FetchError, FixedClock, HttpBackend,
    LocalClock, Phase, SchedulerConfig, Session, SubmitError, TimeSlot, WeekWindow,
};
use std::sync::Arc;
use std::time::Duration;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn slot(s: &str) -> TimeSlot {
    s.parse().unwrap()
}

#[derive(Deserialize)]
struct DateQuery {
    date: NaiveDate,
}

#[derive(Deserialize)]
struct WeekQuery {
    start: NaiveDate,
}

/// 2025-06-07 fails; every other day offers 13:00 and 13:30.
async fn slots(Query(q): Query<DateQuery>) -> Result<Json<SlotsResponse>, StatusCode> {
    if q.date == date(2025, 6, 7) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(SlotsResponse {
        date: q.date,
        slots: vec![slot("13:00"), slot("13:30")],
    }))
}

/// Offers start+2, start+4 and a date outside the week.
async fn week(Query(q): Query<WeekQuery>) -> Json<WeekAvailabilityResponse> {
    Json(WeekAvailabilityResponse {
        start: q.start,
        dates: vec![
            q.start + TimeDelta::days(2),
            q.start + TimeDelta::days(4),
            q.start + TimeDelta::days(30),
        ],
    })
}

/// Only 13:00 can be booked.
async fn book(Json(req): Json<BookingRequest>) -> Result<Json<serde_json::Value>, StatusCode> {
    if req.time != slot("13:00") {
        return Err(StatusCode::CONFLICT);
    }
    let mut ack = serde_json::to_value(&req).unwrap();
    ack["booking_id"] = "bk_http_1".into();
    Ok(Json(ack))
}

/// Base URL of a fresh in-process server.
async fn serve_url() -> String {
    let app = Router::new()
        .route("/api/slots", get(slots))
        .route("/api/slots/week", get(week))
        .route("/api/bookings", post(book));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn serve() -> HttpBackend {
    HttpBackend::new(&serve_url().await, Duration::from_secs(5)).unwrap()
}

fn request(time: &str) -> BookingRequest {
    BookingRequest {
        date: date(2025, 6, 5),
        time: slot(time),
        timezone: "UTC".into(),
        duration: 30,
        guest: None,
    }
}

#[tokio::test]
async fn test_fetches_slots() {
    let backend = serve().await;
    let slots = backend.slots_for_date(date(2025, 6, 5)).await.unwrap();
    assert_eq!(slots, vec![slot("13:00"), slot("13:30")]);
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let backend = serve().await;
    assert_eq!(
        backend.slots_for_date(date(2025, 6, 7)).await,
        Err(FetchError::Status(500))
    );
}

#[tokio::test]
async fn test_week_endpoint_filtered_to_window() {
    let backend = serve().await;
    let week = WeekWindow::containing(date(2025, 6, 1));
    let dates = backend.available_dates_for_week(week).await.unwrap();
    assert_eq!(dates.into_iter().collect::<Vec<_>>(), vec![date(2025, 6, 3), date(2025, 6, 5)]);
}

#[tokio::test]
async fn test_submit_returns_booking_id() {
    let backend = serve().await;
    let receipt = backend.submit(&request("13:00")).await.unwrap();
    assert_eq!(receipt.booking_id.as_deref(), Some("bk_http_1"));
}

#[tokio::test]
async fn test_submit_conflict() {
    let backend = serve().await;
    assert_eq!(backend.submit(&request("13:30")).await, Err(SubmitError::Conflict));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let backend = HttpBackend::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
    assert!(matches!(
        backend.slots_for_date(date(2025, 6, 5)).await,
        Err(FetchError::Transport(_))
    ));
}

#[tokio::test]
async fn test_session_over_http() {
    let backend = Arc::new(serve().await);
    let now = Utc.with_ymd_and_hms(2025, 6, 3, 9, 0, 0).unwrap();
    let clock = LocalClock::new(Arc::new(FixedClock::new(now)), Tz::UTC);
    let session = Session::with_backend(clock, backend);
    session.start().await;

    assert_eq!(session.state().available_dates().len(), 2);
    session.select_date(date(2025, 6, 5)).await.unwrap();
    session.select_slot(slot("13:00")).unwrap();
    session.confirm().await.unwrap();

    let state = session.state();
    assert_eq!(state.phase(), Phase::Confirmed);
    assert_eq!(
        state.confirmed().unwrap().booking_id.as_deref(),
        Some("bk_http_1")
    );
}

#[tokio::test]
async fn test_session_from_config() {
    let url = serve_url().await;
    let config = SchedulerConfig::from_lookup(|key| match key {
        "SLOTBOOK_BACKEND_URL" => Some(url.clone()),
        "SLOTBOOK_HOST_NAME" => Some("Ada Lovelace".into()),
        "SLOTBOOK_TIMEZONE" => Some("Europe/Paris".into()),
        _ => None,
    })
    .unwrap();
    let session = Session::from_config(&config).unwrap();
    session.start().await;

    let state = session.state();
    assert_eq!(state.available_dates().len(), 2);
    assert!(state
        .available_dates()
        .iter()
        .all(|d| state.week().contains(*d)));

    let view = session.view();
    assert_eq!(view.host_name, "Ada Lovelace");
    assert_eq!(view.timezone, "Europe/Paris");
    assert!(view.notice.is_none());
}

#[test]
fn test_session_from_config_rejects_bad_url() {
    let config = SchedulerConfig {
        backend_url: "not a url".into(),
        ..SchedulerConfig::default()
    };
    assert!(Session::from_config(&config).is_err());
}

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{StatusCode, Url};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::availability::{AvailabilityProvider, BookingSubmitter};
use crate::error::{ConfigError, FetchError, SubmitError};
use crate::models::{
    BookingReceipt, BookingRequest, SlotsResponse, TimeSlot, WeekAvailabilityResponse, WeekWindow,
};

/// Availability and booking over HTTP against a slotbook server.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        // Url::join drops the last path segment unless the base ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| ConfigError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, String> {
        self.base_url.join(path).map_err(|e| e.to_string())
    }
}

fn day_param(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn fetch_error(err: reqwest::Error) -> FetchError {
    if err.is_decode() {
        FetchError::Payload(err.to_string())
    } else {
        FetchError::Transport(err.to_string())
    }
}

fn submit_error(err: reqwest::Error) -> SubmitError {
    if err.is_decode() {
        SubmitError::Payload(err.to_string())
    } else {
        SubmitError::Transport(err.to_string())
    }
}

#[async_trait]
impl AvailabilityProvider for HttpBackend {
    async fn slots_for_date(&self, date: NaiveDate) -> Result<Vec<TimeSlot>, FetchError> {
        let url = self.endpoint("api/slots").map_err(FetchError::Transport)?;
        let resp = self
            .client
            .get(url)
            .query(&[("date", day_param(date))])
            .send()
            .await
            .map_err(fetch_error)?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        let body: SlotsResponse = resp.json().await.map_err(fetch_error)?;
        if body.date != date {
            return Err(FetchError::Payload(format!(
                "asked for {date}, got slots for {}",
                body.date
            )));
        }
        Ok(body.slots)
    }

    async fn available_dates_for_week(
        &self,
        week: WeekWindow,
    ) -> Result<BTreeSet<NaiveDate>, FetchError> {
        let url = self.endpoint("api/slots/week").map_err(FetchError::Transport)?;
        let resp = self
            .client
            .get(url)
            .query(&[("start", day_param(week.start()))])
            .send()
            .await
            .map_err(fetch_error)?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        let body: WeekAvailabilityResponse = resp.json().await.map_err(fetch_error)?;
        Ok(body
            .dates
            .into_iter()
            .filter(|d| week.contains(*d))
            .collect())
    }
}

#[async_trait]
impl BookingSubmitter for HttpBackend {
    async fn submit(&self, request: &BookingRequest) -> Result<BookingReceipt, SubmitError> {
        let url = self.endpoint("api/bookings").map_err(SubmitError::Transport)?;
        let resp = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(submit_error)?;

        match resp.status() {
            StatusCode::CONFLICT => Err(SubmitError::Conflict),
            status if !status.is_success() => Err(SubmitError::Status(status.as_u16())),
            _ => resp.json().await.map_err(submit_error),
        }
    }
}

use anyhow::Context;
use chrono::Weekday;
use chrono_tz::Tz;
use slotbook_core::config::parse_timezone;
use slotbook_core::models::DEFAULT_SLOT_TIMES;
use slotbook_core::TimeSlot;
use std::collections::HashSet;

/// Days ahead for which slots are offered.
const DEFAULT_HORIZON_DAYS: i64 = 60;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Defines the server's "today".
    pub timezone: Tz,
    pub slot_times: Vec<TimeSlot>,
    pub open_weekdays: HashSet<Weekday>,
    pub horizon_days: i64,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("PORT") {
            Some(p) => p.parse().with_context(|| format!("PORT must be a number, got {p:?}"))?,
            None => 3000,
        };
        let timezone = match lookup("SCHEDULE_TIMEZONE") {
            Some(name) => parse_timezone(&name)?,
            None => Tz::UTC,
        };
        let slot_times = match lookup("SLOT_TIMES") {
            Some(list) => parse_slot_times(&list)?,
            None => parse_slot_times(&DEFAULT_SLOT_TIMES.join(","))?,
        };
        let open_weekdays = match lookup("OPEN_WEEKDAYS") {
            Some(list) => parse_weekdays(&list)?,
            None => all_weekdays(),
        };
        let horizon_days = match lookup("BOOKING_HORIZON_DAYS") {
            Some(d) => d
                .parse()
                .with_context(|| format!("BOOKING_HORIZON_DAYS must be a number, got {d:?}"))?,
            None => DEFAULT_HORIZON_DAYS,
        };

        Ok(Self {
            host,
            port,
            timezone,
            slot_times,
            open_weekdays,
            horizon_days,
        })
    }
}

/// `"11:30, 12:00"` → slots, in the given order.
fn parse_slot_times(list: &str) -> anyhow::Result<Vec<TimeSlot>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<TimeSlot>().context("invalid SLOT_TIMES entry"))
        .collect()
}

/// `"mon,tue,fri"` → weekdays.
fn parse_weekdays(list: &str) -> anyhow::Result<HashSet<Weekday>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Weekday>()
                .map_err(|_| anyhow::anyhow!("invalid OPEN_WEEKDAYS entry {s:?}"))
        })
        .collect()
}

fn all_weekdays() -> HashSet<Weekday> {
    [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ]
    .into()
}

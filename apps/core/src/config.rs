use chrono_tz::Tz;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_HOST_NAME: &str = "Host";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Settings for an embedded scheduler session.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// The viewer's timezone; every "today" and slot instant is computed in it.
    pub timezone: Tz,
    pub backend_url: String,
    /// Display name of the host being booked.
    pub host_name: String,
    pub request_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            backend_url: DEFAULT_BACKEND_URL.into(),
            host_name: DEFAULT_HOST_NAME.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl SchedulerConfig {
    /// Read `SLOTBOOK_*` variables, falling back to `TZ` for the timezone.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timezone = match lookup("SLOTBOOK_TIMEZONE").or_else(|| lookup("TZ")) {
            Some(name) if !name.trim().is_empty() => parse_timezone(&name)?,
            _ => defaults.timezone,
        };

        let request_timeout = match lookup("SLOTBOOK_REQUEST_TIMEOUT_SECS") {
            Some(value) => {
                let secs = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidNumber {
                        var: "SLOTBOOK_REQUEST_TIMEOUT_SECS",
                        value,
                    })?;
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        Ok(Self {
            timezone,
            backend_url: lookup("SLOTBOOK_BACKEND_URL").unwrap_or(defaults.backend_url),
            host_name: lookup("SLOTBOOK_HOST_NAME").unwrap_or(defaults.host_name),
            request_timeout,
        })
    }
}

/// Parse an IANA timezone name such as `America/New_York`.
pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone(name.to_string()))
}

use std::env;

use crate::models::availability::parse_weekday_list;
use crate::models::BusinessHours;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AvailabilitySource {
    Static,
    Backend,
}

impl AvailabilitySource {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "backend" | "server" => AvailabilitySource::Backend,
            _ => AvailabilitySource::Static,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub api_base_url: String,
    pub availability_source: AvailabilitySource,
    pub business_hours: BusinessHours,
    /// Open bookings untouched this long are dropped.
    pub wizard_idle_minutes: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = BusinessHours::default();
        let opening_hour = env_number("OPENING_HOUR").unwrap_or(defaults.opening_hour);
        let closing_hour = env_number("CLOSING_HOUR").unwrap_or(defaults.closing_hour);
        anyhow::ensure!(
            opening_hour < closing_hour && closing_hour <= 24,
            "OPENING_HOUR must be before CLOSING_HOUR (got {opening_hour}..{closing_hour})"
        );

        let closed_weekdays = match env::var("CLOSED_WEEKDAYS") {
            Ok(v) => parse_weekday_list(&v)?,
            Err(_) => defaults.closed_weekdays,
        };

        Ok(Self {
            port: env_number("PORT").unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "salonbook.db".to_string()),
            api_base_url: env::var("API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080/api".to_string()),
            availability_source: env::var("AVAILABILITY_SOURCE")
                .map(|v| AvailabilitySource::parse(&v))
                .unwrap_or(AvailabilitySource::Static),
            business_hours: BusinessHours {
                opening_hour,
                closing_hour,
                closed_weekdays,
            },
            wizard_idle_minutes: env_number("WIZARD_IDLE_MINUTES").unwrap_or(120),
        })
    }
}

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

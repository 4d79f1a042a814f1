use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::BusinessHours;
use crate::services::api::BookingApi;

pub const SLOT_INTERVAL_MINUTES: i64 = 30;

/// Bookable start times for `date` under fixed business hours, relative to
/// the host's current local time.
pub fn compute_slots(date: NaiveDate, duration_minutes: i64, hours: &BusinessHours) -> Vec<NaiveTime> {
    compute_slots_at(date, duration_minutes, hours, Local::now().naive_local())
}

pub fn compute_slots_at(
    date: NaiveDate,
    duration_minutes: i64,
    hours: &BusinessHours,
    now: NaiveDateTime,
) -> Vec<NaiveTime> {
    if hours.is_closed_on(date) {
        return Vec::new();
    }

    let midnight = date.and_time(NaiveTime::MIN);
    let open = midnight + Duration::hours(hours.opening_hour as i64);
    let close = midnight + Duration::hours(hours.closing_hour as i64);

    slots_between(open, close, duration_minutes, now)
}

/// Walks `[open, close)` in fixed steps, keeping starts that are in the
/// future and whose service still ends by `close`.
fn slots_between(
    open: NaiveDateTime,
    close: NaiveDateTime,
    duration_minutes: i64,
    now: NaiveDateTime,
) -> Vec<NaiveTime> {
    // Also bounds the duration before it becomes a `Duration`
    if duration_minutes <= 0 || duration_minutes > (close - open).num_minutes() {
        return Vec::new();
    }

    let duration = Duration::minutes(duration_minutes);
    let step = Duration::minutes(SLOT_INTERVAL_MINUTES);

    let mut slots = Vec::new();
    let mut start = open;
    while start + duration <= close {
        if start > now {
            slots.push(start.time());
        }
        start += step;
    }
    slots
}

/// Where the wizard gets its slot list from. `token` authenticates backend
/// lookups for a signed-in customer.
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    async fn slots(
        &self,
        date: NaiveDate,
        duration_minutes: i64,
        now: NaiveDateTime,
        token: Option<&str>,
    ) -> anyhow::Result<Vec<NaiveTime>>;
}

/// Fixed business-hours heuristic.
pub struct StaticAvailability {
    hours: BusinessHours,
}

impl StaticAvailability {
    pub fn new(hours: BusinessHours) -> Self {
        Self { hours }
    }
}

#[async_trait]
impl AvailabilityProvider for StaticAvailability {
    async fn slots(
        &self,
        date: NaiveDate,
        duration_minutes: i64,
        now: NaiveDateTime,
        _token: Option<&str>,
    ) -> anyhow::Result<Vec<NaiveTime>> {
        Ok(compute_slots_at(date, duration_minutes, &self.hours, now))
    }
}

/// Derives slots from the backend's working hours and blocked slots.
pub struct BackendAvailability {
    api: Arc<dyn BookingApi>,
}

impl BackendAvailability {
    pub fn new(api: Arc<dyn BookingApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AvailabilityProvider for BackendAvailability {
    async fn slots(
        &self,
        date: NaiveDate,
        duration_minutes: i64,
        now: NaiveDateTime,
        token: Option<&str>,
    ) -> anyhow::Result<Vec<NaiveTime>> {
        let working_hours = self
            .api
            .fetch_working_hours(token)
            .await
            .context("failed to fetch working hours")?;

        let mut day = None;
        for wh in &working_hours {
            if wh.weekday()? == date.weekday() {
                day = Some(wh);
                break;
            }
        }
        let Some(day) = day.filter(|wh| !wh.closed) else {
            tracing::debug!(%date, "no working hours for weekday");
            return Ok(Vec::new());
        };

        let open = date.and_time(day.opening()?);
        let close = date.and_time(day.closing()?);
        let candidates = slots_between(open, close, duration_minutes, now);
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let blocked = self
            .api
            .fetch_blocked_slots(date, token)
            .await
            .context("failed to fetch blocked slots")?;

        let duration = Duration::minutes(duration_minutes);
        Ok(candidates
            .into_iter()
            .filter(|t| {
                let start = date.and_time(*t);
                !blocked.iter().any(|b| b.overlaps(start, start + duration))
            })
            .collect())
    }
}

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Fixed opening hours used by the static availability heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessHours {
    pub opening_hour: u32,
    pub closing_hour: u32,
    pub closed_weekdays: Vec<Weekday>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            opening_hour: 9,
            closing_hour: 18,
            closed_weekdays: vec![Weekday::Sun],
        }
    }
}

impl BusinessHours {
    pub fn is_closed_on(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.closed_weekdays.contains(&date.weekday())
    }

    pub fn to_human_readable(&self) -> String {
        let mut text = format!("{:02}:00-{:02}:00", self.opening_hour, self.closing_hour);
        if !self.closed_weekdays.is_empty() {
            let closed = self
                .closed_weekdays
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            text.push_str(&format!(", closed {closed}"));
        }
        text
    }
}

/// One row of `GET /working-hours`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub closed: bool,
}

impl WorkingHours {
    pub fn weekday(&self) -> anyhow::Result<Weekday> {
        parse_weekday(&self.day_of_week)
    }

    pub fn opening(&self) -> anyhow::Result<NaiveTime> {
        parse_time(&self.start_time)
    }

    pub fn closing(&self) -> anyhow::Result<NaiveTime> {
        parse_time(&self.end_time)
    }
}

/// One row of `GET /blocked-slots`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedSlot {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BlockedSlot {
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start_time < end && self.end_time > start
    }
}

/// Accepts `mon`, `Monday` and `MONDAY` style names.
pub fn parse_weekday(s: &str) -> anyhow::Result<Weekday> {
    let lower = s.trim().to_lowercase();
    let day = match lower.get(..3).unwrap_or("") {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return Err(anyhow::anyhow!("invalid weekday: {s}")),
    };
    Ok(day)
}

pub fn parse_weekday_list(s: &str) -> anyhow::Result<Vec<Weekday>> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_weekday)
        .collect()
}

/// Accepts `HH:MM` and `HH:MM:SS`.
pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| anyhow::anyhow!("invalid time format: {s}"))
}

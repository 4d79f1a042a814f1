use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::models::Service;

/// Builds a single-event iCalendar file for a confirmed booking, using the
/// host time zone and the current instant for the UID and DTSTAMP.
pub fn format_ics(service: &Service, date: NaiveDate, time: NaiveTime, notes: Option<&str>) -> String {
    format_ics_with(service, date, time, notes, &Local, Utc::now())
}

pub fn format_ics_with<Tz: TimeZone>(
    service: &Service,
    date: NaiveDate,
    time: NaiveTime,
    notes: Option<&str>,
    tz: &Tz,
    stamp: DateTime<Utc>,
) -> String {
    let start = date.and_time(time);
    let end = Duration::try_minutes(service.effective_duration_minutes())
        .and_then(|d| start.checked_add_signed(d))
        .unwrap_or(start + Duration::hours(1));

    let dtstart = to_utc(tz, start).format("%Y%m%dT%H%M%SZ").to_string();
    let dtend = to_utc(tz, end).format("%Y%m%dT%H%M%SZ").to_string();
    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}-{}@salonbook", stamp.timestamp_millis(), service.id);

    let summary = escape_text(&service.name);
    let mut description = if service.description.trim().is_empty() {
        format!("Appointment: {}", service.name)
    } else {
        service.description.clone()
    };
    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        description.push_str(&format!("\nNotes: {notes}"));
    }
    let description = escape_text(&description);

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Salonbook//Booking//EN\r\n\
         CALSCALE:GREGORIAN\r\n\
         METHOD:PUBLISH\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

/// Download name for the calendar file, derived from the service name.
pub fn ics_filename(service: &Service) -> String {
    let stem: String = service
        .name
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();

    if stem.is_empty() {
        "appointment.ics".to_string()
    } else {
        format!("{stem}.ics")
    }
}

fn to_utc<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        // Falls into a DST gap; treat the wall time as UTC
        None => Utc.from_utc_datetime(&local),
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

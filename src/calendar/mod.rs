//! Calendar export for events.
//!
//! Turns an event's date and display times into a Google Calendar template
//! link or a single-event iCalendar document. Times are local (floating); the
//! Google link names the site's timezone via `ctz`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use icalendar::{Calendar, Component, EventLike};
use thiserror::Error;

use crate::models::EventEntry;

const GOOGLE_CALENDAR_URL: &str = "https://calendar.google.com/calendar/render";
const UID_DOMAIN: &str = "ebrtq.com";
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Errors turning event fields into calendar times.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid event date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time '{0}'")]
    InvalidTime(String),

    #[error("invalid time range '{0}', expected 'START - END'")]
    InvalidRange(String),

    #[error("event has no start and end time")]
    MissingTime,
}

/// Parse an event date in `YYYY-MM-DD` form.
pub fn parse_date(input: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| CalendarError::InvalidDate(input.to_string()))
}

/// Parse a wall-clock time: `"6:00 PM"`, `"6:00pm"`, `"18:00"` or `"9:05"`.
pub fn parse_clock_time(input: &str) -> Result<NaiveTime, CalendarError> {
    let invalid = || CalendarError::InvalidTime(input.to_string());

    let upper = input.trim().to_ascii_uppercase();
    let (clock, pm) = if let Some(rest) = upper.strip_suffix("AM") {
        (rest.trim_end(), Some(false))
    } else if let Some(rest) = upper.strip_suffix("PM") {
        (rest.trim_end(), Some(true))
    } else {
        (upper.as_str(), None)
    };

    let (hours, minutes) = clock.split_once(':').ok_or_else(invalid)?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;

    let hours = match pm {
        None => hours,
        Some(pm) => {
            if !(1..=12).contains(&hours) {
                return Err(invalid());
            }
            // 12 AM is midnight, 12 PM is noon.
            hours % 12 + if pm { 12 } else { 0 }
        }
    };

    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// Parse a combined display range such as `"4:30 PM - 8:30 PM"`.
pub fn parse_time_range(input: &str) -> Result<(NaiveTime, NaiveTime), CalendarError> {
    let (start, end) = input
        .split_once(" - ")
        .or_else(|| input.split_once('–'))
        .or_else(|| input.split_once('-'))
        .ok_or_else(|| CalendarError::InvalidRange(input.to_string()))?;
    Ok((parse_clock_time(start)?, parse_clock_time(end)?))
}

/// Check that whatever date and time fields an event carries are parseable.
///
/// An event without any time is valid for listing; it just cannot be exported.
pub fn check_event_times(event: &EventEntry) -> Result<(), CalendarError> {
    parse_date(&event.date)?;
    if let Some(time) = &event.time {
        parse_time_range(time)?;
    }
    for time in [&event.time_from, &event.time_to].into_iter().flatten() {
        parse_clock_time(time)?;
    }
    Ok(())
}

/// Local start and end of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSchedule {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl EventSchedule {
    /// Build from `timeFrom`/`timeTo` when both are set, else from `time`.
    pub fn from_event(event: &EventEntry) -> Result<Self, CalendarError> {
        let date = parse_date(&event.date)?;

        let (start, end) = match (&event.time_from, &event.time_to, &event.time) {
            (Some(from), Some(to), _) => (parse_clock_time(from)?, parse_clock_time(to)?),
            (_, _, Some(range)) => parse_time_range(range)?,
            _ => return Err(CalendarError::MissingTime),
        };

        let start = date.and_time(start);
        let mut end = date.and_time(end);
        // Late events run past midnight.
        if end < start {
            end += Duration::days(1);
        }

        Ok(Self { start, end })
    }

    fn dates_param(&self) -> String {
        format!(
            "{}/{}",
            self.start.format(STAMP_FORMAT),
            self.end.format(STAMP_FORMAT)
        )
    }
}

/// Google Calendar "add event" template link.
pub fn google_calendar_url(
    event: &EventEntry,
    schedule: &EventSchedule,
    timezone: &str,
) -> String {
    let dates = schedule.dates_param();
    let params = [
        ("action", "TEMPLATE"),
        ("text", event.title.as_str()),
        ("dates", dates.as_str()),
        ("details", event.description.as_deref().unwrap_or("")),
        ("location", event.location.as_deref().unwrap_or("")),
        ("ctz", timezone),
    ];

    match reqwest::Url::parse_with_params(GOOGLE_CALENDAR_URL, &params) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::warn!("Failed to build calendar link for {}: {}", event.id, e);
            GOOGLE_CALENDAR_URL.to_string()
        }
    }
}

/// Single-event iCalendar document with floating local times.
pub fn icalendar_document(
    event: &EventEntry,
    schedule: &EventSchedule,
    now: DateTime<Utc>,
) -> String {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&format!("{}@{}", event.id, UID_DOMAIN));
    ics_event.add_property("DTSTAMP", now.format("%Y%m%dT%H%M%SZ").to_string());
    ics_event.add_property("DTSTART", schedule.start.format(STAMP_FORMAT).to_string());
    ics_event.add_property("DTEND", schedule.end.format(STAMP_FORMAT).to_string());
    ics_event.summary(&event.title);
    ics_event.description(event.description.as_deref().unwrap_or(""));
    if let Some(location) = &event.location {
        ics_event.location(location);
    }
    ics_event.add_property("URL", &event.url);

    let mut cal = Calendar::new();
    cal.push(ics_event.done());
    cal.done().to_string()
}

//! Event calendar loading
//!
//! Reads an iCalendar (RFC 5545) file with the `ical` crate and keeps only
//! what registration needs from each VEVENT: the start date and the summary.
//!
//! ## Date handling
//!
//! DTSTART values are taken as written, without time zone conversion:
//!
//! - **Date only**: `20240301` is March 1, 2024
//! - **Date-time (UTC)**: `20240301T140000Z` is also March 1, 2024
//! - **Date-time (with TZID)**: the parameter is ignored and the local date is kept
//!
//! ## Example
//!
//! ```no_run
//! use attendance_core::calendar::{event_for_date, load_events, CALENDAR_FILE};
//! use chrono::Local;
//!
//! let events = load_events(CALENDAR_FILE);
//! if let Some(event) = event_for_date(&events, Local::now().date_naive()) {
//!     println!("Today: {}", event.name);
//! }
//! ```

use crate::error::CalendarError;
use chrono::NaiveDate;
use ical::parser::ical::component::IcalEvent;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Calendar file consulted on every run, relative to the working directory
pub const CALENDAR_FILE: &str = "calendar.ics";

/// Name given to events without a SUMMARY
pub const UNNAMED_EVENT: &str = "No name";

/// A scheduled event: the day it happens and what it is called
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Start date, truncated to the day
    pub date: NaiveDate,
    /// Event summary/title
    pub name: String,
}

impl CalendarEvent {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
        }
    }
}

/// Parse every VEVENT in the calendar file, in file order.
///
/// # Errors
///
/// Returns `CalendarError` if:
/// - File cannot be read
/// - File is not a valid ICS file
/// - An event has no DTSTART, or one that does not start with `YYYYMMDD`
#[must_use = "this function returns parsed events that should be processed"]
pub fn parse_calendar<P: AsRef<Path>>(path: P) -> Result<Vec<CalendarEvent>, CalendarError> {
    let path = path.as_ref();

    let file = File::open(path).map_err(|e| CalendarError::read_error(path, e))?;
    let reader = ical::IcalParser::new(BufReader::new(file));

    let mut events = Vec::new();
    for calendar_result in reader {
        let calendar = calendar_result
            .map_err(|e| CalendarError::invalid_format(path, format!("ICS parse error: {e}")))?;

        for event in &calendar.events {
            let parsed =
                parse_event(event).map_err(|message| CalendarError::invalid_event(path, message))?;
            events.push(parsed);
        }
    }

    Ok(events)
}

/// Load events, treating any failure as "no events".
///
/// An empty result tells the caller nothing usable was found; the reason is
/// logged here.
pub fn load_events<P: AsRef<Path>>(path: P) -> Vec<CalendarEvent> {
    let path = path.as_ref();
    match parse_calendar(path) {
        Ok(events) => {
            info!(count = events.len(), path = %path.display(), "Loaded calendar events");
            events
        }
        Err(err) => {
            warn!("Calendar unavailable: {err}");
            Vec::new()
        }
    }
}

/// First event scheduled on `date`, in list order
#[must_use]
pub fn event_for_date(events: &[CalendarEvent], date: NaiveDate) -> Option<&CalendarEvent> {
    events.iter().find(|event| event.date == date)
}

fn parse_event(event: &IcalEvent) -> Result<CalendarEvent, String> {
    let mut start: Option<String> = None;
    let mut summary: Option<String> = None;

    for property in &event.properties {
        match property.name.as_str() {
            "DTSTART" => start.clone_from(&property.value),
            "SUMMARY" => summary.clone_from(&property.value),
            _ => {}
        }
    }

    let start = start.ok_or_else(|| "event has no DTSTART".to_string())?;
    let date =
        parse_start_date(&start).ok_or_else(|| format!("unrecognized DTSTART value {start:?}"))?;

    Ok(CalendarEvent {
        date,
        name: summary.map_or_else(|| UNNAMED_EVENT.to_string(), |text| unescape_text(&text)),
    })
}

/// Decode RFC 5545 TEXT escapes: `\\`, `\;`, `\,` and `\n` (or `\N`)
fn unescape_text(value: &str) -> String {
    let mut decoded = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => decoded.push('\n'),
            Some(escaped) => decoded.push(escaped),
            None => decoded.push('\\'),
        }
    }
    decoded
}

/// `YYYYMMDD[THHMMSS[Z]]` to a date, dropping any time of day
fn parse_start_date(value: &str) -> Option<NaiveDate> {
    let day = value.trim().get(..8)?;
    NaiveDate::parse_from_str(day, "%Y%m%d").ok()
}

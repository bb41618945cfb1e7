//! Human-readable rendering of events and slots

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};

use super::{CalendarInfo, Event};

const DAY_AND_TIME: &str = "%A, %B %-d at %-I:%M %p";
const TIME: &str = "%-I:%M %p";

/// "Tuesday, March 10 at 2:00 PM - 3:00 PM"
///
/// The end carries its own date when the range crosses midnight.
pub fn display_range(zone: &Tz, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let start = start.with_timezone(zone);
    let end = end.with_timezone(zone);
    let end_format = if start.date_naive() == end.date_naive() {
        TIME
    } else {
        DAY_AND_TIME
    };
    format!("{} - {}", start.format(DAY_AND_TIME), end.format(end_format))
}

pub fn display_instant(zone: &Tz, instant: DateTime<Utc>) -> String {
    instant.with_timezone(zone).format(DAY_AND_TIME).to_string()
}

/// Numbered listing: title, time range, then location and id when known
pub fn event_list(zone: &Tz, events: &[Event]) -> String {
    events
        .iter()
        .enumerate()
        .map(|(i, event)| {
            let mut entry = format!(
                "{}. {}\n   {}",
                i + 1,
                event.summary,
                display_range(zone, event.start, event.end)
            );
            if let Some(location) = &event.location {
                entry.push_str(&format!("\n   Location: {location}"));
            }
            if let Some(id) = &event.id {
                entry.push_str(&format!("\n   ID: {id}"));
            }
            entry
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Multi-line detail view of a single event
pub fn event_details(zone: &Tz, event: &Event) -> String {
    let mut lines = vec![
        format!("📅 {}", event.summary),
        format!("When: {}", display_range(zone, event.start, event.end)),
    ];
    if let Some(location) = &event.location {
        lines.push(format!("Where: {location}"));
    }
    if let Some(description) = &event.description {
        lines.push(format!("Notes: {description}"));
    }
    if !event.attendees.is_empty() {
        lines.push(format!("Attendees: {}", event.attendees.join(", ")));
    }
    if let Some(id) = &event.id {
        lines.push(format!("Event ID: {id}"));
    }
    lines.join("\n")
}

pub fn calendar_list(calendars: &[CalendarInfo]) -> String {
    calendars
        .iter()
        .enumerate()
        .map(|(i, calendar)| {
            let marker = if calendar.primary { " (primary)" } else { "" };
            let mut entry = format!("{}. {}{marker}\n   ID: {}", i + 1, calendar.summary, calendar.id);
            if let Some(description) = &calendar.description {
                entry.push_str(&format!("\n   Description: {description}"));
            }
            entry.push_str(&format!("\n   Access: {}", calendar.access_role));
            entry
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A candidate time range as carried in structured task data
pub fn slot_value(zone: &Tz, start: DateTime<Utc>, end: DateTime<Utc>) -> Value {
    json!({
        "start": start.to_rfc3339(),
        "end": end.to_rfc3339(),
        "display": display_range(zone, start, end),
    })
}

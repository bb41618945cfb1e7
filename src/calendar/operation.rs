//! Typed projection of intent parameters
//!
//! Intent parameters are an untyped map written either by the model (tool
//! arguments) or by the keyword ladder. They are projected here into a
//! [`CalendarOperation`] before anything touches the backend, so a missing id
//! or a malformed time is rejected as invalid params up front.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use serde_json::{Map, Value};

use crate::{
    intent::{Intent, IntentKind, HELP_TEXT},
    protocol::error::{A2AError, A2AResult},
    time::{duration_from_minutes, localize, TimeParser, MAX_DURATION_MINUTES},
};

use super::Event;

/// Length of an event or slot when none is given
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// An explicit time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> A2AResult<Self> {
        if end <= start {
            return Err(A2AError::InvalidParams(
                "time range end must be after its start".into(),
            ));
        }
        Ok(Self { start, end })
    }
}

/// Fields to change on an existing event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventChanges {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub attendees: Option<Vec<String>>,
}

impl EventChanges {
    /// Merge onto a snapshot of the event
    ///
    /// Moving the start without giving an end keeps the original length.
    pub fn apply(&self, snapshot: &Event) -> A2AResult<Event> {
        let mut event = snapshot.clone();
        if let Some(summary) = &self.summary {
            event.summary = summary.clone();
        }
        if let Some(description) = &self.description {
            event.description = Some(description.clone());
        }
        if let Some(location) = &self.location {
            event.location = Some(location.clone());
        }
        if let Some(attendees) = &self.attendees {
            event.attendees = attendees.clone();
        }
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                event.start = start;
                event.end = end;
            }
            (Some(start), None) => {
                let length = snapshot.duration();
                event.start = start;
                event.end = start + length;
            }
            (None, Some(end)) => event.end = end,
            (None, None) => {}
        }

        if event.end <= event.start {
            return Err(A2AError::InvalidParams(
                "event end must be after its start".into(),
            ));
        }
        Ok(event)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What the executor will do, with every parameter checked
#[derive(Debug, Clone, PartialEq)]
pub enum CalendarOperation {
    ListCalendars,
    /// `None` means the window comes from the wording of the request
    ListEvents {
        window: Option<TimeWindow>,
    },
    CreateEvent {
        event: Event,
    },
    UpdateEvent {
        event_id: String,
        changes: EventChanges,
    },
    DeleteEvent {
        event_id: String,
    },
    GetEvent {
        event_id: String,
    },
    SearchEvents {
        query: String,
        window: Option<TimeWindow>,
    },
    GetAvailability {
        window: TimeWindow,
        duration: Duration,
    },
    Respond {
        kind: IntentKind,
        narration: String,
    },
}

impl CalendarOperation {
    /// Project an intent onto a checked operation
    ///
    /// `utterance` and `parser` supply times the parameters leave out: a create
    /// without a start looks for one in the text and otherwise lands on the next
    /// full hour.
    pub fn from_intent(
        intent: &Intent,
        utterance: &str,
        parser: &TimeParser,
        now: DateTime<Utc>,
    ) -> A2AResult<Self> {
        let params = Params {
            map: &intent.parameters,
            parser,
            now,
        };

        let operation = match intent.kind {
            IntentKind::ListCalendars => CalendarOperation::ListCalendars,
            IntentKind::ListEvents => CalendarOperation::ListEvents {
                window: params.window()?,
            },
            IntentKind::CreateEvent => CalendarOperation::CreateEvent {
                event: params.new_event(utterance)?,
            },
            IntentKind::UpdateEvent => CalendarOperation::UpdateEvent {
                event_id: params.event_id()?,
                changes: params.changes()?,
            },
            IntentKind::DeleteEvent => CalendarOperation::DeleteEvent {
                event_id: params.event_id()?,
            },
            IntentKind::GetEvent => CalendarOperation::GetEvent {
                event_id: params.event_id()?,
            },
            IntentKind::SearchEvents => CalendarOperation::SearchEvents {
                query: params
                    .string(&["query", "q"])
                    .ok_or_else(|| A2AError::InvalidParams("query is required".into()))?,
                window: params.window()?,
            },
            IntentKind::GetAvailability => {
                let start = params.time(&["start", "start_time", "startTime", "time_min"])?;
                let end = params.time(&["end", "end_time", "endTime", "time_max"])?;
                let (Some(start), Some(end)) = (start, end) else {
                    return Err(A2AError::InvalidParams("start and end are required".into()));
                };
                CalendarOperation::GetAvailability {
                    window: TimeWindow::new(start, end)?,
                    duration: params
                        .duration()?
                        .unwrap_or_else(|| Duration::minutes(DEFAULT_DURATION_MINUTES)),
                }
            }
            IntentKind::Help | IntentKind::Clarify => CalendarOperation::Respond {
                kind: intent.kind,
                narration: intent
                    .narration
                    .clone()
                    .unwrap_or_else(|| HELP_TEXT.to_string()),
            },
        };

        Ok(operation)
    }

    /// Name used in logs and calendar-service error data
    pub fn name(&self) -> &'static str {
        match self {
            CalendarOperation::ListCalendars => "list_calendars",
            CalendarOperation::ListEvents { .. } => "list_events",
            CalendarOperation::CreateEvent { .. } => "create_event",
            CalendarOperation::UpdateEvent { .. } => "update_event",
            CalendarOperation::DeleteEvent { .. } => "delete_event",
            CalendarOperation::GetEvent { .. } => "get_event",
            CalendarOperation::SearchEvents { .. } => "search_events",
            CalendarOperation::GetAvailability { .. } => "get_availability",
            CalendarOperation::Respond { .. } => "respond",
        }
    }

    /// Whether the operation changes the calendar
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            CalendarOperation::CreateEvent { .. }
                | CalendarOperation::UpdateEvent { .. }
                | CalendarOperation::DeleteEvent { .. }
        )
    }
}

/// The first instant on the hour strictly after `now`
pub fn next_full_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    truncated + Duration::hours(1)
}

struct Params<'a> {
    map: &'a Map<String, Value>,
    parser: &'a TimeParser,
    now: DateTime<Utc>,
}

impl Params<'_> {
    fn get(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.map.get(*key))
            .find(|value| !value.is_null())
    }

    fn string(&self, keys: &[&str]) -> Option<String> {
        match self.get(keys)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn event_id(&self) -> A2AResult<String> {
        self.string(&["event_id", "eventId", "id"])
            .ok_or_else(|| A2AError::InvalidParams("eventId is required".into()))
    }

    fn time(&self, keys: &[&str]) -> A2AResult<Option<DateTime<Utc>>> {
        let Some(value) = self.get(keys) else {
            return Ok(None);
        };
        let text = value.as_str().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(A2AError::InvalidParams(format!(
                "{} must be a time string",
                keys[0]
            )));
        }
        parse_instant(text, self.parser, self.now)
            .map(Some)
            .ok_or_else(|| A2AError::InvalidParams(format!("invalid {}: {text}", keys[0])))
    }

    fn duration(&self) -> A2AResult<Option<Duration>> {
        let Some(value) = self.get(&["duration_minutes", "durationMinutes", "duration"]) else {
            return Ok(None);
        };
        let minutes = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        minutes
            .map(f64::round)
            .filter(|m| m.is_finite())
            .and_then(|m| duration_from_minutes(m as i64))
            .map(Some)
            .ok_or_else(|| {
                A2AError::InvalidParams(format!(
                    "duration must be between 1 and {MAX_DURATION_MINUTES} minutes"
                ))
            })
    }

    fn attendees(&self) -> Option<Vec<String>> {
        let list = match self.get(&["attendees"])? {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(email) => Some(email.trim().to_string()),
                    Value::Object(obj) => obj.get("email").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .filter(|email| !email.is_empty())
                .collect(),
            Value::String(joined) => joined
                .split(',')
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty())
                .collect(),
            _ => return None,
        };
        Some(list)
    }

    fn window(&self) -> A2AResult<Option<TimeWindow>> {
        let start = self.time(&["time_min", "timeMin", "start"])?;
        let end = self.time(&["time_max", "timeMax", "end"])?;
        match (start, end) {
            (Some(start), Some(end)) => TimeWindow::new(start, end).map(Some),
            _ => Ok(None),
        }
    }

    fn new_event(&self, utterance: &str) -> A2AResult<Event> {
        let summary = self
            .string(&["title", "summary"])
            .unwrap_or_else(|| "Meeting".to_string());
        let start = match self.time(&["start_time", "startTime", "start"])? {
            Some(start) => start,
            None => self
                .parser
                .extract_start(utterance, self.now)
                .unwrap_or_else(|| next_full_hour(self.now)),
        };
        let end = match self.time(&["end_time", "endTime", "end"])? {
            Some(end) => end,
            None => {
                let duration = self
                    .duration()?
                    .unwrap_or_else(|| Duration::minutes(DEFAULT_DURATION_MINUTES));
                start.checked_add_signed(duration).ok_or_else(|| {
                    A2AError::InvalidParams("event end is out of range".into())
                })?
            }
        };
        if end <= start {
            return Err(A2AError::InvalidParams(
                "event end must be after its start".into(),
            ));
        }

        let mut event = Event::new(summary, start, end);
        event.description = self.string(&["description"]);
        event.location = self.string(&["location"]);
        event.attendees = self.attendees().unwrap_or_default();
        Ok(event)
    }

    fn changes(&self) -> A2AResult<EventChanges> {
        Ok(EventChanges {
            summary: self.string(&["title", "summary"]),
            description: self.string(&["description"]),
            location: self.string(&["location"]),
            start: self.time(&["start_time", "startTime", "start"])?,
            end: self.time(&["end_time", "endTime", "end"])?,
            attendees: self.attendees(),
        })
    }
}

/// Read an instant from a parameter string
///
/// RFC 3339 is expected; a timestamp without an offset is read in the parser's
/// zone, and as a last resort the text is treated as a relative expression.
fn parse_instant(text: &str, parser: &TimeParser, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(localize(parser.zone(), naive));
        }
    }
    parser.extract_start(text, now)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap()
    }

    fn project(kind: IntentKind, params: Value, utterance: &str) -> A2AResult<CalendarOperation> {
        let Value::Object(map) = params else {
            panic!("params must be an object");
        };
        let intent = Intent::new(kind, 0.95).with_parameters(map);
        CalendarOperation::from_intent(&intent, utterance, &TimeParser::new(Tz::UTC), now())
    }

    fn invalid_params(result: A2AResult<CalendarOperation>) -> String {
        match result {
            Err(A2AError::InvalidParams(msg)) => msg,
            other => panic!("Expected InvalidParams, got {:?}", other),
        }
    }

    #[test]
    fn test_event_id_required() {
        for kind in [
            IntentKind::UpdateEvent,
            IntentKind::DeleteEvent,
            IntentKind::GetEvent,
        ] {
            let msg = invalid_params(project(kind, json!({}), "do it"));
            assert_eq!(msg, "eventId is required");
        }

        let op = project(IntentKind::DeleteEvent, json!({"eventId": "e1"}), "").unwrap();
        assert_eq!(
            op,
            CalendarOperation::DeleteEvent {
                event_id: "e1".into()
            }
        );
    }

    #[test]
    fn test_create_from_tool_arguments() {
        let op = project(
            IntentKind::CreateEvent,
            json!({
                "summary": "Design review",
                "start_time": "2026-03-11T15:00:00-04:00",
                "duration_minutes": 30,
                "attendees": ["a@example.com", {"email": "b@example.com"}]
            }),
            "",
        )
        .unwrap();

        let CalendarOperation::CreateEvent { event } = op else {
            panic!("Expected CreateEvent");
        };
        assert_eq!(event.summary, "Design review");
        assert_eq!(event.start, Utc.with_ymd_and_hms(2026, 3, 11, 19, 0, 0).unwrap());
        assert_eq!(event.duration(), Duration::minutes(30));
        assert_eq!(event.attendees, vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_create_defaults() {
        let op = project(IntentKind::CreateEvent, json!({}), "new meeting please").unwrap();
        let CalendarOperation::CreateEvent { event } = op else {
            panic!("Expected CreateEvent");
        };
        assert_eq!(event.summary, "Meeting");
        assert_eq!(event.start, Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap());
        assert_eq!(event.duration(), Duration::hours(1));
    }

    #[test]
    fn test_create_start_from_text_when_missing() {
        let op = project(IntentKind::CreateEvent, json!({"title": "Sync"}), "sync at 4pm friday")
            .unwrap();
        let CalendarOperation::CreateEvent { event } = op else {
            panic!("Expected CreateEvent");
        };
        assert_eq!(event.start, Utc.with_ymd_and_hms(2026, 3, 13, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_bad_times_are_invalid_params() {
        let msg = invalid_params(project(
            IntentKind::CreateEvent,
            json!({"start_time": "the day after never"}),
            "",
        ));
        assert!(msg.starts_with("invalid start_time"));

        let msg = invalid_params(project(
            IntentKind::CreateEvent,
            json!({"start_time": "2026-03-10T10:00:00Z", "end_time": "2026-03-10T09:00:00Z"}),
            "",
        ));
        assert_eq!(msg, "event end must be after its start");

        invalid_params(project(
            IntentKind::CreateEvent,
            json!({"duration_minutes": -5}),
            "",
        ));
    }

    #[test]
    fn test_oversized_durations_are_invalid_params() {
        for minutes in [json!(5_999_999_999_940_i64), json!(1e300), json!(10_081)] {
            let msg = invalid_params(project(
                IntentKind::CreateEvent,
                json!({"start_time": "2026-03-10T10:00:00Z", "duration_minutes": minutes}),
                "",
            ));
            assert_eq!(msg, "duration must be between 1 and 10080 minutes");
        }

        invalid_params(project(
            IntentKind::GetAvailability,
            json!({
                "start": "2026-03-10T09:00:00Z",
                "end": "2026-03-10T17:00:00Z",
                "duration_minutes": "99999999999999"
            }),
            "",
        ));

        let op = project(
            IntentKind::CreateEvent,
            json!({"start_time": "2026-03-10T10:00:00Z", "duration_minutes": 10_080}),
            "",
        )
        .unwrap();
        let CalendarOperation::CreateEvent { event } = op else {
            panic!("Expected CreateEvent");
        };
        assert_eq!(event.duration(), Duration::days(7));
    }

    #[test]
    fn test_search_and_availability_requirements() {
        assert_eq!(
            invalid_params(project(IntentKind::SearchEvents, json!({}), "")),
            "query is required"
        );
        assert_eq!(
            invalid_params(project(
                IntentKind::GetAvailability,
                json!({"start": "2026-03-10T09:00:00Z"}),
                ""
            )),
            "start and end are required"
        );

        let op = project(
            IntentKind::GetAvailability,
            json!({"start": "2026-03-10T09:00:00Z", "end": "2026-03-10T17:00:00Z"}),
            "",
        )
        .unwrap();
        match op {
            CalendarOperation::GetAvailability { window, duration } => {
                assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap());
                assert_eq!(duration, Duration::minutes(60));
            }
            other => panic!("Expected GetAvailability, got {:?}", other),
        }
    }

    #[test]
    fn test_naive_times_use_zone() {
        let intent = Intent::new(IntentKind::ListEvents, 0.95).with_parameters(
            json!({"time_min": "2026-03-10T00:00:00", "time_max": "2026-03-11T00:00:00"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let parser = TimeParser::new(chrono_tz::Europe::Berlin);
        let op = CalendarOperation::from_intent(&intent, "", &parser, now()).unwrap();

        let CalendarOperation::ListEvents { window: Some(window) } = op else {
            panic!("Expected ListEvents with a window");
        };
        assert_eq!(window.start, Utc.with_ymd_and_hms(2026, 3, 9, 23, 0, 0).unwrap());
    }

    #[test]
    fn test_update_keeps_length_when_moving_start() {
        let snapshot = Event::new(
            "Standup",
            Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 10, 9, 15, 0).unwrap(),
        );
        let changes = EventChanges {
            start: Some(Utc.with_ymd_and_hms(2026, 3, 10, 16, 0, 0).unwrap()),
            location: Some("Room 2".into()),
            ..EventChanges::default()
        };

        let merged = changes.apply(&snapshot).unwrap();
        assert_eq!(merged.summary, "Standup");
        assert_eq!(merged.duration(), Duration::minutes(15));
        assert_eq!(merged.location.as_deref(), Some("Room 2"));
        assert!(!changes.is_empty());
        assert!(EventChanges::default().is_empty());
    }

    #[test]
    fn test_conversational_intents() {
        let intent = Intent::conversational(IntentKind::Clarify, "Which day?", 0.9);
        let op = CalendarOperation::from_intent(&intent, "", &TimeParser::default(), now()).unwrap();
        assert_eq!(
            op,
            CalendarOperation::Respond {
                kind: IntentKind::Clarify,
                narration: "Which day?".into()
            }
        );
        assert!(!op.is_write());
    }

    #[test]
    fn test_next_full_hour() {
        assert_eq!(
            next_full_hour(now()),
            Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap()
        );
    }
}

//! Keyword ladder classification
//!
//! Rungs are tried top to bottom and the first match wins. A keyword matches
//! wherever it appears in the lowercased text, so inflections such as
//! "booking" or "added" still carry their verb.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use super::{Intent, IntentKind, HELP_TEXT, LOW_CONFIDENCE};
use crate::time::{extract_duration_minutes, SharedClock, TimeParser};

const LIST_CALENDARS: &[&str] = &[
    "list calendar",
    "show calendar",
    "what calendar",
    "which calendar",
    "available calendar",
    "calendar id",
    "calendars",
    "discover calendar",
];

const LIST_EVENTS: &[&str] = &[
    "show my",
    "list my",
    "what's on",
    "view my",
    "see my",
    "my events",
    "my meetings",
    "my calendar",
    "my appointments",
    "show me",
    "tell me about",
    "what do i have",
];

const TEMPORAL: &[&str] = &["today", "tomorrow", "this week", "next week"];

const CREATE_VERBS: &[&str] = &[
    "schedule",
    "create",
    "book",
    "add",
    "meeting with",
    "appointment with",
];

const UPDATE: &[&str] = &["move", "change", "update", "reschedule", "modify", "edit"];

const DELETE: &[&str] = &["cancel", "delete", "remove"];

const CREATE: &[&str] = &[
    "schedule a",
    "schedule an",
    "schedule meeting",
    "schedule appointment",
    "create",
    "book",
    "add",
    "new meeting",
    "new appointment",
    "meeting with",
    "appointment with",
    "lunch with",
    "dinner with",
];

fn quoted_title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)\b(?:event|meeting|appointment|schedule|create|book|add)s?\b[^"“”]*["“]([^"“”]+)["”]"#,
        )
        .expect("quoted title regex must compile")
    })
}

fn with_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:meeting|appointment|lunch|dinner|call|coffee|sync)\s+with\s+(.+?)(?:\s+(?:at|on|from|for|about|to|in|by|today|tomorrow|next|this)\b|[,.!?;]|$)",
        )
        .expect("with-name regex must compile")
    })
}

fn event_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bevent\s+(?:id\s*[:=]?\s*)?([a-z0-9_]{5,})\b")
            .expect("event id regex must compile")
    })
}

/// Deterministic classifier used when the language model is off or unsure
#[derive(Clone)]
pub struct PatternStrategy {
    parser: TimeParser,
    clock: SharedClock,
}

impl PatternStrategy {
    pub fn new(parser: TimeParser, clock: SharedClock) -> Self {
        Self { parser, clock }
    }

    /// Classify an utterance; the kind depends only on the lowercased text
    pub fn resolve(&self, utterance: &str) -> Intent {
        let kind = classify(utterance);
        match kind {
            IntentKind::CreateEvent => {
                Intent::new(kind, 0.8).with_parameters(self.create_parameters(utterance))
            }
            IntentKind::UpdateEvent => {
                Intent::new(kind, 0.7).with_parameters(self.update_parameters(utterance))
            }
            IntentKind::DeleteEvent => {
                Intent::new(kind, 0.7).with_parameters(event_id_parameter(utterance))
            }
            IntentKind::ListCalendars => Intent::new(kind, 0.9),
            IntentKind::ListEvents => Intent::new(kind, 0.8),
            _ => Intent::conversational(IntentKind::Help, HELP_TEXT, LOW_CONFIDENCE),
        }
    }

    fn create_parameters(&self, utterance: &str) -> Map<String, Value> {
        let mut parameters = Map::new();
        parameters.insert("title".into(), json!(extract_title(utterance)));

        if let Some(start) = self.parser.extract_start(utterance, self.clock.now()) {
            parameters.insert("start_time".into(), json!(start.to_rfc3339()));
        }
        if let Some(minutes) = extract_duration_minutes(utterance) {
            parameters.insert("duration_minutes".into(), json!(minutes));
        }
        parameters
    }

    fn update_parameters(&self, utterance: &str) -> Map<String, Value> {
        let mut parameters = event_id_parameter(utterance);
        if let Some(start) = self.parser.extract_start(utterance, self.clock.now()) {
            parameters.insert("start_time".into(), json!(start.to_rfc3339()));
        }
        parameters
    }
}

/// Walk the keyword ladder
pub fn classify(utterance: &str) -> IntentKind {
    let text = utterance.trim().to_lowercase();
    let any = |phrases: &[&str]| phrases.iter().any(|p| text.contains(p));

    if any(LIST_CALENDARS) {
        return IntentKind::ListCalendars;
    }
    if any(LIST_EVENTS) || (any(TEMPORAL) && !any(CREATE_VERBS)) {
        return IntentKind::ListEvents;
    }
    if any(UPDATE) {
        return IntentKind::UpdateEvent;
    }
    if any(DELETE) {
        return IntentKind::DeleteEvent;
    }
    if any(CREATE) {
        return IntentKind::CreateEvent;
    }
    IntentKind::Help
}

/// Pick an event title out of a create request
///
/// A quoted span after an event keyword wins, then "Meeting with NAME", then a
/// generic title named after the keyword present.
pub fn extract_title(utterance: &str) -> String {
    if let Some(caps) = quoted_title_regex().captures(utterance) {
        let title = caps[1].trim();
        if !title.is_empty() {
            return title.to_string();
        }
    }

    if let Some(caps) = with_name_regex().captures(utterance) {
        let name = caps[1].trim();
        if !name.is_empty() {
            return format!("Meeting with {name}");
        }
    }

    let lower = utterance.to_lowercase();
    if lower.contains("meeting") {
        "Meeting".to_string()
    } else if lower.contains("appointment") {
        "Appointment".to_string()
    } else {
        "Event".to_string()
    }
}

fn event_id_parameter(utterance: &str) -> Map<String, Value> {
    let mut parameters = Map::new();
    let id = event_id_regex()
        .captures_iter(utterance)
        .map(|caps| caps[1].to_string())
        .find(|candidate| candidate.chars().any(|c| c.is_ascii_digit()));
    if let Some(id) = id {
        parameters.insert("event_id".into(), json!(id));
    }
    parameters
}

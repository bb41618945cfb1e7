//! Calendar domain: events, the backend capability and the executor
//!
//! [`CalendarBackend`] is the seam to the calendar provider. The Google
//! Calendar implementation lives in [`google`], an in-memory one for demos in
//! [`demo`]. [`executor::CalendarExecutor`] runs resolved intents against
//! whichever backend is configured.

pub mod auth;
pub mod demo;
pub mod executor;
pub mod format;
pub mod google;
pub mod operation;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use demo::DemoCalendarBackend;
pub use executor::{CalendarExecutor, ExecutionResult};
pub use google::GoogleCalendarBackend;
pub use operation::CalendarOperation;

/// Failures reported by a calendar backend
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("calendar api returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode calendar response: {0}")]
    Decode(String),

    #[error("event not found: {0}")]
    NotFound(String),

    #[error("calendar authorization failed: {0}")]
    Auth(String),

    #[error("invalid calendar credentials: {0}")]
    Credentials(String),
}

/// Event status as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Confirmed => "confirmed",
            EventStatus::Tentative => "tentative",
            EventStatus::Cancelled => "cancelled",
        }
    }

    /// Unknown statuses are treated as confirmed
    pub fn from_wire(status: &str) -> Self {
        match status {
            "tentative" => EventStatus::Tentative,
            "cancelled" => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        }
    }
}

/// A calendar event
///
/// `end` is always after `start`; backends skip records that violate this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub status: EventStatus,
}

impl Event {
    pub fn new(summary: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: None,
            summary: summary.into(),
            description: None,
            location: None,
            start,
            end,
            attendees: Vec::new(),
            status: EventStatus::Confirmed,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_attendees(mut self, attendees: Vec<String>) -> Self {
        self.attendees = attendees;
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Half-open overlap: touching intervals do not overlap
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && self.start < end
    }

    /// Whether this event stands in the way of a new one at `[start, end)`
    pub fn blocks(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        !self.is_cancelled() && self.overlaps(start, end)
    }
}

/// A calendar visible to the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarInfo {
    pub id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub access_role: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl CalendarInfo {
    pub fn new(
        id: impl Into<String>,
        summary: impl Into<String>,
        access_role: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            description: None,
            access_role: access_role.into(),
            primary: false,
            time_zone: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// Calendar provider capability
///
/// All instants are UTC on this interface; providers convert to and from
/// RFC 3339 on the wire.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<Event>, CalendarError>;

    async fn create_event(&self, calendar_id: &str, event: &Event) -> Result<Event, CalendarError>;

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> Result<Event, CalendarError>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError>;

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Event, CalendarError>;

    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, CalendarError>;

    /// Events that block a new event at `[start, end)`
    ///
    /// Cancelled events never block.
    async fn check_conflicts(
        &self,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, CalendarError> {
        let events = self.list_events(calendar_id, start, end).await?;
        Ok(events.into_iter().filter(|e| e.blocks(start, end)).collect())
    }
}

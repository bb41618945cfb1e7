//! Google Calendar v3 REST backend

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::{auth::TokenSource, CalendarBackend, CalendarError, CalendarInfo, Event, EventStatus};
use crate::time::start_of_day;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
const PAGE_SIZE: &str = "250";

/// Start or end of an event on the wire
///
/// Timed events carry `dateTime`; all-day events carry only `date`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
}

/// Event resource as exchanged with the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl GoogleEvent {
    pub fn from_event(event: &Event, zone: &Tz) -> Self {
        let time = |instant: DateTime<Utc>| EventTime {
            date_time: Some(instant.with_timezone(zone).to_rfc3339()),
            date: None,
            time_zone: Some(zone.name().to_string()),
        };
        Self {
            id: event.id.clone(),
            summary: Some(event.summary.clone()),
            description: event.description.clone(),
            location: event.location.clone(),
            start: time(event.start),
            end: time(event.end),
            attendees: event
                .attendees
                .iter()
                .map(|email| Attendee {
                    email: email.clone(),
                })
                .collect(),
            status: Some(event.status.as_str().to_string()),
        }
    }

    /// Convert to the domain event; all-day bounds become midnight in `zone`
    pub fn into_event(self, zone: &Tz) -> Result<Event, CalendarError> {
        let start = parse_event_time(&self.start, zone)?;
        let end = parse_event_time(&self.end, zone)?;
        if end <= start {
            return Err(CalendarError::Decode(format!(
                "event {} ends before it starts",
                self.id.as_deref().unwrap_or("<unknown>")
            )));
        }

        Ok(Event {
            id: self.id,
            summary: self.summary.unwrap_or_else(|| "(no title)".to_string()),
            description: self.description,
            location: self.location,
            start,
            end,
            attendees: self.attendees.into_iter().map(|a| a.email).collect(),
            status: self
                .status
                .as_deref()
                .map(EventStatus::from_wire)
                .unwrap_or_default(),
        })
    }
}

fn parse_event_time(time: &EventTime, zone: &Tz) -> Result<DateTime<Utc>, CalendarError> {
    if let Some(date_time) = &time.date_time {
        return DateTime::parse_from_rfc3339(date_time)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CalendarError::Decode(format!("bad dateTime {date_time:?}: {e}")));
    }
    if let Some(date) = &time.date {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| CalendarError::Decode(format!("bad date {date:?}: {e}")))?;
        return Ok(start_of_day(zone, date));
    }
    Err(CalendarError::Decode("event time has neither dateTime nor date".into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<Value>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    access_role: Option<String>,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    time_zone: Option<String>,
}

impl From<CalendarListEntry> for CalendarInfo {
    fn from(entry: CalendarListEntry) -> Self {
        CalendarInfo {
            summary: entry.summary.unwrap_or_else(|| entry.id.clone()),
            id: entry.id,
            description: entry.description,
            access_role: entry.access_role.unwrap_or_else(|| "reader".to_string()),
            primary: entry.primary,
            time_zone: entry.time_zone,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListPage {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

/// Calendar backend talking to the Google Calendar API
pub struct GoogleCalendarBackend {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
    zone: Tz,
}

impl GoogleCalendarBackend {
    pub fn new(http: reqwest::Client, tokens: Arc<dyn TokenSource>, zone: Tz) -> Result<Self, CalendarError> {
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| CalendarError::Decode(format!("invalid base url: {e}")))?;
        Ok(Self::with_base_url(http, tokens, zone, base_url))
    }

    pub fn with_base_url(http: reqwest::Client, tokens: Arc<dyn TokenSource>, zone: Tz, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            tokens,
            zone,
        }
    }

    /// Base URL with `segments` appended, each percent-encoded
    pub fn url(&self, segments: &[&str]) -> Result<Url, CalendarError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CalendarError::Decode("base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, CalendarError> {
        let token = self.tokens.access_token().await?;
        debug!(%method, %url, "calendar api request");
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, CalendarError> {
        response
            .json::<T>()
            .await
            .map_err(|e| CalendarError::Decode(e.to_string()))
    }

    fn into_event(&self, value: Value) -> Result<Event, CalendarError> {
        let wire: GoogleEvent =
            serde_json::from_value(value).map_err(|e| CalendarError::Decode(e.to_string()))?;
        wire.into_event(&self.zone)
    }
}

/// Map non-success statuses onto backend errors
async fn check_status(response: Response, resource: &str) -> Result<Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => CalendarError::NotFound(resource.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CalendarError::Auth(format!("{status}: {body}"))
        }
        _ => CalendarError::Status {
            status: status.as_u16(),
            body,
        },
    })
}

#[async_trait]
impl CalendarBackend for GoogleCalendarBackend {
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<Event>, CalendarError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url(&["calendars", calendar_id, "events"])?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("timeMin", &time_min.to_rfc3339())
                    .append_pair("timeMax", &time_max.to_rfc3339())
                    .append_pair("singleEvents", "true")
                    .append_pair("orderBy", "startTime")
                    .append_pair("maxResults", PAGE_SIZE);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = self.request(Method::GET, url).await?.send().await?;
            let page: EventsPage = Self::decode(check_status(response, calendar_id).await?).await?;

            for item in page.items {
                match self.into_event(item) {
                    Ok(event) => events.push(event),
                    Err(error) => warn!(calendar_id, error = %error, "skipping unreadable event"),
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }

    async fn create_event(&self, calendar_id: &str, event: &Event) -> Result<Event, CalendarError> {
        let url = self.url(&["calendars", calendar_id, "events"])?;
        let mut body = GoogleEvent::from_event(event, &self.zone);
        body.id = None;

        let response = self
            .request(Method::POST, url)
            .await?
            .json(&body)
            .send()
            .await?;
        let value: Value = Self::decode(check_status(response, calendar_id).await?).await?;
        self.into_event(value)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> Result<Event, CalendarError> {
        let url = self.url(&["calendars", calendar_id, "events", event_id])?;
        let body = GoogleEvent::from_event(event, &self.zone);

        let response = self
            .request(Method::PUT, url)
            .await?
            .json(&body)
            .send()
            .await?;
        let value: Value = Self::decode(check_status(response, event_id).await?).await?;
        self.into_event(value)
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        let url = self.url(&["calendars", calendar_id, "events", event_id])?;
        let response = self.request(Method::DELETE, url).await?.send().await?;

        // Already deleted
        if response.status() == StatusCode::GONE {
            debug!(event_id, "event already gone");
            return Ok(());
        }
        check_status(response, event_id).await?;
        Ok(())
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<Event, CalendarError> {
        let url = self.url(&["calendars", calendar_id, "events", event_id])?;
        let response = self.request(Method::GET, url).await?.send().await?;
        let value: Value = Self::decode(check_status(response, event_id).await?).await?;
        self.into_event(value)
    }

    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, CalendarError> {
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url(&["users", "me", "calendarList"])?;
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let response = self.request(Method::GET, url).await?.send().await?;
            let page: CalendarListPage =
                Self::decode(check_status(response, "calendarList").await?).await?;
            calendars.extend(page.items.into_iter().map(CalendarInfo::from));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(calendars)
    }
}

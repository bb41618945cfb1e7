//! In-memory calendar used in demo mode

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{CalendarBackend, CalendarError, CalendarInfo, Event, EventStatus};
use crate::time::{local_date, localize};

const TEAM_CALENDAR: &str = "team@demo.local";

/// Calendar backend that keeps events in memory
///
/// Every calendar id shares the same event list; the calendar list is fixed.
pub struct DemoCalendarBackend {
    events: RwLock<Vec<Event>>,
    calendars: Vec<CalendarInfo>,
}

impl Default for DemoCalendarBackend {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DemoCalendarBackend {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: RwLock::new(events),
            calendars: vec![
                CalendarInfo::new("primary", "Demo Calendar", "owner")
                    .with_description("In-memory calendar for demos")
                    .primary(),
                CalendarInfo::new(TEAM_CALENDAR, "Team Calendar", "reader")
                    .with_description("Shared team events"),
            ],
        }
    }

    /// A backend with a few sample events around `now`
    pub fn seeded(zone: Tz, now: DateTime<Utc>) -> Self {
        let today = local_date(&zone, now);
        let tomorrow = today + Duration::days(1);
        let at = |date: chrono::NaiveDate, h: u32, m: u32| {
            localize(
                &zone,
                date.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)),
            )
        };

        Self::new(vec![
            Event::new("Daily standup", at(today, 9, 0), at(today, 9, 30))
                .with_id("demo_standup1")
                .with_location("Video call"),
            Event::new("Design review", at(today, 14, 0), at(today, 15, 0))
                .with_id("demo_review1")
                .with_description("Walk through the new scheduling flow")
                .with_attendees(vec!["alex@demo.local".into(), "sam@demo.local".into()]),
            Event::new("1:1 with manager", at(tomorrow, 11, 0), at(tomorrow, 11, 30))
                .with_id("demo_oneonone1"),
            Event::new("Retired sync", at(tomorrow, 15, 0), at(tomorrow, 16, 0))
                .with_id("demo_retired1")
                .with_status(EventStatus::Cancelled),
        ])
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

fn new_id() -> String {
    format!("demo{}", Uuid::new_v4().simple())
}

#[async_trait]
impl CalendarBackend for DemoCalendarBackend {
    async fn list_events(
        &self,
        _calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<Event>, CalendarError> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .await
            .iter()
            .filter(|e| e.overlaps(time_min, time_max))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    async fn create_event(&self, _calendar_id: &str, event: &Event) -> Result<Event, CalendarError> {
        let created = event.clone().with_id(new_id());
        debug!(event_id = ?created.id, "demo event created");
        self.events.write().await.push(created.clone());
        Ok(created)
    }

    async fn update_event(
        &self,
        _calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> Result<Event, CalendarError> {
        let mut events = self.events.write().await;
        let slot = events
            .iter_mut()
            .find(|e| e.id.as_deref() == Some(event_id))
            .ok_or_else(|| CalendarError::NotFound(event_id.to_string()))?;
        *slot = event.clone().with_id(event_id);
        Ok(slot.clone())
    }

    async fn delete_event(&self, _calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| e.id.as_deref() != Some(event_id));
        if events.len() == before {
            return Err(CalendarError::NotFound(event_id.to_string()));
        }
        Ok(())
    }

    async fn get_event(&self, _calendar_id: &str, event_id: &str) -> Result<Event, CalendarError> {
        self.events
            .read()
            .await
            .iter()
            .find(|e| e.id.as_deref() == Some(event_id))
            .cloned()
            .ok_or_else(|| CalendarError::NotFound(event_id.to_string()))
    }

    async fn list_calendars(&self) -> Result<Vec<CalendarInfo>, CalendarError> {
        Ok(self.calendars.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_seeded_events() {
        let backend = DemoCalendarBackend::seeded(Tz::UTC, now());
        assert_eq!(backend.len().await, 4);

        let today = backend
            .list_events("primary", now(), now() + Duration::hours(16))
            .await
            .unwrap();
        let titles: Vec<_> = today.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(titles, vec!["Daily standup", "Design review"]);
    }

    #[tokio::test]
    async fn test_conflict_check_skips_cancelled() {
        let backend = DemoCalendarBackend::seeded(Tz::UTC, now());
        let tomorrow_3pm = Utc.with_ymd_and_hms(2026, 3, 11, 15, 0, 0).unwrap();

        let conflicts = backend
            .check_conflicts("primary", tomorrow_3pm, tomorrow_3pm + Duration::hours(1))
            .await
            .unwrap();
        assert!(conflicts.is_empty());

        let review = Utc.with_ymd_and_hms(2026, 3, 10, 14, 30, 0).unwrap();
        let conflicts = backend
            .check_conflicts("primary", review, review + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].summary, "Design review");
    }

    #[tokio::test]
    async fn test_adjacent_events_do_not_conflict() {
        let backend = DemoCalendarBackend::seeded(Tz::UTC, now());
        let three = Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap();
        let conflicts = backend
            .check_conflicts("primary", three, three + Duration::hours(1))
            .await
            .unwrap();
        assert!(conflicts.is_empty());
    }

    #[tokio::test]
    async fn test_crud_cycle() {
        let backend = DemoCalendarBackend::default();
        assert!(backend.is_empty().await);

        let start = now() + Duration::hours(2);
        let created = backend
            .create_event("primary", &Event::new("Focus", start, start + Duration::hours(1)))
            .await
            .unwrap();
        let id = created.id.clone().unwrap();
        assert!(id.starts_with("demo"));

        let moved = created.clone().with_location("Library");
        let updated = assert_ok!(backend.update_event("primary", &id, &moved).await);
        assert_eq!(updated.location.as_deref(), Some("Library"));
        assert_eq!(backend.get_event("primary", &id).await.unwrap(), updated);

        assert_ok!(backend.delete_event("primary", &id).await);
        let missing = assert_err!(backend.get_event("primary", &id).await);
        assert!(matches!(missing, CalendarError::NotFound(_)));
        assert_err!(backend.delete_event("primary", &id).await);
    }

    #[tokio::test]
    async fn test_calendars() {
        let calendars = DemoCalendarBackend::default().list_calendars().await.unwrap();
        assert_eq!(calendars.len(), 2);
        assert!(calendars[0].primary);
        assert_eq!(calendars[1].access_role, "reader");
    }
}

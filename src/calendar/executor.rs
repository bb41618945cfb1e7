//! Runs resolved intents against a calendar backend

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Datelike, Duration, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{
    format::{calendar_list, display_range, event_details, event_list, slot_value},
    operation::{CalendarOperation, EventChanges, TimeWindow},
    CalendarBackend, CalendarError, CalendarInfo, Event,
};
use crate::{
    intent::Intent,
    protocol::error::{A2AError, A2AResult},
    service::RequestContext,
    time::{local_date, start_of_day, SharedClock, TimeParser},
};

const READ_ONLY_MESSAGE: &str = "calendar is in read-only mode";

/// Narration plus an optional structured payload for the task artifact
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub text: String,
    pub data: Option<Value>,
}

impl ExecutionResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Carries out calendar intents
///
/// Holds the backend and the read-only configuration fragments it needs. One
/// instance is shared by all in-flight requests.
pub struct CalendarExecutor {
    backend: Arc<dyn CalendarBackend>,
    calendar_id: String,
    read_only: bool,
    parser: TimeParser,
    clock: SharedClock,
}

impl CalendarExecutor {
    pub fn new(
        backend: Arc<dyn CalendarBackend>,
        calendar_id: impl Into<String>,
        read_only: bool,
        parser: TimeParser,
        clock: SharedClock,
    ) -> Self {
        Self {
            backend,
            calendar_id: calendar_id.into(),
            read_only,
            parser,
            clock,
        }
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn zone(&self) -> &Tz {
        self.parser.zone()
    }

    /// Execute one intent
    ///
    /// Parameter problems come back as `InvalidParams`; backend failures as a
    /// calendar-service error carrying the operation name.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        intent: &Intent,
        utterance: &str,
    ) -> A2AResult<ExecutionResult> {
        let now = self.clock.now();
        let operation = CalendarOperation::from_intent(intent, utterance, &self.parser, now)?;

        info!(
            request_id = %ctx.request_id,
            operation = operation.name(),
            calendar_id = %self.calendar_id,
            "executing calendar operation"
        );

        if self.read_only && operation.is_write() {
            warn!(operation = operation.name(), "write rejected in read-only mode");
            return Err(A2AError::calendar_service(
                operation.name(),
                &self.calendar_id,
                READ_ONLY_MESSAGE,
            ));
        }

        match operation {
            CalendarOperation::ListCalendars => self.list_calendars(ctx, now).await,
            CalendarOperation::ListEvents { window } => {
                let (window, label) = match window {
                    Some(window) => {
                        let label = display_range(self.zone(), window.start, window.end);
                        (window, label)
                    }
                    None => self.window_from_text(utterance, now),
                };
                self.list_events(ctx, window, &label).await
            }
            CalendarOperation::CreateEvent { event } => self.create_event(ctx, event).await,
            CalendarOperation::UpdateEvent { event_id, changes } => {
                self.update_event(ctx, &event_id, &changes).await
            }
            CalendarOperation::DeleteEvent { event_id } => self.delete_event(ctx, &event_id).await,
            CalendarOperation::GetEvent { event_id } => self.get_event(ctx, &event_id).await,
            CalendarOperation::SearchEvents { query, window } => {
                let window = window.unwrap_or(TimeWindow {
                    start: now - Duration::days(30),
                    end: now + Duration::days(90),
                });
                self.search_events(ctx, &query, window).await
            }
            CalendarOperation::GetAvailability { window, duration } => {
                self.availability(ctx, window, duration).await
            }
            CalendarOperation::Respond { narration, .. } => Ok(ExecutionResult::text(narration)),
        }
    }

    /// Run a backend call under the request deadline
    async fn call<T, F>(&self, ctx: &RequestContext, operation: &str, fut: F) -> A2AResult<T>
    where
        F: Future<Output = Result<T, CalendarError>>,
    {
        ctx.within(fut).await?.map_err(|error| {
            warn!(
                operation,
                calendar_id = %self.calendar_id,
                error = %error,
                "calendar backend call failed"
            );
            A2AError::calendar_service(operation, &self.calendar_id, error.to_string())
        })
    }

    async fn list_calendars(
        &self,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) -> A2AResult<ExecutionResult> {
        let mut calendars = self
            .call(ctx, "list_calendars", self.backend.list_calendars())
            .await?;

        let listed = calendars.iter().any(|c| {
            c.id == self.calendar_id || (self.calendar_id == "primary" && c.primary)
        });
        if !listed {
            let probe = self
                .backend
                .list_events(&self.calendar_id, now - Duration::days(1), now + Duration::days(1));
            match ctx.within(probe).await? {
                Ok(_) => calendars.push(
                    CalendarInfo::new(&self.calendar_id, &self.calendar_id, "shared")
                        .with_description("Configured calendar shared with this agent"),
                ),
                Err(error) => warn!(
                    calendar_id = %self.calendar_id,
                    error = %error,
                    "configured calendar is not accessible"
                ),
            }
        }

        let text = if calendars.is_empty() {
            "No calendars are accessible to this agent.".to_string()
        } else {
            format!(
                "📚 Available calendars ({}):\n\n{}",
                calendars.len(),
                calendar_list(&calendars)
            )
        };

        Ok(ExecutionResult::text(text).with_data(json!({ "calendars": calendars })))
    }

    /// Window named by the wording of a list request
    fn window_from_text(&self, utterance: &str, now: DateTime<Utc>) -> (TimeWindow, String) {
        let text = utterance.to_lowercase();
        let zone = self.zone();
        let today = local_date(zone, now);
        let midnight = start_of_day(zone, today);
        let sunday = start_of_day(
            zone,
            today - Duration::days(today.weekday().num_days_from_sunday() as i64),
        );

        let (start, end, label) = if text.contains("tomorrow") {
            (
                midnight + Duration::hours(24),
                midnight + Duration::hours(48),
                "tomorrow",
            )
        } else if text.contains("today") {
            (midnight, midnight + Duration::hours(24), "today")
        } else if text.contains("next week") {
            (
                sunday + Duration::days(7),
                sunday + Duration::days(14),
                "next week",
            )
        } else if text.contains("this week") {
            (sunday, sunday + Duration::days(7), "this week")
        } else {
            (now, now + Duration::days(7), "the next 7 days")
        };

        (TimeWindow { start, end }, label.to_string())
    }

    async fn list_events(
        &self,
        ctx: &RequestContext,
        window: TimeWindow,
        label: &str,
    ) -> A2AResult<ExecutionResult> {
        let mut events = self
            .call(
                ctx,
                "list_events",
                self.backend
                    .list_events(&self.calendar_id, window.start, window.end),
            )
            .await?;
        events.sort_by_key(|e| e.start);

        let text = if events.is_empty() {
            format!("📅 No events found for {label}.")
        } else {
            format!(
                "📅 Events for {label} ({}):\n\n{}",
                events.len(),
                event_list(self.zone(), &events)
            )
        };

        Ok(ExecutionResult::text(text).with_data(json!({
            "events": events,
            "time_min": window.start.to_rfc3339(),
            "time_max": window.end.to_rfc3339(),
        })))
    }

    async fn create_event(&self, ctx: &RequestContext, event: Event) -> A2AResult<ExecutionResult> {
        let (start, end) = (event.start, event.end);

        let conflicts: Vec<Event> = self
            .call(
                ctx,
                "check_conflicts",
                self.backend.check_conflicts(&self.calendar_id, start, end),
            )
            .await?
            .into_iter()
            .filter(|existing| existing.blocks(start, end))
            .collect();

        if !conflicts.is_empty() {
            info!(
                calendar_id = %self.calendar_id,
                conflicts = conflicts.len(),
                "create skipped, proposing alternatives"
            );
            return Ok(self.conflict_result(&event, &conflicts));
        }

        let created = self
            .call(
                ctx,
                "create_event",
                self.backend.create_event(&self.calendar_id, &event),
            )
            .await?;
        debug!(event_id = ?created.id, "event created");

        Ok(ExecutionResult::text(format!(
            "✅ Event created successfully\n\n{}",
            event_details(self.zone(), &created)
        ))
        .with_data(json!({ "event": created })))
    }

    fn conflict_result(&self, proposed: &Event, conflicts: &[Event]) -> ExecutionResult {
        let zone = self.zone();
        let alternatives = alternative_windows(proposed.start, proposed.end);

        let mut text = format!(
            "⚠️ \"{}\" at {} conflicts with {} existing event{}:\n\n{}\n\nAlternative times:",
            proposed.summary,
            display_range(zone, proposed.start, proposed.end),
            conflicts.len(),
            if conflicts.len() == 1 { "" } else { "s" },
            event_list(zone, conflicts),
        );
        for (i, window) in alternatives.iter().enumerate() {
            text.push_str(&format!(
                "\n{}. {}",
                i + 1,
                display_range(zone, window.start, window.end)
            ));
        }
        text.push_str("\n\nReply with one of these times and I will book it.");

        let alternative_times: Vec<Value> = alternatives
            .iter()
            .map(|window| slot_value(zone, window.start, window.end))
            .collect();

        ExecutionResult::text(text).with_data(json!({
            "conflicts": conflicts,
            "alternative_times": alternative_times,
            "proposed_event": proposed,
        }))
    }

    async fn update_event(
        &self,
        ctx: &RequestContext,
        event_id: &str,
        changes: &EventChanges,
    ) -> A2AResult<ExecutionResult> {
        if changes.is_empty() {
            return Err(A2AError::InvalidParams(format!(
                "no changes given for event {event_id}"
            )));
        }

        let snapshot = self
            .call(
                ctx,
                "update_event",
                self.backend.get_event(&self.calendar_id, event_id),
            )
            .await?;
        let merged = changes.apply(&snapshot)?;
        let updated = self
            .call(
                ctx,
                "update_event",
                self.backend
                    .update_event(&self.calendar_id, event_id, &merged),
            )
            .await?;

        Ok(ExecutionResult::text(format!(
            "✏️ Event updated successfully\n\n{}",
            event_details(self.zone(), &updated)
        ))
        .with_data(json!({ "event": updated })))
    }

    async fn delete_event(&self, ctx: &RequestContext, event_id: &str) -> A2AResult<ExecutionResult> {
        self.call(
            ctx,
            "delete_event",
            self.backend.delete_event(&self.calendar_id, event_id),
        )
        .await?;

        Ok(ExecutionResult::text(format!("🗑️ Event {event_id} was deleted."))
            .with_data(json!({ "event_id": event_id, "deleted": true })))
    }

    async fn get_event(&self, ctx: &RequestContext, event_id: &str) -> A2AResult<ExecutionResult> {
        let event = self
            .call(
                ctx,
                "get_event",
                self.backend.get_event(&self.calendar_id, event_id),
            )
            .await?;

        Ok(ExecutionResult::text(event_details(self.zone(), &event))
            .with_data(json!({ "event": event })))
    }

    async fn search_events(
        &self,
        ctx: &RequestContext,
        query: &str,
        window: TimeWindow,
    ) -> A2AResult<ExecutionResult> {
        let needle = query.to_lowercase();
        let mut matches: Vec<Event> = self
            .call(
                ctx,
                "search_events",
                self.backend
                    .list_events(&self.calendar_id, window.start, window.end),
            )
            .await?
            .into_iter()
            .filter(|event| {
                event.summary.to_lowercase().contains(&needle)
                    || event
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .collect();
        matches.sort_by_key(|e| e.start);

        let text = if matches.is_empty() {
            format!("🔍 No events matching \"{query}\".")
        } else {
            format!(
                "🔍 Found {} event{} matching \"{query}\":\n\n{}",
                matches.len(),
                if matches.len() == 1 { "" } else { "s" },
                event_list(self.zone(), &matches)
            )
        };

        Ok(ExecutionResult::text(text).with_data(json!({ "query": query, "events": matches })))
    }

    async fn availability(
        &self,
        ctx: &RequestContext,
        window: TimeWindow,
        duration: Duration,
    ) -> A2AResult<ExecutionResult> {
        let events = self
            .call(
                ctx,
                "get_availability",
                self.backend
                    .list_events(&self.calendar_id, window.start, window.end),
            )
            .await?;
        let slots = free_slots(window, events, duration);
        let zone = self.zone();

        let text = if slots.is_empty() {
            format!(
                "🕒 No free slots of {} minutes between {}.",
                duration.num_minutes(),
                display_range(zone, window.start, window.end)
            )
        } else {
            let lines: Vec<String> = slots
                .iter()
                .enumerate()
                .map(|(i, slot)| format!("{}. {}", i + 1, display_range(zone, slot.start, slot.end)))
                .collect();
            format!(
                "🕒 Free slots of at least {} minutes:\n\n{}",
                duration.num_minutes(),
                lines.join("\n")
            )
        };

        let slots: Vec<Value> = slots
            .iter()
            .map(|slot| slot_value(zone, slot.start, slot.end))
            .collect();
        Ok(ExecutionResult::text(text).with_data(json!({
            "slots": slots,
            "duration_minutes": duration.num_minutes(),
        })))
    }
}

/// Three same-length windows: straight after, one slot later, same time tomorrow
pub fn alternative_windows(start: DateTime<Utc>, end: DateTime<Utc>) -> [TimeWindow; 3] {
    let length = end - start;
    [
        TimeWindow {
            start: end,
            end: end + length,
        },
        TimeWindow {
            start: end + length,
            end: end + length + length,
        },
        TimeWindow {
            start: start + Duration::hours(24),
            end: end + Duration::hours(24),
        },
    ]
}

/// Gaps of at least `duration` between the busy events inside `window`
pub fn free_slots(window: TimeWindow, mut events: Vec<Event>, duration: Duration) -> Vec<TimeWindow> {
    events.retain(|e| !e.is_cancelled() && e.overlaps(window.start, window.end));
    events.sort_by_key(|e| e.start);

    let mut slots = Vec::new();
    let mut cursor = window.start;
    for event in &events {
        if event.start > cursor && event.start - cursor >= duration {
            slots.push(TimeWindow {
                start: cursor,
                end: event.start,
            });
        }
        cursor = cursor.max(event.end);
    }
    if cursor < window.end && window.end - cursor >= duration {
        slots.push(TimeWindow {
            start: cursor,
            end: window.end,
        });
    }
    slots
}

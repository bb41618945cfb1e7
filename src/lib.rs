//! # A2A Calendar Agent
//!
//! An Agent2Agent (A2A) agent that manages a Google Calendar from natural
//! language. Requests arrive as JSON-RPC envelopes, are resolved to a
//! calendar intent (LLM tool calling with a keyword fallback), executed
//! against a calendar backend and answered with a terminal Task.
//!
//! The request pipeline is a Tower service, so middleware such as
//! validation is composed as layers around [`service::CalendarAgentService`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use a2a_calendar_agent::prelude::*;
//! use chrono_tz::Tz;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let clock: SharedClock = Arc::new(SystemClock);
//!     let parser = TimeParser::new(Tz::UTC);
//!     let backend = Arc::new(DemoCalendarBackend::seeded(Tz::UTC, clock.now()));
//!
//!     let resolver = IntentResolver::pattern_only(PatternStrategy::new(parser.clone(), clock.clone()));
//!     let executor = CalendarExecutor::new(backend, "primary", false, parser, clock);
//!     let agent = CalendarAgentService::new(Arc::new(resolver), Arc::new(executor));
//!
//!     let state = AppState::from_agent(
//!         agent,
//!         AgentCard::calendar_agent("http://localhost:8080/a2a"),
//!         Duration::from_secs(60),
//!     );
//!     serve(([127, 0, 0, 1], 8080).into(), state).await
//! }
//! ```

pub mod calendar;
pub mod codec;
pub mod config;
pub mod intent;
pub mod layer;
pub mod llm;
pub mod protocol;
pub mod service;
pub mod time;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        calendar::{CalendarBackend, CalendarExecutor, DemoCalendarBackend, Event},
        config::AgentConfig,
        intent::{IntentResolver, PatternStrategy},
        protocol::error::A2AError,
        protocol::{A2AOperation, AgentCard, Message, MessagePart, Role, Task, TaskStatus},
        service::CalendarAgentService,
        time::{Clock, SharedClock, SystemClock, TimeParser},
        transport::{router, serve, AppState},
    };
}

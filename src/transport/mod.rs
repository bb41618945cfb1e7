//! Network bindings for the agent

pub mod http;

pub use http::{router, serve, AgentService, AppState};

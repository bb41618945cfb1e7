//! Agent discovery and capability types

use serde::{Deserialize, Serialize};

/// Agent Card for agent discovery
///
/// The Agent Card is published at `/.well-known/agent.json` and describes
/// the agent's capabilities, supported I/O modes and skills.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Name of the agent
    pub name: String,

    /// Human-readable description of the agent
    pub description: String,

    /// URL where the agent accepts JSON-RPC envelopes
    pub url: String,

    /// Agent version
    pub version: String,

    /// Agent capabilities
    pub capabilities: AgentCapabilities,

    /// MIME types the agent accepts
    pub default_input_modes: Vec<String>,

    /// MIME types the agent produces
    pub default_output_modes: Vec<String>,

    /// What the agent can do
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// Create a new agent card
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
        capabilities: AgentCapabilities,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            capabilities,
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string(), "application/json".to_string()],
            skills: Vec::new(),
        }
    }

    /// The card this calendar agent publishes
    pub fn calendar_agent(url: impl Into<String>) -> Self {
        Self::new(
            "Google Calendar Agent",
            "Manages Google Calendar events from natural-language requests: \
             lists calendars and events, schedules meetings with conflict detection, \
             finds free time, and updates or cancels events.",
            url,
            AgentCapabilities::new(),
        )
        .with_skill(AgentSkill::new(
            "schedule-event",
            "Schedule events",
            "Creates events after checking for conflicts and proposes alternative times",
            &["calendar", "scheduling"],
            &["schedule meeting with John at 2pm tomorrow"],
        ))
        .with_skill(AgentSkill::new(
            "list-events",
            "List events",
            "Lists upcoming events for today, tomorrow, this week or next week",
            &["calendar", "events"],
            &["what's on my calendar this week?"],
        ))
        .with_skill(AgentSkill::new(
            "list-calendars",
            "List calendars",
            "Lists the calendars the agent can access",
            &["calendar"],
            &["which calendars are available?"],
        ))
        .with_skill(AgentSkill::new(
            "find-availability",
            "Find availability",
            "Finds free slots of a given length in a time range",
            &["calendar", "availability"],
            &["when am I free tomorrow afternoon for 30 minutes?"],
        ))
        .with_skill(AgentSkill::new(
            "search-events",
            "Search events",
            "Searches event titles and descriptions",
            &["calendar", "search"],
            &["find my dentist appointment"],
        ))
        .with_skill(AgentSkill::new(
            "manage-events",
            "Update or cancel events",
            "Reschedules, edits or deletes an existing event",
            &["calendar", "events"],
            &["move event abc123 to 4pm", "cancel event abc123"],
        ))
    }

    /// Add a skill
    pub fn with_skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }

    /// Set the agent version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Agent capabilities
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Supports streaming responses
    #[serde(default)]
    pub streaming: bool,

    /// Supports push notifications via webhooks
    #[serde(default)]
    pub push_notifications: bool,

    /// Records task state transition history
    #[serde(default)]
    pub state_transition_history: bool,
}

impl AgentCapabilities {
    /// Create capabilities with default values (all false)
    pub fn new() -> Self {
        Self::default()
    }
}

/// A single capability advertised on the agent card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

impl AgentSkill {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: &[&str],
        examples: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            examples: examples.iter().map(|e| e.to_string()).collect(),
        }
    }
}

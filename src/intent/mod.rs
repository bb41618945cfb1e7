//! Turning free text into a structured calendar intent
//!
//! Resolution runs an ordered list of [`Strategy`] values. The language model
//! strategy goes first when configured; the keyword ladder is always last. A
//! strategy that errors, times out or comes back unsure hands over to the next
//! one, and when nothing is left the resolver answers with help text. The
//! resolver itself never fails.

pub mod llm;
pub mod pattern;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{llm::LlmError, service::RequestContext};

pub use llm::LlmStrategy;
pub use pattern::PatternStrategy;

/// Confidence at or below which an intent without narration is not trusted
pub const LOW_CONFIDENCE: f32 = 0.3;

/// Narration used when nothing better is available
pub const HELP_TEXT: &str = "I can help you manage your Google Calendar. Try asking:\n\
• \"Show my events today\" or \"What's on my calendar this week?\"\n\
• \"Schedule a meeting with John at 2pm tomorrow\"\n\
• \"When am I free tomorrow?\"\n\
• \"Move event <id> to 4pm\" or \"Cancel event <id>\"\n\
• \"Which calendars are available?\"";

/// The closed set of things a request can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    ListCalendars,
    ListEvents,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
    GetEvent,
    SearchEvents,
    GetAvailability,
    Help,
    Clarify,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::ListCalendars => "list_calendars",
            IntentKind::ListEvents => "list_events",
            IntentKind::CreateEvent => "create_event",
            IntentKind::UpdateEvent => "update_event",
            IntentKind::DeleteEvent => "delete_event",
            IntentKind::GetEvent => "get_event",
            IntentKind::SearchEvents => "search_events",
            IntentKind::GetAvailability => "get_availability",
            IntentKind::Help => "help",
            IntentKind::Clarify => "clarify",
        }
    }

    /// Map a model tool name to the intent it stands for
    ///
    /// Tools are named after the intents they trigger, so this is the inverse
    /// of [`IntentKind::as_str`] restricted to executable kinds.
    pub fn from_tool_name(name: &str) -> Option<Self> {
        let kind = match name {
            "list_calendars" => IntentKind::ListCalendars,
            "list_events" => IntentKind::ListEvents,
            "create_event" => IntentKind::CreateEvent,
            "update_event" => IntentKind::UpdateEvent,
            "delete_event" => IntentKind::DeleteEvent,
            "get_event" => IntentKind::GetEvent,
            "search_events" => IntentKind::SearchEvents,
            "get_availability" => IntentKind::GetAvailability,
            _ => return None,
        };
        Some(kind)
    }
}

/// A classified request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub parameters: Map<String, Value>,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
}

impl Intent {
    pub fn new(kind: IntentKind, confidence: f32) -> Self {
        Self {
            kind,
            parameters: Map::new(),
            confidence: confidence.clamp(0.0, 1.0),
            narration: None,
        }
    }

    /// A Help or Clarify intent: narration only, no parameters
    pub fn conversational(kind: IntentKind, narration: impl Into<String>, confidence: f32) -> Self {
        Self::new(kind, confidence).with_narration(narration)
    }

    /// The fallback answered when every strategy gave up
    pub fn help() -> Self {
        Self::conversational(IntentKind::Help, HELP_TEXT, LOW_CONFIDENCE)
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_narration(mut self, narration: impl Into<String>) -> Self {
        let narration = narration.into();
        self.narration = (!narration.trim().is_empty()).then_some(narration);
        self
    }

    /// Low confidence with nothing to say
    pub fn is_uncertain(&self) -> bool {
        self.confidence <= LOW_CONFIDENCE && self.narration.is_none()
    }
}

/// Why a strategy did not produce an intent
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("strategy is disabled")]
    Disabled,

    #[error("language model timed out")]
    Timeout,

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("model returned neither text nor a tool call")]
    EmptyReply,

    #[error("model called unknown tool `{0}`")]
    UnknownTool(String),

    #[error("arguments of `{0}` are not a JSON object")]
    BadArguments(String),
}

/// One way of classifying an utterance
pub enum Strategy {
    Llm(LlmStrategy),
    Pattern(PatternStrategy),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Llm(_) => "llm",
            Strategy::Pattern(_) => "pattern",
        }
    }

    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        utterance: &str,
    ) -> Result<Intent, ResolveError> {
        match self {
            Strategy::Llm(strategy) => strategy.resolve(ctx, utterance).await,
            Strategy::Pattern(strategy) => Ok(strategy.resolve(utterance)),
        }
    }
}

/// Runs strategies in order until one produces a usable intent
pub struct IntentResolver {
    strategies: Vec<Strategy>,
}

impl IntentResolver {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// Keyword ladder only
    pub fn pattern_only(pattern: PatternStrategy) -> Self {
        Self::new(vec![Strategy::Pattern(pattern)])
    }

    /// Language model first, keyword ladder as fallback
    pub fn with_llm(llm: LlmStrategy, pattern: PatternStrategy) -> Self {
        Self::new(vec![Strategy::Llm(llm), Strategy::Pattern(pattern)])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(Strategy::name).collect()
    }

    pub async fn resolve(&self, ctx: &RequestContext, utterance: &str) -> Intent {
        for strategy in &self.strategies {
            match strategy.resolve(ctx, utterance).await {
                Ok(intent) if intent.is_uncertain() => {
                    warn!(
                        strategy = strategy.name(),
                        intent = intent.kind.as_str(),
                        confidence = intent.confidence,
                        "strategy unsure, falling back"
                    );
                }
                Ok(intent) => {
                    debug!(
                        strategy = strategy.name(),
                        intent = intent.kind.as_str(),
                        confidence = intent.confidence,
                        "intent resolved"
                    );
                    return intent;
                }
                Err(ResolveError::Disabled) => {}
                Err(error) => {
                    warn!(strategy = strategy.name(), error = %error, "strategy failed, falling back");
                }
            }
        }

        Intent::help()
    }
}

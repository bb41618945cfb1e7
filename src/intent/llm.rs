//! Tool-calling classification through a language model

use std::{sync::Arc, time::Duration};

use chrono_tz::Tz;
use serde_json::{json, Value};
use tokio::time::timeout;

use super::{Intent, IntentKind, ResolveError};
use crate::{
    config::LlmConfig,
    llm::{ChatMessage, GenerateRequest, GenerateResponse, LanguageModel, LlmProvider, ToolSpec},
    service::RequestContext,
    time::SharedClock,
};

const TOOL_CONFIDENCE: f32 = 0.95;
const CLARIFY_CONFIDENCE: f32 = 0.9;
const HELP_CONFIDENCE: f32 = 0.8;

const SOLICITATIONS: &[&str] = &[
    "could you",
    "can you",
    "would you",
    "please provide",
    "please specify",
    "please tell",
    "please let me know",
    "let me know",
    "which one",
    "what time",
    "do you want",
    "would you like",
    "need more",
    "more details",
];

/// Classifies an utterance by offering the model one tool per intent
pub struct LlmStrategy {
    model: Arc<dyn LanguageModel>,
    enabled: bool,
    provider: LlmProvider,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    zone: Tz,
    clock: SharedClock,
}

impl LlmStrategy {
    pub fn new(model: Arc<dyn LanguageModel>, config: &LlmConfig, zone: Tz, clock: SharedClock) -> Self {
        Self {
            model,
            enabled: config.enabled,
            provider: config.provider,
            model_name: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout,
            zone,
            clock,
        }
    }

    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        utterance: &str,
    ) -> Result<Intent, ResolveError> {
        if !self.enabled {
            return Err(ResolveError::Disabled);
        }

        let request = self.build_request(utterance);
        let response = match ctx
            .within(timeout(self.timeout, self.model.generate(&request)))
            .await
        {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) | Err(_) => return Err(ResolveError::Timeout),
        };

        interpret(&response)
    }

    fn build_request(&self, utterance: &str) -> GenerateRequest {
        GenerateRequest {
            provider: self.provider,
            model: self.model_name.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt()),
                ChatMessage::user(utterance),
            ],
            tools: tool_manifest(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn system_prompt(&self) -> String {
        let now = self.clock.now().with_timezone(&self.zone);
        format!(
            "You are a calendar assistant that manages the user's Google Calendar.\n\
             Current date: {date} ({weekday})\n\
             Current time: {time}\n\
             Time zone: {zone}\n\n\
             Use the provided tools to carry out calendar requests. Express every time \
             in RFC 3339 with an explicit offset, resolving words like \"tomorrow\" or \
             \"next friday\" against the current date above. If a request is missing \
             details you need, ask one short clarifying question instead of calling a \
             tool. If it is not about the calendar, say briefly what you can help with.",
            date = now.format("%Y-%m-%d"),
            weekday = now.format("%A"),
            time = now.format("%H:%M"),
            zone = self.zone.name(),
        )
    }
}

/// Map a model reply to an intent
///
/// The first tool call decides the intent and its arguments become the
/// parameters. Plain text is a question back to the user when it reads like
/// one, otherwise help.
pub fn interpret(response: &GenerateResponse) -> Result<Intent, ResolveError> {
    let message = response.first_message().ok_or(ResolveError::EmptyReply)?;

    if let Some(call) = message.tool_calls.first() {
        let kind = IntentKind::from_tool_name(&call.name)
            .ok_or_else(|| ResolveError::UnknownTool(call.name.clone()))?;
        let parameters = match &call.arguments {
            Value::Object(map) => map.clone(),
            _ => return Err(ResolveError::BadArguments(call.name.clone())),
        };
        return Ok(Intent::new(kind, TOOL_CONFIDENCE)
            .with_parameters(parameters)
            .with_narration(message.content.clone()));
    }

    let text = message.content.trim();
    if text.is_empty() {
        return Err(ResolveError::EmptyReply);
    }

    if is_clarification(text) {
        Ok(Intent::conversational(IntentKind::Clarify, text, CLARIFY_CONFIDENCE))
    } else {
        Ok(Intent::conversational(IntentKind::Help, text, HELP_CONFIDENCE))
    }
}

fn is_clarification(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains('?') || SOLICITATIONS.iter().any(|phrase| lower.contains(phrase))
}

/// One tool per executable intent kind
pub fn tool_manifest() -> Vec<ToolSpec> {
    let time = |description: &str| json!({"type": "string", "format": "date-time", "description": description});

    vec![
        ToolSpec::new(
            "list_calendars",
            "List the calendars the agent can access",
            json!({"type": "object", "properties": {}}),
        ),
        ToolSpec::new(
            "list_events",
            "List events in a time window",
            json!({
                "type": "object",
                "properties": {
                    "time_min": time("Window start"),
                    "time_max": time("Window end"),
                },
            }),
        ),
        ToolSpec::new(
            "create_event",
            "Create an event after checking for conflicts",
            json!({
                "type": "object",
                "properties": {
                    "summary": {"type": "string", "description": "Event title"},
                    "start_time": time("Event start"),
                    "end_time": time("Event end"),
                    "duration_minutes": {"type": "integer", "minimum": 1},
                    "description": {"type": "string"},
                    "location": {"type": "string"},
                    "attendees": {"type": "array", "items": {"type": "string", "format": "email"}},
                },
                "required": ["summary", "start_time"],
            }),
        ),
        ToolSpec::new(
            "update_event",
            "Change fields of an existing event",
            json!({
                "type": "object",
                "properties": {
                    "event_id": {"type": "string"},
                    "summary": {"type": "string"},
                    "start_time": time("New start"),
                    "end_time": time("New end"),
                    "description": {"type": "string"},
                    "location": {"type": "string"},
                },
                "required": ["event_id"],
            }),
        ),
        ToolSpec::new(
            "delete_event",
            "Delete an event",
            json!({
                "type": "object",
                "properties": {"event_id": {"type": "string"}},
                "required": ["event_id"],
            }),
        ),
        ToolSpec::new(
            "get_event",
            "Fetch one event by id",
            json!({
                "type": "object",
                "properties": {"event_id": {"type": "string"}},
                "required": ["event_id"],
            }),
        ),
        ToolSpec::new(
            "search_events",
            "Find events whose title or description contains a phrase",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "time_min": time("Window start"),
                    "time_max": time("Window end"),
                },
                "required": ["query"],
            }),
        ),
        ToolSpec::new(
            "get_availability",
            "Find free slots between two instants",
            json!({
                "type": "object",
                "properties": {
                    "start": time("Range start"),
                    "end": time("Range end"),
                    "duration_minutes": {"type": "integer", "minimum": 1, "default": 60},
                },
                "required": ["start", "end"],
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mockall::predicate;

    use super::*;
    use crate::{
        llm::{AssistantReply, Choice, MockLanguageModel, ToolCall},
        time::FixedClock,
    };

    fn text_reply(content: &str) -> GenerateResponse {
        GenerateResponse {
            choices: vec![Choice {
                message: AssistantReply {
                    content: content.into(),
                    tool_calls: vec![],
                },
            }],
            usage: None,
        }
    }

    fn strategy(model: MockLanguageModel) -> LlmStrategy {
        let config = LlmConfig {
            enabled: true,
            model: "gpt-test".into(),
            ..LlmConfig::default()
        };
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 10, 18, 5, 0).unwrap()));
        LlmStrategy::new(Arc::new(model), &config, chrono_tz::America::New_York, clock)
    }

    #[test]
    fn test_manifest_covers_executable_intents() {
        let names: Vec<_> = tool_manifest().into_iter().map(|t| t.name).collect();
        assert_eq!(names.len(), 8);
        for name in &names {
            assert!(IntentKind::from_tool_name(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_system_prompt_is_stamped() {
        let prompt = strategy(MockLanguageModel::new()).system_prompt();
        assert!(prompt.contains("Current date: 2026-03-10 (Tuesday)"));
        assert!(prompt.contains("Current time: 14:05"));
        assert!(prompt.contains("Time zone: America/New_York"));
    }

    #[tokio::test]
    async fn test_request_carries_utterance_and_tools() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .with(predicate::function(|req: &GenerateRequest| {
                req.model == "gpt-test"
                    && req.messages.len() == 2
                    && req.messages[1].content == "what's on friday"
                    && req.tools.len() == 8
            }))
            .times(1)
            .returning(|_| Ok(text_reply("Which Friday do you mean?")));

        let intent = strategy(model)
            .resolve(&RequestContext::default(), "what's on friday")
            .await
            .unwrap();
        assert_eq!(intent.kind, IntentKind::Clarify);
        assert_eq!(intent.confidence, 0.9);
        assert!(intent.parameters.is_empty());
    }

    #[test]
    fn test_text_without_question_is_help() {
        let intent = interpret(&text_reply("I manage calendar events for you.")).unwrap();
        assert_eq!(intent.kind, IntentKind::Help);
        assert_eq!(intent.confidence, 0.8);
        assert_eq!(
            intent.narration.as_deref(),
            Some("I manage calendar events for you.")
        );
    }

    #[test]
    fn test_solicitation_is_clarify() {
        let intent = interpret(&text_reply("Please provide the event id.")).unwrap();
        assert_eq!(intent.kind, IntentKind::Clarify);
    }

    #[test]
    fn test_tool_arguments_become_parameters() {
        let response = GenerateResponse {
            choices: vec![Choice {
                message: AssistantReply {
                    content: String::new(),
                    tool_calls: vec![ToolCall {
                        name: "create_event".into(),
                        arguments: json!({
                            "summary": "Design review",
                            "start_time": "2026-03-11T15:00:00-04:00"
                        }),
                    }],
                },
            }],
            usage: None,
        };

        let intent = interpret(&response).unwrap();
        assert_eq!(intent.kind, IntentKind::CreateEvent);
        assert_eq!(intent.parameters["summary"], "Design review");
        assert!(intent.narration.is_none());
    }

    #[test]
    fn test_unusable_replies() {
        assert!(matches!(
            interpret(&GenerateResponse::default()),
            Err(ResolveError::EmptyReply)
        ));
        assert!(matches!(
            interpret(&text_reply("  ")),
            Err(ResolveError::EmptyReply)
        ));

        let response = GenerateResponse {
            choices: vec![Choice {
                message: AssistantReply {
                    content: String::new(),
                    tool_calls: vec![ToolCall {
                        name: "send_email".into(),
                        arguments: json!({}),
                    }],
                },
            }],
            usage: None,
        };
        assert!(matches!(
            interpret(&response),
            Err(ResolveError::UnknownTool(name)) if name == "send_email"
        ));
    }

    #[tokio::test]
    async fn test_disabled_strategy() {
        let model = MockLanguageModel::new();
        let strategy = LlmStrategy::new(
            Arc::new(model),
            &LlmConfig::default(),
            Tz::UTC,
            Arc::new(FixedClock(Utc::now())),
        );
        assert!(matches!(
            strategy.resolve(&RequestContext::default(), "hi").await,
            Err(ResolveError::Disabled)
        ));
    }
}

//! A2A message types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{A2AError, A2AResult};

/// A message in the A2A protocol
///
/// Messages are the primary unit of communication between agents.
/// Each message has a role (user or assistant) and one or more ordered parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,

    /// Message content parts, in the order the sender wrote them
    pub parts: Vec<MessagePart>,

    /// Message identifier
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Optional task identifier (for associating message with a task)
    #[serde(rename = "taskId", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Optional context identifier (for multi-turn conversations)
    #[serde(rename = "contextId", skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl Message {
    /// Create a new message with text content
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![MessagePart::Text { text: text.into() }],
            message_id: None,
            task_id: None,
            context_id: None,
        }
    }

    /// Create a user message with text content
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant message with text content
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Create a new message builder
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Add a message part
    pub fn with_part(mut self, part: MessagePart) -> Self {
        self.parts.push(part);
        self
    }

    /// The user utterance carried by this message
    ///
    /// Parts are scanned in order and the first text part wins; data parts are
    /// skipped. A message whose only parts are of a kind the agent does not read
    /// is rejected as unsupported content.
    pub fn utterance(&self) -> A2AResult<String> {
        let mut saw_unsupported = None;

        for part in &self.parts {
            match part {
                MessagePart::Text { text } => {
                    if text.trim().is_empty() {
                        return Err(A2AError::InvalidParams(
                            "message text cannot be empty".into(),
                        ));
                    }
                    return Ok(text.clone());
                }
                MessagePart::Data { .. } => {}
                MessagePart::Unsupported(fields) => {
                    if saw_unsupported.is_none() {
                        saw_unsupported = Some(part_kind(fields));
                    }
                }
            }
        }

        match saw_unsupported {
            Some(kind) => Err(A2AError::UnsupportedContent(kind)),
            None => Err(A2AError::InvalidParams(
                "message must contain a text part".into(),
            )),
        }
    }
}

/// Extract the user utterance from raw `message/send` params
pub fn extract_utterance(params: &Value) -> A2AResult<String> {
    let message = params
        .get("message")
        .ok_or_else(|| A2AError::InvalidParams("params.message is required".into()))?;
    let message: Message = serde_json::from_value(message.clone())
        .map_err(|e| A2AError::InvalidParams(format!("invalid message: {}", e)))?;
    message.utterance()
}

fn part_kind(fields: &Map<String, Value>) -> String {
    if let Some(kind) = fields.get("kind").and_then(Value::as_str) {
        return kind.to_string();
    }
    fields
        .keys()
        .next()
        .cloned()
        .unwrap_or_else(|| "empty".to_string())
}

/// Builder for constructing Message instances
#[derive(Debug, Default)]
pub struct MessageBuilder {
    role: Option<Role>,
    parts: Vec<MessagePart>,
    message_id: Option<String>,
    task_id: Option<String>,
    context_id: Option<String>,
}

impl MessageBuilder {
    /// Create a new message builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role of the message
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Add a single part to the message
    pub fn part(mut self, part: MessagePart) -> Self {
        self.parts.push(part);
        self
    }

    /// Set the message ID
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Set the task ID
    pub fn task_id(mut self, id: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self
    }

    /// Set the context ID
    pub fn context_id(mut self, id: impl Into<String>) -> Self {
        self.context_id = Some(id.into());
        self
    }

    /// Build the message
    ///
    /// Fails if the role is not set or no parts were added.
    pub fn build(self) -> A2AResult<Message> {
        let role = self
            .role
            .ok_or_else(|| A2AError::Internal("message role is required".into()))?;
        if self.parts.is_empty() {
            return Err(A2AError::Internal(
                "message must have at least one part".into(),
            ));
        }

        Ok(Message {
            role,
            parts: self.parts,
            message_id: self.message_id,
            task_id: self.task_id,
            context_id: self.context_id,
        })
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from a user
    User,

    /// Message from the agent
    #[serde(alias = "agent")]
    Assistant,
}

/// A part of a message
///
/// Parts are read by shape: `{"text": ...}` or `{"data": {...}}`, with an optional
/// `kind` discriminator that is ignored. Any other shape is kept verbatim so the
/// extractor can report it as unsupported content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessagePart {
    /// Text content
    Text {
        /// The text content
        text: String,
    },

    /// Structured data
    Data {
        /// The structured data
        data: Value,
    },

    /// A part kind this agent does not read (files, etc.)
    Unsupported(Map<String, Value>),
}

impl MessagePart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a data part
    pub fn data(data: Value) -> Self {
        Self::Data { data }
    }

    /// The text of a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePart::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.parts.len(), 1);
        assert_eq!(msg.parts[0].as_text(), Some("Hello, agent!"));
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"text\":\"Test message\""));

        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, deserialized);
    }

    #[test]
    fn test_agent_role_alias() {
        let msg: Message = serde_json::from_value(json!({
            "role": "agent",
            "parts": [{"kind": "text", "text": "hi"}]
        }))
        .unwrap();
        assert_eq!(msg.role, Role::Assistant);
    }

    #[test]
    fn test_kind_tagged_parts_are_accepted() {
        let msg: Message = serde_json::from_value(json!({
            "role": "user",
            "parts": [
                {"kind": "data", "data": {"calendar": "primary"}},
                {"kind": "text", "text": "show my events today"}
            ],
            "messageId": "m-1"
        }))
        .unwrap();

        assert!(matches!(msg.parts[0], MessagePart::Data { .. }));
        assert_eq!(msg.utterance().unwrap(), "show my events today");
    }

    #[test]
    fn test_first_text_part_wins() {
        let msg = Message::user("first").with_part(MessagePart::text("second"));
        assert_eq!(msg.utterance().unwrap(), "first");
    }

    #[test]
    fn test_whitespace_text_rejected() {
        let msg = Message::user("   \n\t");
        match msg.utterance() {
            Err(A2AError::InvalidParams(msg)) => assert_eq!(msg, "message text cannot be empty"),
            other => panic!("Expected InvalidParams, got {:?}", other),
        }
    }

    #[test]
    fn test_file_only_message_is_unsupported() {
        let msg: Message = serde_json::from_value(json!({
            "role": "user",
            "parts": [{"kind": "file", "file": {"name": "a.ics"}}]
        }))
        .unwrap();

        match msg.utterance() {
            Err(A2AError::UnsupportedContent(kind)) => assert_eq!(kind, "file"),
            other => panic!("Expected UnsupportedContent, got {:?}", other),
        }
    }

    #[test]
    fn test_data_only_message_is_invalid() {
        let msg = Message {
            role: Role::User,
            parts: vec![MessagePart::data(json!({"k": 1}))],
            message_id: None,
            task_id: None,
            context_id: None,
        };
        assert!(matches!(msg.utterance(), Err(A2AError::InvalidParams(_))));
    }

    #[test]
    fn test_extract_from_params() {
        let params = json!({
            "message": {"role": "user", "parts": [{"text": "list calendars"}]}
        });
        assert_eq!(extract_utterance(&params).unwrap(), "list calendars");

        let missing = json!({});
        assert!(matches!(
            extract_utterance(&missing),
            Err(A2AError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_message_builder() {
        let msg = Message::builder()
            .role(Role::Assistant)
            .part(MessagePart::text("Hello"))
            .message_id("msg-123")
            .task_id("task-456")
            .context_id("ctx-789")
            .build()
            .unwrap();

        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.message_id, Some("msg-123".to_string()));
        assert_eq!(msg.task_id, Some("task-456".to_string()));
        assert_eq!(msg.context_id, Some("ctx-789".to_string()));
    }

    #[test]
    fn test_message_builder_requires_role_and_parts() {
        assert!(Message::builder()
            .part(MessagePart::text("Hello"))
            .build()
            .is_err());
        assert!(Message::builder().role(Role::User).build().is_err());
    }
}

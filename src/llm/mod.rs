//! Language model capability used by the intent resolver
//!
//! The agent only needs one call: a single chat turn with a tool manifest. The
//! [`LanguageModel`] trait abstracts that call so the resolver can be exercised
//! without a network, and [`gateway::GatewayClient`] implements it against an
//! OpenAI-compatible chat completions endpoint.

pub mod gateway;

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub use gateway::GatewayClient;

/// Errors raised while talking to the model gateway
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("llm gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed llm response: {0}")]
    Decode(String),

    #[error("unsupported llm provider `{0}` (expected openai|anthropic|groq|ollama|deepseek|cohere|cloudflare)")]
    UnknownProvider(String),
}

/// Upstream model provider the gateway routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAi,
    Anthropic,
    Groq,
    Ollama,
    DeepSeek,
    Cohere,
    Cloudflare,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Groq => "groq",
            LlmProvider::Ollama => "ollama",
            LlmProvider::DeepSeek => "deepseek",
            LlmProvider::Cohere => "cohere",
            LlmProvider::Cloudflare => "cloudflare",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "groq" => Ok(Self::Groq),
            "ollama" => Ok(Self::Ollama),
            "deepseek" => Ok(Self::DeepSeek),
            "cohere" => Ok(Self::Cohere),
            "cloudflare" => Ok(Self::Cloudflare),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

/// One chat message sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A function the model may call, described by a JSON schema
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Render in the chat completions `tools` shape
    pub fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// A single chat-with-tools call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub provider: LlmProvider,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Model output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<TokenUsage>,
}

impl GenerateResponse {
    /// The first choice's message, which is the only one the agent reads
    pub fn first_message(&self) -> Option<&AssistantReply> {
        self.choices.first().map(|choice| &choice.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Choice {
    pub message: AssistantReply,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// A tool invocation with already-decoded JSON arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

/// Chat-with-tools capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!(" deepseek ".parse::<LlmProvider>().unwrap(), LlmProvider::DeepSeek);
        assert_eq!(
            "cloudflare".parse::<LlmProvider>().unwrap().to_string(),
            "cloudflare"
        );
        assert!(matches!(
            "bard".parse::<LlmProvider>(),
            Err(LlmError::UnknownProvider(p)) if p == "bard"
        ));
    }

    #[test]
    fn test_tool_wire_shape() {
        let tool = ToolSpec::new("delete_event", "Delete an event", json!({"type": "object"}));
        let wire = tool.to_wire();
        assert_eq!(wire["type"], "function");
        assert_eq!(wire["function"]["name"], "delete_event");
        assert_eq!(wire["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_first_message() {
        assert!(GenerateResponse::default().first_message().is_none());

        let response = GenerateResponse {
            choices: vec![Choice {
                message: AssistantReply {
                    content: "hello".into(),
                    tool_calls: vec![],
                },
            }],
            usage: None,
        };
        assert_eq!(response.first_message().unwrap().content, "hello");
    }
}

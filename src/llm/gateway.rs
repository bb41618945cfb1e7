//! OpenAI-compatible chat completions client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{
    AssistantReply, Choice, GenerateRequest, GenerateResponse, LanguageModel, LlmError,
    TokenUsage, ToolCall,
};

/// Talks to an LLM gateway that speaks the chat completions protocol
///
/// The provider is forwarded in the payload so a multi-provider gateway can
/// route the call; a plain OpenAI-compatible server ignores it.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl GatewayClient {
    pub fn new(base_url: Url, api_key: Option<SecretString>, timeout: Duration) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, api_key))
    }

    pub fn with_client(http: Client, base_url: Url, api_key: Option<SecretString>) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        let api_key = self.api_key.as_ref().map(|key| key.expose_secret());
        if let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) {
            if let Ok(value) = format!("Bearer {api_key}").parse() {
                headers.insert(header::AUTHORIZATION, value);
            }
        }
        headers
    }
}

/// Build the request body for one chat-with-tools call
pub fn build_payload(request: &GenerateRequest) -> Value {
    let mut payload = json!({
        "provider": request.provider.as_str(),
        "model": request.model,
        "messages": request.messages,
        "temperature": request.temperature,
        "stream": false,
    });
    if request.max_tokens > 0 {
        payload["max_tokens"] = json!(request.max_tokens);
    }
    if !request.tools.is_empty() {
        payload["tools"] = Value::Array(request.tools.iter().map(|t| t.to_wire()).collect());
        payload["tool_choice"] = json!("auto");
    }
    payload
}

/// Decode a chat completions response body
///
/// Tool-call arguments arrive as a JSON-encoded string and are decoded here; a
/// call whose arguments are not valid JSON fails the whole response.
pub fn parse_response(body: &Value) -> Result<GenerateResponse, LlmError> {
    let choices = body
        .get("choices")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Decode("response has no choices".into()))?;

    let choices = choices
        .iter()
        .map(|choice| {
            let message = choice.get("message").unwrap_or(&Value::Null);
            let content = message
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let tool_calls = message
                .get("tool_calls")
                .and_then(Value::as_array)
                .map(|calls| calls.iter().map(parse_tool_call).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Choice {
                message: AssistantReply {
                    content,
                    tool_calls,
                },
            })
        })
        .collect::<Result<Vec<_>, LlmError>>()?;

    Ok(GenerateResponse {
        choices,
        usage: normalize_usage(body.get("usage")),
    })
}

fn parse_tool_call(raw: &Value) -> Result<ToolCall, LlmError> {
    let function = raw.get("function").unwrap_or(raw);
    let name = function
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| LlmError::Decode("tool call without a name".into()))?
        .to_string();

    let arguments = match function.get("arguments") {
        None | Some(Value::Null) => json!({}),
        Some(Value::String(text)) if text.trim().is_empty() => json!({}),
        Some(Value::String(text)) => serde_json::from_str(text)
            .map_err(|e| LlmError::Decode(format!("arguments of `{name}`: {e}")))?,
        Some(other) => other.clone(),
    };

    Ok(ToolCall { name, arguments })
}

fn normalize_usage(raw: Option<&Value>) -> Option<TokenUsage> {
    let map = raw?.as_object()?;
    let to_u64 = |value: Option<&Value>| -> Option<u64> {
        match value {
            Some(Value::Number(num)) => num.as_u64(),
            Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
            _ => None,
        }
    };
    let input = to_u64(map.get("prompt_tokens"))
        .or_else(|| to_u64(map.get("input_tokens")))
        .unwrap_or(0);
    let output = to_u64(map.get("completion_tokens"))
        .or_else(|| to_u64(map.get("output_tokens")))
        .unwrap_or(0);
    let total = to_u64(map.get("total_tokens")).unwrap_or(input + output);
    if input == 0 && output == 0 && total == 0 {
        return None;
    }
    Some(TokenUsage {
        input,
        output,
        total,
    })
}

#[async_trait]
impl LanguageModel for GatewayClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let response = self
            .http
            .post(self.endpoint())
            .headers(self.headers())
            .json(&build_payload(request))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: body.to_string(),
            });
        }

        let parsed = parse_response(&body)?;
        if let Some(usage) = parsed.usage {
            debug!(
                model = %request.model,
                input_tokens = usage.input,
                output_tokens = usage.output,
                "llm call finished"
            );
        }
        Ok(parsed)
    }
}

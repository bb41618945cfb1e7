//! Wire-shape checks for the JSON the agent emits and accepts

use serde_json::{json, Value};

use a2a_calendar_agent::{
    calendar::ExecutionResult,
    codec::{Codec, JsonRpcCodec, JsonRpcResponse},
    protocol::{
        error::codes, A2AError, A2AOperation, AgentCard, Message, MessagePart, Role, Task,
        TaskState,
    },
    service::TaskAssembler,
};

fn completed_task() -> Value {
    let user = Message::builder()
        .role(Role::User)
        .part(MessagePart::text("what's on today?"))
        .message_id("m-1")
        .context_id("ctx-9")
        .build()
        .unwrap();
    let result = ExecutionResult::text("📅 No events found for today.")
        .with_data(json!({"events": [], "time_min": "2026-03-10T00:00:00+00:00"}));

    serde_json::to_value(TaskAssembler::new().completed(&user, &result)).unwrap()
}

#[test]
fn test_task_field_naming() {
    let task = completed_task();

    assert_eq!(task["kind"], "task");
    assert_eq!(task["contextId"], "ctx-9");
    assert!(task.get("context_id").is_none());
    assert_eq!(task["status"]["state"], "completed");
    assert!(task["status"]["timestamp"].is_string());

    let artifact = &task["artifacts"][0];
    assert!(artifact["artifactId"].is_string());
    assert_eq!(artifact["name"], "calendar-response");
    assert!(artifact.get("description").is_none());
    assert!(artifact.get("metadata").is_none());
}

#[test]
fn test_part_shapes() {
    let task = completed_task();
    let parts = task["artifacts"][0]["parts"].as_array().unwrap();

    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0], json!({"text": "📅 No events found for today."}));
    assert_eq!(parts[1]["data"]["events"], json!([]));
}

#[test]
fn test_history_messages() {
    let task = completed_task();
    let history = task["history"].as_array().unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[0]["messageId"], "m-1");
    assert_eq!(history[0]["taskId"], task["id"]);
    assert_eq!(history[1]["role"], "assistant");
    assert_eq!(history[1]["contextId"], "ctx-9");
    assert_eq!(task["status"]["message"], history[1]);
}

#[test]
fn test_failed_task_carries_rpc_error() {
    let error = A2AError::calendar_service("list_events", "primary", "backend returned 503");
    let task = TaskAssembler::new().failed(&Message::user("today"), &error);
    assert_eq!(task.status.state, TaskState::Failed);
    assert!(task.artifacts.is_empty());

    let json = serde_json::to_value(&task).unwrap();
    let parts = &json["status"]["message"]["parts"];
    assert!(parts[0]["text"].as_str().unwrap().starts_with("❌ "));
    assert_eq!(parts[1]["data"]["error"]["code"], codes::CALENDAR_SERVICE);
    assert_eq!(parts[1]["data"]["error"]["data"]["operation"], "list_events");
    assert_eq!(parts[1]["data"]["error"]["data"]["calendarId"], "primary");
}

#[test]
fn test_message_accepts_kind_discriminator() {
    let message: Message = serde_json::from_value(json!({
        "role": "user",
        "messageId": "m-2",
        "parts": [
            {"kind": "data", "data": {"calendar": "work"}},
            {"kind": "text", "text": "show my week"}
        ]
    }))
    .unwrap();

    assert_eq!(message.role, Role::User);
    assert_eq!(message.utterance().unwrap(), "show my week");
}

#[test]
fn test_file_part_is_unsupported() {
    let message: Message = serde_json::from_value(json!({
        "role": "user",
        "parts": [{"kind": "file", "file": {"uri": "https://example.com/invite.ics"}}]
    }))
    .unwrap();

    let error = message.utterance().unwrap_err();
    assert_eq!(error.code(), codes::UNSUPPORTED_CONTENT);
}

#[test]
fn test_envelope_round_trip() {
    let codec = JsonRpcCodec::new();
    let raw = json!({
        "jsonrpc": "2.0",
        "id": 42,
        "method": "message/send",
        "params": {"message": {"role": "user", "parts": [{"text": "hi"}]}}
    });

    let request = codec.decode_request(raw.to_string().as_bytes()).unwrap();
    let encoded: Value = serde_json::from_slice(&codec.encode_request(&request).unwrap()).unwrap();
    assert_eq!(encoded, raw);

    let operation = A2AOperation::from_method(&request.method, &request.params).unwrap();
    assert_eq!(operation.method(), "message/send");
}

#[test]
fn test_error_envelope_shape() {
    let response = JsonRpcResponse::error(json!("abc"), &A2AError::InvalidParams("eventId is required".into()));
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["jsonrpc"], "2.0");
    assert_eq!(json["id"], "abc");
    assert!(json.get("result").is_none());
    assert_eq!(json["error"]["code"], -32602);
    assert_eq!(json["error"]["message"], "eventId is required");
}

#[test]
fn test_agent_card_wire_format() {
    let card = serde_json::to_value(AgentCard::calendar_agent("http://localhost:8080/a2a")).unwrap();

    assert_eq!(card["url"], "http://localhost:8080/a2a");
    assert_eq!(
        card["capabilities"],
        json!({"streaming": false, "pushNotifications": false, "stateTransitionHistory": false})
    );
    assert_eq!(card["defaultInputModes"], json!(["text/plain"]));
    assert_eq!(card["defaultOutputModes"], json!(["text/plain", "application/json"]));
    assert!(!card["skills"].as_array().unwrap().is_empty());
    assert!(card["version"].is_string());
}

#[test]
fn test_task_deserializes_back() {
    let task: Task = serde_json::from_value(completed_task()).unwrap();
    assert!(task.is_terminal());
    assert_eq!(task.history.len(), 2);
}

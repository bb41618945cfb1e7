//! Builds the Task returned for a `message/send` call

use serde_json::json;
use uuid::Uuid;

use crate::{
    calendar::ExecutionResult,
    protocol::{
        error::A2AError, Artifact, Message, MessagePart, Role, Task, TaskState, TaskStatus,
    },
};

/// Name of the single artifact every completed task carries
pub const ARTIFACT_NAME: &str = "calendar-response";

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// Assembles terminal tasks around the user's message
///
/// Task, message and artifact ids are fresh v4 UUIDs. The context id of the
/// incoming message is reused when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskAssembler;

impl TaskAssembler {
    pub fn new() -> Self {
        Self
    }

    /// A `completed` task carrying the narration and, when present, the data payload
    pub fn completed(&self, user: &Message, result: &ExecutionResult) -> Task {
        let (task_id, context_id, user) = self.frame(user);

        let mut parts = vec![MessagePart::text(result.text.clone())];
        if let Some(data) = &result.data {
            parts.push(MessagePart::data(data.clone()));
        }
        let reply = self.reply(&task_id, &context_id, parts.clone());

        Task::new(task_id, context_id)
            .with_status(TaskStatus::new(TaskState::Completed).with_message(reply.clone()))
            .with_artifact(Artifact {
                artifact_id: fresh_id(),
                name: Some(ARTIFACT_NAME.to_string()),
                description: None,
                parts,
                metadata: None,
            })
            .with_history_message(user)
            .with_history_message(reply)
    }

    /// A `failed` task whose agent message explains the failure
    ///
    /// The JSON-RPC error object rides along as a data part so callers can
    /// still read the code.
    pub fn failed(&self, user: &Message, error: &A2AError) -> Task {
        let (task_id, context_id, user) = self.frame(user);

        let parts = vec![
            MessagePart::text(format!("❌ {error}")),
            MessagePart::data(json!({ "error": error.to_rpc_error() })),
        ];
        let reply = self.reply(&task_id, &context_id, parts);

        Task::new(task_id, context_id)
            .with_status(TaskStatus::new(TaskState::Failed).with_message(reply.clone()))
            .with_history_message(user)
            .with_history_message(reply)
    }

    fn frame(&self, user: &Message) -> (String, String, Message) {
        let task_id = fresh_id();
        let context_id = user.context_id.clone().unwrap_or_else(fresh_id);

        let mut user = user.clone();
        user.task_id = Some(task_id.clone());
        user.context_id = Some(context_id.clone());
        if user.message_id.is_none() {
            user.message_id = Some(fresh_id());
        }
        (task_id, context_id, user)
    }

    fn reply(&self, task_id: &str, context_id: &str, parts: Vec<MessagePart>) -> Message {
        Message {
            role: Role::Assistant,
            parts,
            message_id: Some(fresh_id()),
            task_id: Some(task_id.to_string()),
            context_id: Some(context_id.to_string()),
        }
    }
}

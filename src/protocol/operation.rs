//! A2A protocol operations

use serde_json::Value;

use super::{
    error::{A2AError, A2AResult},
    message::Message,
};

/// A2A protocol operations served by this agent
///
/// Each variant corresponds to one JSON-RPC method. `message/send` and
/// `message/stream` both produce a single completed task.
#[derive(Debug, Clone)]
pub enum A2AOperation {
    /// Send a message to the agent
    SendMessage {
        /// The message to process
        message: Message,

        /// Whether the client asked for a streaming response
        stream: bool,
    },

    /// Get a task by ID
    GetTask {
        /// The task ID to retrieve
        task_id: Option<String>,
    },

    /// Cancel a task
    CancelTask {
        /// The task ID to cancel
        task_id: Option<String>,
    },
}

impl A2AOperation {
    /// Route a JSON-RPC method and its params to an operation
    ///
    /// Unknown methods fail with `MethodNotFound`; a `message/*` call whose params
    /// do not carry a well-formed message fails with `InvalidParams`.
    pub fn from_method(method: &str, params: &Value) -> A2AResult<Self> {
        match method {
            "message/send" | "message/stream" => {
                if !(params.is_object() || params.is_null()) {
                    return Err(A2AError::InvalidParams("params must be an object".into()));
                }
                let message = params
                    .get("message")
                    .ok_or_else(|| A2AError::InvalidParams("params.message is required".into()))?;
                let message: Message = serde_json::from_value(message.clone())
                    .map_err(|e| A2AError::InvalidParams(format!("invalid message: {}", e)))?;

                Ok(A2AOperation::SendMessage {
                    message,
                    stream: method == "message/stream",
                })
            }
            "task/get" | "tasks/get" => Ok(A2AOperation::GetTask {
                task_id: task_id_param(params),
            }),
            "task/cancel" | "tasks/cancel" => Ok(A2AOperation::CancelTask {
                task_id: task_id_param(params),
            }),
            other => Err(A2AError::MethodNotFound {
                method: other.to_string(),
            }),
        }
    }

    /// The JSON-RPC method name for this operation
    pub fn method(&self) -> &'static str {
        match self {
            A2AOperation::SendMessage { stream, .. } => {
                if *stream {
                    "message/stream"
                } else {
                    "message/send"
                }
            }
            A2AOperation::GetTask { .. } => "task/get",
            A2AOperation::CancelTask { .. } => "task/cancel",
        }
    }

    /// Check if the client asked for a streaming response
    pub fn is_streaming(&self) -> bool {
        matches!(self, A2AOperation::SendMessage { stream: true, .. })
    }
}

fn task_id_param(params: &Value) -> Option<String> {
    params
        .get("id")
        .or_else(|| params.get("taskId"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

//! Decides how a failure reaches the client
//!
//! Decode and routing failures become JSON-RPC error envelopes. Failures that
//! happen while executing a resolved intent become a `failed` Task inside a
//! success envelope, so `message/send` always answers with a Task.

use serde_json::Value;
use tracing::warn;

use super::{assembler::TaskAssembler, response::A2AResponse};
use crate::{
    calendar::ExecutionResult,
    codec::JsonRpcResponse,
    protocol::{
        error::{A2AError, A2AResult},
        Message, Task,
    },
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorMapper {
    assembler: TaskAssembler,
}

impl ErrorMapper {
    pub fn new(assembler: TaskAssembler) -> Self {
        Self { assembler }
    }

    /// Turn an execution outcome into a Task, or into an error that will be
    /// rendered as a JSON-RPC error envelope
    pub fn task_outcome(&self, user: &Message, outcome: A2AResult<ExecutionResult>) -> A2AResult<Task> {
        match outcome {
            Ok(result) => Ok(self.assembler.completed(user, &result)),
            Err(error) if error.surfaces_as_task() => {
                warn!(code = error.code(), error = %error, "execution failed");
                Ok(self.assembler.failed(user, &error))
            }
            Err(error) => Err(error),
        }
    }

    /// Render a service result as the response envelope for `id`
    pub fn envelope(&self, id: Value, result: A2AResult<A2AResponse>) -> JsonRpcResponse {
        let rendered = result.and_then(|response| match response {
            A2AResponse::Task(task) => serde_json::to_value(&*task).map_err(A2AError::from),
        });
        match rendered {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => Self::error_envelope(id, &error),
        }
    }

    pub fn error_envelope(id: Value, error: &A2AError) -> JsonRpcResponse {
        JsonRpcResponse::error(id, error)
    }
}

//! A2A task types and lifecycle management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{message::Message, Artifact};

/// A task in the A2A protocol
///
/// This agent runs each task to a terminal state within a single `message/send`
/// call and emits it once; tasks are not retained afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier for the task
    pub id: String,

    /// Context identifier grouping related tasks and messages
    #[serde(rename = "contextId")]
    pub context_id: String,

    /// Always `"task"`
    pub kind: String,

    /// Current status of the task
    pub status: TaskStatus,

    /// Outputs produced by the task
    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    /// Conversation history: the user message followed by the agent reply
    #[serde(default)]
    pub history: Vec<Message>,
}

impl Task {
    /// Create a new submitted task
    pub fn new(id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context_id: context_id.into(),
            kind: "task".to_string(),
            status: TaskStatus::new(TaskState::Submitted),
            artifacts: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Update the task status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach an artifact
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Append a message to the history
    pub fn with_history_message(mut self, message: Message) -> Self {
        self.history.push(message);
        self
    }
}

/// Status of a task at a point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    /// Lifecycle state
    pub state: TaskState,

    /// When the task entered this state
    pub timestamp: DateTime<Utc>,

    /// Agent message explaining the state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl TaskStatus {
    /// Create a status stamped with the current time
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            timestamp: Utc::now(),
            message: None,
        }
    }

    /// Attach the agent message explaining this state
    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }
}

/// Task lifecycle state
///
/// Task lifecycle: submitted → working → completed/failed/cancelled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Task has been received
    Submitted,

    /// Task is currently being processed
    Working,

    /// Task completed successfully
    Completed,

    /// Task failed with an error
    Failed,

    /// Task was cancelled by the client
    Cancelled,
}

impl TaskState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

//! A2A service response types

use crate::protocol::task::Task;

/// Response from the calendar agent service
#[derive(Debug, Clone)]
pub enum A2AResponse {
    /// Terminal task produced by `message/send` or `message/stream`
    Task(Box<Task>),
}

impl A2AResponse {
    pub fn task(task: Task) -> Self {
        A2AResponse::Task(Box::new(task))
    }

    /// Extract the task from the response
    pub fn into_task(self) -> Task {
        match self {
            A2AResponse::Task(task) => *task,
        }
    }
}

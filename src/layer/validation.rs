//! Validation layer for A2A protocol requests and responses

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tower_layer::Layer;
use tower_service::Service;

use crate::{
    protocol::{error::A2AError, operation::A2AOperation, TaskState},
    service::{A2ARequest, A2AResponse},
};

/// Layer that rejects malformed requests before they reach the agent
#[derive(Clone, Debug, Default)]
pub struct A2AValidationLayer;

impl A2AValidationLayer {
    /// Create a new validation layer
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for A2AValidationLayer {
    type Service = A2AValidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        A2AValidationService { inner }
    }
}

/// Validation service that wraps an inner service
#[derive(Clone)]
pub struct A2AValidationService<S> {
    inner: S,
}

impl<S> A2AValidationService<S> {
    /// Validate an A2A request
    ///
    /// A message must yield a non-blank utterance: the first text part is
    /// read, data parts are skipped and a message with only unreadable parts
    /// is unsupported content.
    fn validate_request(req: &A2ARequest) -> Result<(), A2AError> {
        match &req.operation {
            A2AOperation::SendMessage { message, .. } => {
                if message.parts.is_empty() {
                    return Err(A2AError::InvalidParams(
                        "message must have at least one part".into(),
                    ));
                }
                message.utterance()?;
            }
            A2AOperation::GetTask { .. } | A2AOperation::CancelTask { .. } => {}
        }

        Ok(())
    }

    /// Validate an A2A response
    fn validate_response(resp: &A2AResponse) -> Result<(), A2AError> {
        match resp {
            A2AResponse::Task(task) => {
                if task.id.is_empty() {
                    return Err(A2AError::Internal("task id cannot be empty".into()));
                }
                if !task.is_terminal() {
                    return Err(A2AError::Internal(format!(
                        "task {} returned in non-terminal state",
                        task.id
                    )));
                }
                if task.status.state == TaskState::Completed && task.artifacts.is_empty() {
                    return Err(A2AError::Internal(
                        "completed task must carry an artifact".into(),
                    ));
                }
                if task.status.state == TaskState::Failed && task.status.message.is_none() {
                    return Err(A2AError::Internal(
                        "failed task must explain the failure".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl<S> Service<A2ARequest> for A2AValidationService<S>
where
    S: Service<A2ARequest, Response = A2AResponse, Error = A2AError> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = A2AResponse;
    type Error = A2AError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: A2ARequest) -> Self::Future {
        // Validate request before passing to inner service
        if let Err(e) = Self::validate_request(&req) {
            return Box::pin(async move { Err(e) });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let response = inner.call(req).await?;
            Self::validate_response(&response)?;
            Ok(response)
        })
    }
}

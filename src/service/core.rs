//! The calendar agent as a Tower service

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use tower_service::Service;
use tracing::{debug, info, warn};

use crate::{
    calendar::CalendarExecutor,
    intent::IntentResolver,
    protocol::{error::A2AError, operation::A2AOperation},
    service::{mapper::ErrorMapper, A2ARequest, A2AResponse},
};

/// Resolves each message to an intent, executes it and assembles the task
///
/// Steps run strictly in order within a request: extract, resolve, execute,
/// assemble. The service holds no per-request state, so clones share the
/// resolver and executor.
pub struct CalendarAgentService {
    resolver: Arc<IntentResolver>,
    executor: Arc<CalendarExecutor>,
    mapper: ErrorMapper,
}

impl CalendarAgentService {
    pub fn new(resolver: Arc<IntentResolver>, executor: Arc<CalendarExecutor>) -> Self {
        Self {
            resolver,
            executor,
            mapper: ErrorMapper::default(),
        }
    }

    async fn handle(
        resolver: Arc<IntentResolver>,
        executor: Arc<CalendarExecutor>,
        mapper: ErrorMapper,
        req: A2ARequest,
    ) -> Result<A2AResponse, A2AError> {
        let ctx = req.context;
        match req.operation {
            A2AOperation::SendMessage { message, stream } => {
                let utterance = message.utterance()?;
                if stream {
                    debug!(request_id = %ctx.request_id, "streaming requested, answering with final task");
                }

                if ctx.is_expired() {
                    warn!(request_id = %ctx.request_id, "deadline passed before resolution");
                    let task = mapper.task_outcome(&message, Err(A2AError::Timeout))?;
                    return Ok(A2AResponse::task(task));
                }

                let intent = resolver.resolve(&ctx, &utterance).await;
                info!(
                    request_id = %ctx.request_id,
                    intent = intent.kind.as_str(),
                    confidence = intent.confidence,
                    "intent resolved"
                );

                let outcome = executor.execute(&ctx, &intent, &utterance).await;
                let task = mapper.task_outcome(&message, outcome)?;
                Ok(A2AResponse::task(task))
            }
            operation @ (A2AOperation::GetTask { .. } | A2AOperation::CancelTask { .. }) => {
                Err(A2AError::NotImplemented {
                    method: operation.method().to_string(),
                })
            }
        }
    }
}

impl Service<A2ARequest> for CalendarAgentService {
    type Response = A2AResponse;
    type Error = A2AError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: A2ARequest) -> Self::Future {
        let resolver = self.resolver.clone();
        let executor = self.executor.clone();
        let mapper = self.mapper;

        Box::pin(Self::handle(resolver, executor, mapper, req))
    }
}

impl Clone for CalendarAgentService {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            executor: self.executor.clone(),
            mapper: self.mapper,
        }
    }
}

//! A2A service request types

use std::{collections::HashMap, future::Future, time::Duration};

use tokio::time::{timeout_at, Instant};

use crate::protocol::{error::A2AError, operation::A2AOperation};

/// Deadline applied when the transport does not configure one
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A request to the A2A service
///
/// This wraps an A2A operation with the per-request context needed to run it
#[derive(Debug, Clone)]
pub struct A2ARequest {
    /// The A2A operation to execute
    pub operation: A2AOperation,

    /// Request context (deadline, correlation id, metadata)
    pub context: RequestContext,
}

impl A2ARequest {
    /// Create a new A2A request
    pub fn new(operation: A2AOperation, context: RequestContext) -> Self {
        Self { operation, context }
    }
}

/// Per-request context threaded through resolution and execution
///
/// The deadline is fixed when the request arrives. Every call to the language
/// model or the calendar backend runs under [`RequestContext::within`], so a
/// slow dependency cannot hold a request past it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id used in log fields
    pub request_id: String,

    /// Instant after which in-flight I/O is abandoned
    pub deadline: Instant,

    /// Additional metadata from the transport
    pub metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Create a context whose deadline is `timeout` from now
    pub fn new(timeout: Duration) -> Self {
        Self {
            request_id: String::new(),
            deadline: Instant::now() + timeout,
            metadata: HashMap::new(),
        }
    }

    /// Set the correlation id
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Time left before the deadline
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Check if the deadline has passed
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Run `fut` unless the deadline fires first
    ///
    /// The future is dropped when the deadline elapses, which aborts the
    /// underlying I/O.
    pub async fn within<F>(&self, fut: F) -> Result<F::Output, A2AError>
    where
        F: Future,
    {
        timeout_at(self.deadline, fut)
            .await
            .map_err(|_| A2AError::Timeout)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

//! Error types for A2A protocol operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// JSON-RPC error codes used by the agent
pub mod codes {
    /// Malformed envelope
    pub const PARSE_ERROR: i64 = -32700;
    /// Unknown or unimplemented method
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Structurally invalid params
    pub const INVALID_PARAMS: i64 = -32602;
    /// Unexpected internal failure
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Task lookup failed
    pub const TASK_NOT_FOUND: i64 = -32000;
    /// Message content kind the agent cannot handle
    pub const UNSUPPORTED_CONTENT: i64 = -32001;
    /// Calendar backend failure
    pub const CALENDAR_SERVICE: i64 = -32004;
}

/// Main error type for A2A protocol operations
#[derive(Debug, Error)]
pub enum A2AError {
    /// The request body was not valid JSON
    #[error("parse error")]
    Parse(String),

    /// The method is unknown to this agent
    #[error("method not found")]
    MethodNotFound { method: String },

    /// The method is part of the protocol but not served by this agent
    #[error("method not implemented")]
    NotImplemented { method: String },

    /// Params failed structural validation
    #[error("{0}")]
    InvalidParams(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),

    /// Task not found error
    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    /// Message carried no content the agent understands
    #[error("unsupported content type: {0}")]
    UnsupportedContent(String),

    /// The calendar backend failed while executing an operation
    #[error("calendar service error: {message}")]
    CalendarService {
        operation: String,
        calendar_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The per-request deadline elapsed
    #[error("request deadline exceeded")]
    Timeout,

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl A2AError {
    /// Wrap a calendar backend failure with the operation that triggered it
    pub fn calendar_service(
        operation: impl Into<String>,
        calendar_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        A2AError::CalendarService {
            operation: operation.into(),
            calendar_id: calendar_id.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// JSON-RPC error code for this error
    pub fn code(&self) -> i64 {
        match self {
            A2AError::Parse(_) => codes::PARSE_ERROR,
            A2AError::MethodNotFound { .. } | A2AError::NotImplemented { .. } => {
                codes::METHOD_NOT_FOUND
            }
            A2AError::InvalidParams(_) => codes::INVALID_PARAMS,
            A2AError::Internal(_) | A2AError::Timeout | A2AError::Serialization(_) => {
                codes::INTERNAL_ERROR
            }
            A2AError::TaskNotFound { .. } => codes::TASK_NOT_FOUND,
            A2AError::UnsupportedContent(_) => codes::UNSUPPORTED_CONTENT,
            A2AError::CalendarService { .. } => codes::CALENDAR_SERVICE,
        }
    }

    /// Optional structured `data` member of the JSON-RPC error object
    pub fn data(&self) -> Option<Value> {
        match self {
            A2AError::Parse(detail) => Some(json!({ "detail": detail })),
            A2AError::MethodNotFound { method } | A2AError::NotImplemented { method } => {
                Some(json!({ "method": method }))
            }
            A2AError::TaskNotFound { task_id } => Some(json!({ "taskId": task_id })),
            A2AError::CalendarService {
                operation,
                calendar_id,
                timestamp,
                ..
            } => Some(json!({
                "operation": operation,
                "calendarId": calendar_id,
                "timestamp": timestamp.to_rfc3339(),
            })),
            _ => None,
        }
    }

    /// Whether this failure is reported as a `failed` task instead of a JSON-RPC error
    ///
    /// Failures that happen while executing a resolved intent keep the task shape so
    /// clients always get a Task back from `message/send`.
    pub fn surfaces_as_task(&self) -> bool {
        matches!(self, A2AError::CalendarService { .. } | A2AError::Timeout)
    }

    /// Render the JSON-RPC error object for this error
    pub fn to_rpc_error(&self) -> RpcError {
        RpcError {
            code: self.code(),
            message: self.to_string(),
            data: self.data(),
        }
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
    /// Error code from the JSON-RPC taxonomy
    pub code: i64,

    /// Human-readable error message
    pub message: String,

    /// Additional error details as structured data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Result type alias for A2A operations
pub type A2AResult<T> = Result<T, A2AError>;

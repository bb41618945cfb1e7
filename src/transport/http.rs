//! HTTP binding of the agent
//!
//! `POST /a2a` takes JSON-RPC envelopes and always answers 200; protocol
//! failures travel inside the envelope. Discovery and health endpoints are
//! served alongside.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::{util::BoxCloneSyncService, ServiceBuilder, ServiceExt};
use tracing::{debug, error, info};

use crate::{
    codec::{Codec, JsonRpcCodec},
    layer::A2AValidationLayer,
    protocol::{error::A2AError, operation::A2AOperation, AgentCard},
    service::{A2ARequest, A2AResponse, CalendarAgentService, ErrorMapper, RequestContext},
};

/// Type-erased agent service stack shared by all connections
pub type AgentService = BoxCloneSyncService<A2ARequest, A2AResponse, A2AError>;

/// Body sent if encoding the response envelope itself fails
const ENCODE_FAILURE_BODY: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"internal error: response encoding failed"}}"#;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    service: AgentService,
    codec: Arc<dyn Codec>,
    card: Arc<AgentCard>,
    request_timeout: Duration,
    mapper: ErrorMapper,
}

impl AppState {
    pub fn new(service: AgentService, card: AgentCard, request_timeout: Duration) -> Self {
        Self {
            service,
            codec: Arc::new(JsonRpcCodec::new()),
            card: Arc::new(card),
            request_timeout,
            mapper: ErrorMapper::default(),
        }
    }

    /// Wrap the agent in the validation layer and erase its type
    pub fn from_agent(agent: CalendarAgentService, card: AgentCard, request_timeout: Duration) -> Self {
        let service = ServiceBuilder::new()
            .layer(A2AValidationLayer::new())
            .service(agent);
        Self::new(BoxCloneSyncService::new(service), card, request_timeout)
    }
}

/// Routes served by the agent
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/a2a", post(a2a_entry))
        .route("/health", get(health))
        .route("/.well-known/agent.json", get(agent_card))
        .route("/.well-known/agent-card.json", get(agent_card))
        .with_state(state)
}

/// Bind `addr` and serve until ctrl-c
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "calendar agent listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

async fn a2a_entry(State(state): State<AppState>, body: Bytes) -> Response {
    let envelope = match state.codec.decode_request(&body) {
        Ok(envelope) => envelope,
        Err(error) => {
            debug!(error = %error, "rejecting undecodable envelope");
            return respond(&state, ErrorMapper::error_envelope(Value::Null, &error));
        }
    };

    let id = envelope.id.clone();
    let operation = match A2AOperation::from_method(&envelope.method, &envelope.params) {
        Ok(operation) => operation,
        Err(error) => {
            debug!(method = %envelope.method, error = %error, "rejecting request");
            return respond(&state, ErrorMapper::error_envelope(id, &error));
        }
    };

    let request_id = match &id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    info!(request_id = %request_id, method = operation.method(), "a2a request");

    let context = RequestContext::new(state.request_timeout).with_request_id(request_id);
    let result = state
        .service
        .clone()
        .oneshot(A2ARequest::new(operation, context))
        .await;

    let response = state.mapper.envelope(id, result);
    respond(&state, response)
}

fn respond(state: &AppState, envelope: crate::codec::JsonRpcResponse) -> Response {
    let content_type = state.codec.content_type().to_string();
    match state.codec.encode_response(&envelope) {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode response envelope");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json".to_string())],
                ENCODE_FAILURE_BODY,
            )
                .into_response()
        }
    }
}

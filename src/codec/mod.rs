//! Serialization codecs for the A2A protocol binding

pub mod jsonrpc;

pub use jsonrpc::{JsonRpcCodec, JsonRpcRequest, JsonRpcResponse};

use bytes::Bytes;

use crate::protocol::error::A2AError;

/// Codec trait for decoding inbound envelopes and encoding outbound ones
pub trait Codec: Send + Sync {
    /// Deserialize a request body into an envelope
    ///
    /// # Arguments
    ///
    /// * `body` - The raw request body bytes
    ///
    /// # Returns
    ///
    /// The decoded envelope, or a parse error if the body is not a JSON object
    fn decode_request(&self, body: &[u8]) -> Result<JsonRpcRequest, A2AError>;

    /// Serialize a request envelope back to bytes
    fn encode_request(&self, request: &JsonRpcRequest) -> Result<Bytes, A2AError>;

    /// Serialize a response envelope to bytes for the transport
    fn encode_response(&self, response: &JsonRpcResponse) -> Result<Bytes, A2AError>;

    /// Get the content type for this codec
    fn content_type(&self) -> &str;
}

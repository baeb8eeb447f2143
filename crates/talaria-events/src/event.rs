//! The inbound and outbound event envelopes.
//!
//! These mirror the cloud provider's wire shapes, reduced to the fields the
//! adapters consume. Unknown fields are ignored on the way in; missing ones
//! read as their defaults, since authorizer payloads in particular vary by
//! deployment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An HTTP gateway invocation event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayEvent {
    /// The raw request body. May be empty.
    pub body: String,

    /// Request metadata assigned by the gateway.
    pub request_context: GatewayRequestContext,

    /// Path parameters extracted by the gateway route, keyed by name.
    pub path_parameters: HashMap<String, String>,
}

/// Gateway-assigned request metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayRequestContext {
    /// The gateway's request id, carried into logs and downstream calls.
    pub request_id: String,

    /// The authorizer outcome, when the route is authenticated.
    pub authorizer: Option<GatewayAuthorizer>,
}

/// The authorizer section of the request context.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayAuthorizer {
    /// The JWT authorizer outcome.
    pub jwt: JwtAuthorizer,
}

/// Claims and scopes as validated by the gateway's JWT authorizer.
///
/// The authorizer coerces every claim value to a string, including list
/// claims such as `aud`, which arrive bracketed (`"[a b]"`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JwtAuthorizer {
    /// Claim name to stringified claim value.
    pub claims: HashMap<String, String>,

    /// The token scopes. Null when the token carries none.
    pub scopes: Option<Vec<String>>,
}

/// The response envelope returned to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    /// HTTP status code.
    pub status_code: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body. Empty for no-content responses.
    pub body: String,

    /// Whether `body` is base64-encoded. Always `false`: bodies are JSON.
    pub is_base64_encoded: bool,
}

/// A queue invocation event: one small batch of messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueEvent {
    /// The messages in the batch.
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueRecord>,
}

/// One queued message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueRecord {
    /// The queue's message id, carried into logs.
    pub message_id: String,

    /// The message payload, treated as an RPC request body.
    pub body: String,
}

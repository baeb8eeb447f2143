//! Request context types.
//!
//! The [`RequestContext`] carries all per-request state from an adapter into
//! a handler: the upstream request id, the caller identity, and the logging
//! span the invoker nests its own span under.

use serde::{Deserialize, Serialize};
use tracing::Span;
use uuid::Uuid;

use crate::identity::Identity;

/// A unique identifier for locally originated requests, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking and
/// log correlation. Gateway-originated requests keep the id the gateway
/// assigned instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID, e.g. one parsed from a
    /// header.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request context passed to every handler.
///
/// The context is the single carrier of request-scoped values; the library
/// holds no request state in globals. Adapters build one per invocation,
/// service hooks decorate it, handlers read it.
///
/// # Example
///
/// ```
/// use talaria_core::RequestContext;
///
/// let ctx = RequestContext::new().with_request_id("req_123");
/// assert_eq!(ctx.request_id(), Some("req_123"));
/// assert!(ctx.identity().is_anonymous());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The upstream request id, when one exists.
    request_id: Option<String>,

    /// The authenticated caller. Zero record when unauthenticated.
    identity: Identity,

    /// The span request-scoped log events attach to.
    span: Span,
}

impl RequestContext {
    /// Creates an empty context: no request id, anonymous identity, no span.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: None,
            identity: Identity::default(),
            span: Span::none(),
        }
    }

    /// Creates a context for testing purposes.
    #[must_use]
    pub fn mock() -> Self {
        Self::new()
    }

    /// Returns the request id, if one was attached.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns a new context with the request id set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns the caller identity.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns a new context with the caller identity set.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    /// Returns the request-scoped logging span.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Returns a new context with the logging span set.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_is_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_request_id_display() {
        let display = RequestId::new().to_string();
        assert_eq!(display.len(), 36);
        assert!(display.contains('-'));
    }

    #[test]
    fn test_request_id_serialization() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).expect("serialization should work");
        let parsed: RequestId = serde_json::from_str(&json).expect("deserialization should work");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_new_context_is_empty() {
        let ctx = RequestContext::new();
        assert!(ctx.request_id().is_none());
        assert!(ctx.identity().is_anonymous());
        assert!(ctx.span().is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let identity = Identity {
            subject: "user_123".into(),
            ..Identity::default()
        };

        let ctx = RequestContext::new()
            .with_request_id("req_1")
            .with_identity(identity);

        assert_eq!(ctx.request_id(), Some("req_1"));
        assert_eq!(ctx.identity().subject, "user_123");
    }
}

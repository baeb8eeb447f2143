//! Method descriptors.
//!
//! A [`Method`] is the registration-time artefact for one RPC endpoint: its
//! name, its type-erased handler, its compiled request schema, and the two
//! flags recording whether it consumes a request body and produces a
//! response body.
//!
//! # The four permitted handler shapes
//!
//! A handler always takes the [`RequestContext`] first and always finishes
//! with the error channel; what varies is whether it consumes a request
//! record and whether it produces a response record. Each combination has
//! its own constructor:
//!
//! | constructor | handler signature |
//! |---|---|
//! | [`Method::request_response`] | `(RequestContext, Req) -> Result<Option<Res>>` |
//! | [`Method::request_only`] | `(RequestContext, Req) -> Result<()>` |
//! | [`Method::response_only`] | `(RequestContext) -> Result<Option<Res>>` |
//! | [`Method::no_body`] | `(RequestContext) -> Result<()>` |
//!
//! `Req` must deserialize from JSON, `Res` must serialize to it, and both
//! request-taking shapes require a JSON Schema: there is no way to register
//! a handler that could receive an unvalidated body.
//!
//! The error channel is `anyhow::Error`. Returning an
//! [`RpcError`](crate::RpcError) through it is the expected-failure path;
//! anything else is treated as unhandled and reaches the wire as `unknown`.
//!
//! Handlers returning `Ok(None)` from the `Option<Res>` shapes produce the
//! no-content reply (HTTP 204) rather than a JSON `null` body.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::codes;
use crate::context::RequestContext;
use crate::error::RpcError;

/// The normalised result of a successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The handler succeeded and there is no body to serialise (HTTP 204).
    ///
    /// Distinct from a body of JSON `null`.
    NoContent,

    /// The response record, ready for JSON serialisation by the adapter.
    Json(Value),
}

impl Reply {
    /// Returns `true` for the no-content sentinel.
    #[must_use]
    pub fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }

    /// Returns the response body, or `None` for the no-content sentinel.
    #[must_use]
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::NoContent => None,
            Self::Json(value) => Some(value),
        }
    }
}

pub(crate) type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<Reply>> + Send>>;
pub(crate) type BoxedHandler = Box<dyn Fn(RequestContext, Bytes) -> HandlerFuture + Send + Sync>;

/// A validated, registered RPC method.
///
/// Built once at process init, immutable afterwards, safe to invoke from
/// concurrently executing requests.
///
/// # Panics
///
/// All constructors panic when given an empty name, and the request-taking
/// constructors panic when the schema does not compile. Registration
/// failures are programming errors and must surface at init, never at serve
/// time.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
/// use talaria_core::{Method, RequestContext};
///
/// #[derive(Deserialize)]
/// struct EchoRequest {
///     name: String,
/// }
///
/// #[derive(Serialize)]
/// struct EchoResponse {
///     name: String,
/// }
///
/// let schema = json!({
///     "type": "object",
///     "properties": {"name": {"type": "string"}},
///     "required": ["name"],
/// });
///
/// let method = Method::request_response(
///     "echo",
///     &schema,
///     |_ctx: RequestContext, req: EchoRequest| async move {
///         Ok(Some(EchoResponse { name: req.name }))
///     },
/// );
///
/// assert!(method.expects_request_body());
/// assert!(method.expects_response_body());
/// ```
pub struct Method {
    pub(crate) name: String,
    pub(crate) handler: BoxedHandler,
    pub(crate) schema: Option<jsonschema::Validator>,
    pub(crate) expects_request_body: bool,
    pub(crate) expects_response_body: bool,
}

impl Method {
    /// Registers a handler that consumes a request record and produces a
    /// response record.
    pub fn request_response<Req, Res, F, Fut>(
        name: impl Into<String>,
        schema: &Value,
        handler: F,
    ) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        F: Fn(RequestContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Res>>> + Send + 'static,
    {
        let erased: BoxedHandler = Box::new(move |ctx, body| {
            let call = decode::<Req>(&body).map(|request| handler(ctx, request));
            Box::pin(async move { encode(call?.await?) })
        });

        Self::build(name, Some(schema), erased, true, true)
    }

    /// Registers a handler that consumes a request record and produces no
    /// response body.
    pub fn request_only<Req, F, Fut>(name: impl Into<String>, schema: &Value, handler: F) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        F: Fn(RequestContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let erased: BoxedHandler = Box::new(move |ctx, body| {
            let call = decode::<Req>(&body).map(|request| handler(ctx, request));
            Box::pin(async move {
                call?.await?;
                Ok(Reply::NoContent)
            })
        });

        Self::build(name, Some(schema), erased, true, false)
    }

    /// Registers a handler that takes no request body and produces a
    /// response record.
    pub fn response_only<Res, F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        Res: Serialize + Send + 'static,
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Res>>> + Send + 'static,
    {
        let erased: BoxedHandler = Box::new(move |ctx, _body| {
            let call = handler(ctx);
            Box::pin(async move { encode(call.await?) })
        });

        Self::build(name, None, erased, false, true)
    }

    /// Registers a handler that takes no request body and produces no
    /// response body.
    pub fn no_body<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let erased: BoxedHandler = Box::new(move |ctx, _body| {
            let call = handler(ctx);
            Box::pin(async move {
                call.await?;
                Ok(Reply::NoContent)
            })
        });

        Self::build(name, None, erased, false, false)
    }

    fn build(
        name: impl Into<String>,
        schema: Option<&Value>,
        handler: BoxedHandler,
        expects_request_body: bool,
        expects_response_body: bool,
    ) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "rpc method name must not be empty");

        let schema = schema.map(|raw| {
            jsonschema::validator_for(raw).unwrap_or_else(|err| {
                panic!("cannot compile schema for rpc method {name}: {err}")
            })
        });

        Self {
            name,
            handler,
            schema,
            expects_request_body,
            expects_response_body,
        }
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` when the handler consumes a request record.
    #[must_use]
    pub fn expects_request_body(&self) -> bool {
        self.expects_request_body
    }

    /// Returns `true` when the handler produces a response record.
    #[must_use]
    pub fn expects_response_body(&self) -> bool {
        self.expects_response_body
    }

    /// Returns `true` when a compiled request schema is attached.
    #[must_use]
    pub fn has_schema(&self) -> bool {
        self.schema.is_some()
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("expects_request_body", &self.expects_request_body)
            .field("expects_response_body", &self.expects_response_body)
            .field("has_schema", &self.schema.is_some())
            .finish_non_exhaustive()
    }
}

fn decode<Req: DeserializeOwned>(body: &[u8]) -> Result<Req, RpcError> {
    serde_json::from_slice(body)
        .map_err(|err| RpcError::wrap(codes::INVALID_BODY, err).with_message("body parsing error"))
}

fn encode<Res: Serialize>(response: Option<Res>) -> anyhow::Result<Reply> {
    match response {
        None => Ok(Reply::NoContent),
        Some(record) => Ok(Reply::Json(serde_json::to_value(record)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct TestRequest {
        name: String,
    }

    #[derive(Serialize)]
    struct TestResponse {
        greeting: String,
    }

    fn test_schema() -> Value {
        json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"],
        })
    }

    #[test]
    fn test_shape_flags() {
        let schema = test_schema();

        let rr = Method::request_response(
            "rr",
            &schema,
            |_ctx: RequestContext, req: TestRequest| async move {
                Ok(Some(TestResponse {
                    greeting: req.name,
                }))
            },
        );
        assert!(rr.expects_request_body() && rr.expects_response_body());
        assert!(rr.has_schema());

        let ro =
            Method::request_only("ro", &schema, |_ctx, _req: TestRequest| async move { Ok(()) });
        assert!(ro.expects_request_body() && !ro.expects_response_body());
        assert!(ro.has_schema());

        let pr = Method::response_only("pr", |_ctx| async move {
            Ok(Some(TestResponse {
                greeting: "hi".into(),
            }))
        });
        assert!(!pr.expects_request_body() && pr.expects_response_body());
        assert!(!pr.has_schema());

        let nb = Method::no_body("nb", |_ctx| async move { Ok(()) });
        assert!(!nb.expects_request_body() && !nb.expects_response_body());
        assert!(!nb.has_schema());
    }

    #[test]
    #[should_panic(expected = "method name must not be empty")]
    fn test_empty_name_panics() {
        let _ = Method::no_body("", |_ctx| async move { Ok(()) });
    }

    #[test]
    #[should_panic(expected = "cannot compile schema for rpc method broken")]
    fn test_uncompilable_schema_panics() {
        let schema = json!({"type": "no_such_type"});
        let _ = Method::request_only("broken", &schema, |_ctx, _req: TestRequest| async move {
            Ok(())
        });
    }

    #[test]
    fn test_reply_sentinel_is_not_null() {
        assert!(Reply::NoContent.is_no_content());
        assert!(!Reply::Json(Value::Null).is_no_content());
        assert_eq!(Reply::NoContent.into_json(), None);
        assert_eq!(Reply::Json(Value::Null).into_json(), Some(Value::Null));
    }
}

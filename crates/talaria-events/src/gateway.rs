//! The HTTP gateway adapter.
//!
//! Translates one gateway event into one method invocation and the outcome
//! into the gateway's response envelope. Every failure becomes a serialised
//! wire error; the adapter itself never fails the function invocation.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info_span};

use talaria_core::{codes, Claims, Reply, RequestContext, RpcError, Service};

use crate::event::{GatewayEvent, GatewayResponse, JwtAuthorizer};

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// Serves a [`Service`] behind an HTTP gateway trigger.
///
/// Method resolution supports both deployment styles: a multi-handler
/// deploy routes on the `method` path parameter, a single-handler deploy
/// (a service carrying exactly one method, no path parameter) routes to
/// that method directly.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use talaria_core::{Method, Service};
/// use talaria_events::GatewayHandler;
///
/// let service = Service::new().add_method(Method::no_body("ping", |_ctx| async move { Ok(()) }));
/// let handler = GatewayHandler::new(Arc::new(service));
/// ```
#[derive(Debug, Clone)]
pub struct GatewayHandler {
    service: Arc<Service>,
}

impl GatewayHandler {
    /// Creates a gateway binding for the given service.
    #[must_use]
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }

    /// Handles one gateway event.
    ///
    /// Attaches the gateway request id to the request span, applies the
    /// identity and context hooks, resolves the method, invokes it, and
    /// serialises the outcome.
    pub async fn handle(&self, event: GatewayEvent) -> GatewayResponse {
        let request_id = event.request_context.request_id.clone();
        let span = info_span!("gateway_request", request_id = %request_id);

        let mut ctx = RequestContext::new()
            .with_request_id(request_id)
            .with_span(span.clone());

        if self.service.has_identity_provider() {
            let claims = event
                .request_context
                .authorizer
                .as_ref()
                .map(|authorizer| access_token_claims(&authorizer.jwt))
                .unwrap_or_default();

            ctx = self.service.apply_identity_provider(ctx, &claims);
        }

        let method = match self.resolve_method(&event) {
            Ok(method) => method,
            Err(err) => {
                span.in_scope(|| error!(err_code = err.code(), "request failed"));
                return error_response(&err);
            }
        };

        let ctx = self.service.apply_context_providers(ctx);

        match method.invoke(ctx, event.body.as_bytes()).await {
            Ok(Reply::NoContent) => no_content_response(),
            Ok(Reply::Json(value)) => match serde_json::to_string(&value) {
                Ok(body) => json_response(200, body),
                Err(err) => {
                    span.in_scope(|| {
                        error!(error = %err, "encoding response body failed");
                    });
                    error_response(&RpcError::new(codes::UNKNOWN))
                }
            },
            Err(err) => error_response(&err),
        }
    }

    fn resolve_method(&self, event: &GatewayEvent) -> Result<&talaria_core::Method, RpcError> {
        if let Some(name) = event.path_parameters.get("method") {
            return self
                .service
                .get_method(name)
                .ok_or_else(|| RpcError::new(codes::METHOD_NOT_FOUND));
        }

        self.service
            .single_method()
            .ok_or_else(|| RpcError::new(codes::METHOD_NOT_FOUND))
    }
}

/// Rebuilds an access-token claims mapping from the authorizer payload.
///
/// The authorizer flattens every claim to a string; a list-valued `aud`
/// arrives as `"[a b]"` and is split back into a list for compatibility
/// with token-issuer output. `scope` is synthesised from the event's scopes
/// list as a space-joined string.
pub(crate) fn access_token_claims(jwt: &JwtAuthorizer) -> Claims {
    let mut claims = Claims::new();

    let scopes = jwt.scopes.clone().unwrap_or_default();
    claims.insert("scope".into(), Value::String(scopes.join(" ")));

    for (key, value) in &jwt.claims {
        if key == "aud" {
            let audience: Vec<Value> = value
                .trim_start_matches('[')
                .trim_end_matches(']')
                .split(' ')
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_string()))
                .collect();
            claims.insert("aud".into(), Value::Array(audience));
        } else {
            claims.insert(key.clone(), Value::String(value.clone()));
        }
    }

    claims
}

fn no_content_response() -> GatewayResponse {
    GatewayResponse {
        status_code: 204,
        headers: HashMap::new(),
        body: String::new(),
        is_base64_encoded: false,
    }
}

fn json_response(status_code: u16, body: String) -> GatewayResponse {
    GatewayResponse {
        status_code,
        headers: HashMap::from([("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string())]),
        body,
        is_base64_encoded: false,
    }
}

fn error_response(err: &RpcError) -> GatewayResponse {
    let body = serde_json::to_string(err)
        .unwrap_or_else(|_| format!(r#"{{"code":"{}"}}"#, codes::UNKNOWN));

    json_response(err.http_status().as_u16(), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_access_token_claims_splits_audience() {
        let jwt = JwtAuthorizer {
            claims: HashMap::from([
                ("aud".to_string(), "[client_222 client_111]".to_string()),
                ("sub".to_string(), "user_123".to_string()),
            ]),
            scopes: Some(vec!["one".to_string(), "two".to_string()]),
        };

        let claims = access_token_claims(&jwt);
        assert_eq!(claims["aud"], json!(["client_222", "client_111"]));
        assert_eq!(claims["sub"], json!("user_123"));
        assert_eq!(claims["scope"], json!("one two"));
    }

    #[test]
    fn test_access_token_claims_with_null_scopes() {
        let jwt = JwtAuthorizer {
            claims: HashMap::from([("sub".to_string(), "user_123".to_string())]),
            scopes: None,
        };

        let claims = access_token_claims(&jwt);
        assert_eq!(claims["scope"], json!(""));
    }

    #[test]
    fn test_error_response_shape() {
        let response = error_response(&RpcError::new(codes::METHOD_NOT_FOUND));
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, r#"{"code":"method_not_found"}"#);
        assert_eq!(response.headers["Content-Type"], CONTENT_TYPE_JSON);
    }
}

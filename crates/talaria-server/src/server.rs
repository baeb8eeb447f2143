//! The development HTTP server.
//!
//! Built on Hyper and Tokio, following the same connection-per-task model as
//! a production server but with none of the deployment machinery: no TLS,
//! no graceful drain, a fixed 60-second request timeout, and permissive CORS
//! so browser-based tooling can call it directly.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Method as HttpMethod, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, info_span, warn};

use talaria_core::{codes, Claims, RequestContext, RequestId, RpcError, Service};

use crate::auth::Authenticator;

const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
const CORS_METHODS: &str = "DELETE,GET,HEAD,PUT,POST,PATCH,OPTIONS";
const CORS_HEADERS: &str = "Authorization,Content-Type,Host,Origin,Accept";

/// Type alias for the HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// Errors surfaced while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("cannot bind to {addr}: {source}")]
    Bind {
        /// The configured listen address.
        addr: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The mounted services are inconsistent with the configuration.
    #[error("invalid server configuration: {0}")]
    Config(String),

    /// An I/O failure while accepting connections.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

struct Mount {
    path: String,
    service: Arc<Service>,
    authenticate: bool,
}

/// The development server builder.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use talaria_core::{Method, Service};
/// use talaria_server::Server;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), talaria_server::ServerError> {
/// let service =
///     Service::new().add_method(Method::no_body("ping", |_ctx| async move { Ok(()) }));
///
/// Server::new("127.0.0.1:8080")
///     .add_service("svc", Arc::new(service), false)
///     .listen()
///     .await
/// # }
/// ```
pub struct Server {
    listen_addr: String,
    request_timeout: Duration,
    mounts: Vec<Mount>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl Server {
    /// Creates a server that will listen on the given address.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            listen_addr: addr.into(),
            request_timeout: Duration::from_secs(60),
            mounts: Vec::new(),
            authenticator: None,
        }
    }

    /// Configures the authenticator used by authenticated mounts.
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Mounts a service's methods under `/<path>/<methodName>`.
    ///
    /// When `authenticate` is set, requests to this mount must carry an
    /// `Authorization` header acceptable to the configured
    /// [`Authenticator`], and the resulting claims are run through the
    /// service's identity provider.
    #[must_use]
    pub fn add_service(mut self, path: impl Into<String>, service: Arc<Service>, authenticate: bool) -> Self {
        self.mounts.push(Mount {
            path: path.into().trim_matches('/').to_string(),
            service,
            authenticate,
        });
        self
    }

    /// Binds the listen address without accepting connections yet.
    ///
    /// Useful for tests that listen on port 0 and need the bound address.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound, or when a mount requires
    /// authentication but no authenticator is configured.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        if self.authenticator.is_none() && self.mounts.iter().any(|mount| mount.authenticate) {
            return Err(ServerError::Config(
                "an authenticated service is mounted but no authenticator is configured".into(),
            ));
        }

        let listener = TcpListener::bind(&self.listen_addr).await.map_err(|source| {
            ServerError::Bind {
                addr: self.listen_addr.clone(),
                source,
            }
        })?;
        let local_addr = listener.local_addr()?;

        Ok(BoundServer {
            listener,
            local_addr,
            inner: Arc::new(Inner {
                request_timeout: self.request_timeout,
                mounts: self.mounts,
                authenticator: self.authenticator,
            }),
        })
    }

    /// Binds and serves until the process exits.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound or accepting connections
    /// fails; individual connection errors are logged, not returned.
    pub async fn listen(self) -> Result<(), ServerError> {
        self.bind().await?.serve().await
    }
}

/// A server bound to its listen address.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BoundServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundServer")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl BoundServer {
    /// Returns the address the server is listening on.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts and serves connections until the process exits.
    ///
    /// # Errors
    ///
    /// Fails when accepting connections fails fatally.
    pub async fn serve(self) -> Result<(), ServerError> {
        info!("dev server listening on {}", self.local_addr);

        loop {
            let (stream, remote_addr) = self.listener.accept().await?;
            let inner = Arc::clone(&self.inner);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req: Request<Incoming>| {
                    let inner = Arc::clone(&inner);
                    async move { inner.handle_request(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("connection error from {remote_addr}: {err}");
                }
            });
        }
    }
}

struct Inner {
    request_timeout: Duration,
    mounts: Vec<Mount>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl Inner {
    async fn handle_request(&self, req: Request<Incoming>) -> Result<HttpResponse, Infallible> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let Some((mount, rpc_method_name)) = self.resolve_mount(&path) else {
            return Ok(error_with_status(
                StatusCode::NOT_FOUND,
                &RpcError::new(codes::METHOD_NOT_FOUND),
            ));
        };

        if method == HttpMethod::OPTIONS {
            return Ok(preflight_response());
        }

        if method != HttpMethod::POST {
            return Ok(error_response(
                &RpcError::new(codes::BAD_REQUEST).with_message("rpc methods accept POST only"),
            ));
        }

        let request_id = RequestId::new();
        let span = info_span!("http_request", request_id = %request_id);

        let mut ctx = RequestContext::new()
            .with_request_id(request_id.to_string())
            .with_span(span.clone());

        let authorization = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if mount.authenticate {
            match self.authenticate(authorization.as_deref()) {
                Ok(claims) => {
                    ctx = mount.service.apply_identity_provider(ctx, &claims);
                }
                Err(err) => return Ok(error_response(&err)),
            }
        }

        let Some(rpc_method) = mount.service.get_method(rpc_method_name) else {
            return Ok(error_with_status(
                StatusCode::NOT_FOUND,
                &RpcError::new(codes::METHOD_NOT_FOUND),
            ));
        };

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                span.in_scope(|| warn!(error = %err, "failed to read request body"));
                return Ok(error_response(&RpcError::new(codes::INVALID_BODY)));
            }
        };

        let ctx = mount.service.apply_context_providers(ctx);

        let outcome = tokio::time::timeout(self.request_timeout, rpc_method.invoke(ctx, &body)).await;

        let response = match outcome {
            Ok(Ok(reply)) => match reply.into_json() {
                None => no_content_response(),
                Some(value) => match serde_json::to_string(&value) {
                    Ok(body) => json_response(StatusCode::OK, body),
                    Err(err) => {
                        span.in_scope(|| error!(error = %err, "encoding response failed"));
                        error_response(&RpcError::new(codes::UNKNOWN))
                    }
                },
            },
            Ok(Err(err)) => error_response(&err),
            Err(_elapsed) => {
                span.in_scope(|| warn!("rpc request timed out"));
                error_response(&RpcError::new(codes::UNKNOWN))
            }
        };

        Ok(response)
    }

    /// Finds the mount owning the path and splits off the method name.
    fn resolve_mount<'a>(&'a self, path: &'a str) -> Option<(&'a Mount, &'a str)> {
        let path = path.trim_start_matches('/');

        self.mounts.iter().find_map(|mount| {
            let remainder = path.strip_prefix(mount.path.as_str())?;
            let method_name = remainder.strip_prefix('/')?;
            Some((mount, method_name))
        })
    }

    fn authenticate(&self, authorization: Option<&str>) -> Result<Claims, RpcError> {
        let token = authorization.ok_or_else(|| RpcError::new(codes::NO_AUTHENTICATION))?;

        let authenticator = self
            .authenticator
            .as_ref()
            .ok_or_else(|| RpcError::new(codes::NO_AUTHENTICATION))?;

        authenticator.authenticate(token)
    }
}

fn base_response(status: StatusCode) -> http::response::Builder {
    Response::builder()
        .status(status)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", CORS_METHODS)
        .header("Access-Control-Allow-Headers", CORS_HEADERS)
}

fn preflight_response() -> HttpResponse {
    base_response(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn no_content_response() -> HttpResponse {
    base_response(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn json_response(status: StatusCode, body: String) -> HttpResponse {
    base_response(status)
        .header("Content-Type", CONTENT_TYPE_JSON)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn error_response(err: &RpcError) -> HttpResponse {
    error_with_status(err.http_status(), err)
}

fn error_with_status(status: StatusCode, err: &RpcError) -> HttpResponse {
    let body = serde_json::to_string(err)
        .unwrap_or_else(|_| format!(r#"{{"code":"{}"}}"#, codes::UNKNOWN));

    json_response(status, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use talaria_core::Method;

    fn ping_service() -> Arc<Service> {
        Arc::new(Service::new().add_method(Method::no_body("ping", |_ctx| async move { Ok(()) })))
    }

    #[test]
    fn test_resolve_mount() {
        let inner = Inner {
            request_timeout: Duration::from_secs(60),
            mounts: vec![Mount {
                path: "svc".into(),
                service: ping_service(),
                authenticate: false,
            }],
            authenticator: None,
        };

        let (mount, method) = inner.resolve_mount("/svc/ping").expect("route should match");
        assert_eq!(mount.path, "svc");
        assert_eq!(method, "ping");

        assert!(inner.resolve_mount("/other/ping").is_none());
        assert!(inner.resolve_mount("/svc").is_none());
    }

    #[test]
    fn test_error_response_carries_cors_and_content_type() {
        let response = error_response(&RpcError::new(codes::FORBIDDEN));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers()["Access-Control-Allow-Origin"],
            "*"
        );
        assert_eq!(response.headers()["Content-Type"], CONTENT_TYPE_JSON);
    }

    #[tokio::test]
    async fn test_bind_rejects_unauthenticatable_mounts() {
        let server =
            Server::new("127.0.0.1:0").add_service("svc", ping_service(), true);

        let err = server.bind().await.expect_err("bind should fail");
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[tokio::test]
    async fn test_bind_on_ephemeral_port() {
        let server = Server::new("127.0.0.1:0").add_service("svc", ping_service(), false);
        let bound = server.bind().await.expect("bind should succeed");
        assert_ne!(bound.local_addr().port(), 0);
    }
}

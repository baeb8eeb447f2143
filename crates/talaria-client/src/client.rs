//! The RPC client.

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use talaria_core::{codes, RequestContext, RpcError};

const USER_AGENT_SUFFIX: &str = "talaria-rpc-client 0.1";

/// Options for building an [`RpcClient`].
#[derive(Debug, Default)]
pub struct ClientOptions {
    /// The base URL of the target service, without a trailing slash.
    pub base_url: String,

    /// The `Authorization` header value to send, scheme included.
    pub access_token: Option<String>,

    /// The calling service's name, reported in `User-Agent`.
    pub client_name: String,

    /// A preconfigured transport, for timeouts, proxies or pooling tweaks.
    pub http: Option<reqwest::Client>,
}

/// A client for one downstream Talaria service.
///
/// # Example
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
/// use talaria_client::RpcClient;
/// use talaria_core::{RequestContext, RpcError};
///
/// #[derive(Serialize)]
/// struct GetUserRequest {
///     user_id: String,
/// }
///
/// #[derive(Deserialize)]
/// struct User {
///     id: String,
///     name: String,
/// }
///
/// async fn fetch_user(ctx: &RequestContext) -> Result<Option<User>, RpcError> {
///     let client = RpcClient::new("https://users.internal", None, "billing");
///     client
///         .call(ctx, "getUser", Some(&GetUserRequest { user_id: "user_123".into() }))
///         .await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RpcClient {
    base_url: String,
    access_token: Option<String>,
    client_name: String,
    http: reqwest::Client,
}

impl RpcClient {
    /// Creates a client with the default transport.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<String>,
        client_name: impl Into<String>,
    ) -> Self {
        Self::with_options(ClientOptions {
            base_url: base_url.into(),
            access_token,
            client_name: client_name.into(),
            http: None,
        })
    }

    /// Creates a client from options, keeping any transport supplied.
    #[must_use]
    pub fn with_options(options: ClientOptions) -> Self {
        Self {
            base_url: options.base_url.trim_end_matches('/').to_string(),
            access_token: options.access_token,
            client_name: options.client_name,
            http: options.http.unwrap_or_default(),
        }
    }

    /// Calls a method on the downstream service.
    ///
    /// `Ok(None)` is a no-content response; `Ok(Some)` carries the decoded
    /// response record. Pass `body: None::<&()>` for methods that take no
    /// request body.
    ///
    /// # Errors
    ///
    /// A wire error with a non-empty code is returned as-is: error codes
    /// survive the hop. Transport failures and protocol-shape violations
    /// are logged and returned as `downstream_request_failed`.
    pub async fn call<Res, Req>(
        &self,
        ctx: &RequestContext,
        method: &str,
        body: Option<&Req>,
    ) -> Result<Option<Res>, RpcError>
    where
        Res: DeserializeOwned,
        Req: Serialize + Sync + ?Sized,
    {
        match self.call_inner(ctx, method, body).await {
            Ok(response) => Ok(response),
            Err(err) => match err.downcast::<RpcError>() {
                Ok(wire) => Err(wire),
                Err(other) => {
                    let detail =
                        format!("url={} method={method} err={other:#}", self.base_url);
                    ctx.span().in_scope(|| {
                        warn!(error = detail.as_str(), "downstream rpc request failed");
                    });
                    Err(RpcError::new(codes::DOWNSTREAM_REQUEST_FAILED))
                }
            },
        }
    }

    async fn call_inner<Res, Req>(
        &self,
        ctx: &RequestContext,
        method: &str,
        body: Option<&Req>,
    ) -> anyhow::Result<Option<Res>>
    where
        Res: DeserializeOwned,
        Req: Serialize + Sync + ?Sized,
    {
        let url = format!("{}/{}", self.base_url, method);

        let mut request = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .header(
                USER_AGENT,
                format!("{} ({USER_AGENT_SUFFIX})", self.client_name),
            );

        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json; charset=utf-8")
                .body(serde_json::to_vec(body)?);
        }

        if let Some(token) = &self.access_token {
            request = request.header(AUTHORIZATION, token.as_str());
        }

        if let Some(request_id) = ctx.request_id() {
            request = request.header("X-Parent-Request-ID", request_id);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status == StatusCode::NO_CONTENT {
            anyhow::ensure!(bytes.is_empty(), "unexpected content for 204 response");
            return Ok(None);
        }

        if status == StatusCode::OK {
            anyhow::ensure!(!bytes.is_empty(), "no body for 200 response");
            return Ok(Some(serde_json::from_slice(&bytes)?));
        }

        // Anything else should be a serialised wire error; pass it through
        // intact when it is one.
        if let Ok(wire) = serde_json::from_slice::<RpcError>(&bytes) {
            if !wire.code().is_empty() {
                return Err(wire.into());
            }
        }

        anyhow::bail!("unexpected response status {status}")
    }
}

//! # Talaria
//!
//! **A service runtime toolkit for JSON-over-HTTP RPC endpoints on cloud
//! functions.**
//!
//! Talaria takes typed handler functions and serves them behind an HTTP
//! gateway trigger, a queue trigger, or a local development server, with a
//! single invocation pipeline underneath all three: JSON Schema validation,
//! typed body decoding, and normalisation of every outcome onto a stable
//! wire error vocabulary.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//! use talaria::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct GreetRequest {
//!     name: String,
//! }
//!
//! #[derive(Serialize)]
//! struct GreetResponse {
//!     greeting: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     talaria::telemetry::init_logging(&talaria::telemetry::LogConfig::development())?;
//!
//!     let schema = json!({
//!         "type": "object",
//!         "properties": {"name": {"type": "string"}},
//!         "required": ["name"],
//!     });
//!
//!     let service = Service::new()
//!         .with_identity_provider(|ctx, claims| {
//!             ctx.with_identity(Identity::from_claims(claims))
//!         })
//!         .add_method(Method::no_body("ping", |_ctx| async move { Ok(()) }))
//!         .add_method(Method::request_response(
//!             "greet",
//!             &schema,
//!             |_ctx, req: GreetRequest| async move {
//!                 Ok(Some(GreetResponse {
//!                     greeting: format!("hello, {}", req.name),
//!                 }))
//!             },
//!         ));
//!
//!     talaria::server::Server::new("127.0.0.1:8080")
//!         .add_service("svc", Arc::new(service), false)
//!         .listen()
//!         .await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/talaria/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export the core types
pub use talaria_core as core;

// Re-export the event bindings
pub use talaria_events as events;

// Re-export the development server
pub use talaria_server as server;

// Re-export the RPC client
pub use talaria_client as client;

// Re-export the telemetry bootstrap
pub use talaria_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use talaria::prelude::*;
/// ```
pub mod prelude {
    pub use talaria_core::{
        codes, Claims, Identity, Meta, Method, Reply, RequestContext, RequestId, RpcError, Service,
    };

    pub use talaria_events::{GatewayHandler, QueueHandler};

    pub use talaria_client::RpcClient;
}

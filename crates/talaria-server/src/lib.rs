//! # Talaria Server
//!
//! A local development HTTP server for Talaria services.
//!
//! Deployed services run behind a gateway or a queue; this server mounts the
//! same [`Service`](talaria_core::Service) handlers onto a plain HTTP
//! multiplexer so they can be exercised with ordinary HTTP tooling:
//! `POST /<servicePath>/<methodName>`, plus CORS preflight on
//! `OPTIONS /<servicePath>/*`.

#![doc(html_root_url = "https://docs.rs/talaria-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod auth;
mod server;

pub use auth::Authenticator;
pub use server::{BoundServer, Server, ServerError};

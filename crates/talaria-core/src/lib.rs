//! # Talaria Core
//!
//! Core types for the Talaria service runtime.
//!
//! This crate provides the building blocks shared by every Talaria binding:
//!
//! - [`RpcError`] - the structured wire error with its closed code vocabulary ([`codes`])
//! - [`RequestContext`] / [`RequestId`] - per-request state carried into handlers
//! - [`Identity`] - the authenticated caller record
//! - [`Method`] - a validated, registered RPC method and its invocation pipeline
//! - [`Service`] - a named collection of methods plus request-scoped hooks

#![doc(html_root_url = "https://docs.rs/talaria-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod codes;
mod context;
mod error;
mod identity;
mod invoke;
mod method;
mod service;

pub use context::{RequestContext, RequestId};
pub use error::{Meta, RpcError};
pub use identity::{Claims, Identity};
pub use method::{Method, Reply};
pub use service::{ContextProvider, IdentityProvider, Service};

//! # Talaria Events
//!
//! Cloud-function event bindings for Talaria services.
//!
//! A deployed function receives either one HTTP gateway event or one small
//! batch of queue messages per invocation. This crate translates those
//! envelopes into method invocations and the outcomes back into the shapes
//! the platform expects:
//!
//! - [`GatewayHandler`] - gateway event in, gateway response envelope out
//! - [`QueueHandler`] - queue batch in, first-error-wins batch result out

#![doc(html_root_url = "https://docs.rs/talaria-events/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod event;
mod gateway;
mod queue;

pub use event::{
    GatewayAuthorizer, GatewayEvent, GatewayRequestContext, GatewayResponse, JwtAuthorizer,
    QueueEvent, QueueRecord,
};
pub use gateway::GatewayHandler;
pub use queue::QueueHandler;

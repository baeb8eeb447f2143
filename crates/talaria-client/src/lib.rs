//! # Talaria Client
//!
//! A typed RPC client for calling Talaria services.
//!
//! Calls are `POST <baseURL>/<methodName>` with a JSON body or no body.
//! Wire errors decode back into [`RpcError`], so an error code raised in
//! one service compares equal in the calling service; everything else that
//! can go wrong on the hop collapses into `downstream_request_failed`.

#![doc(html_root_url = "https://docs.rs/talaria-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;

pub use client::{ClientOptions, RpcClient};

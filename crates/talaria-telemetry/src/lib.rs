//! # Talaria Telemetry
//!
//! Structured logging bootstrap for Talaria services.
//!
//! Deployed functions log JSON to stdout for the platform's log pipeline;
//! the development server prefers a human-readable format. Both are
//! configured here, once, at process init.

#![doc(html_root_url = "https://docs.rs/talaria-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod logging;

pub use logging::{fields, init_logging, LogConfig, TelemetryError};

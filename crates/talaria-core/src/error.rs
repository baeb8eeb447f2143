//! The structured wire error.
//!
//! [`RpcError`] is the error type every Talaria surface speaks: handlers
//! return it for expected failures, the invoker normalises everything else
//! into it, adapters serialise it, and the RPC client decodes it back so that
//! a code survives a network hop intact.
//!
//! The `code` alone determines the HTTP status. The optional `cause` is for
//! server-side logs and is never serialised.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::codes;

/// Free-form error metadata, e.g. per-field schema violations under `reasons`.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// A structured error with a stable code, safe to return to callers.
///
/// Constructed at the point of failure and optionally decorated on the way
/// out. Decorators consume the value and return a new one; an `RpcError` is
/// never mutated in place.
///
/// # Example
///
/// ```
/// use talaria_core::{codes, RpcError};
///
/// fn check_quantity(quantity: u32) -> Result<(), RpcError> {
///     if quantity == 0 {
///         return Err(RpcError::new(codes::BAD_REQUEST).with_message("quantity must be positive"));
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    code: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    meta: Option<Meta>,

    /// The underlying failure. Observable in logs only.
    #[serde(skip)]
    cause: Option<anyhow::Error>,
}

impl RpcError {
    /// Creates an error carrying only a code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: None,
            meta: None,
            cause: None,
        }
    }

    /// Creates an error carrying a code and an inner cause.
    #[must_use]
    pub fn wrap(code: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self::new(code).with_cause(cause)
    }

    /// Returns a copy with the human-readable message set.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns a copy with the metadata mapping set.
    #[must_use]
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Returns a copy with the inner cause set.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<anyhow::Error>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the human-readable message, if set.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the metadata mapping, if set.
    #[must_use]
    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    /// Returns the inner cause, if set.
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_ref()
    }

    /// Returns `true` if this error carries the given code.
    #[must_use]
    pub fn is_code(&self, code: &str) -> bool {
        self.code == code
    }

    /// Returns `true` iff `err` is an `RpcError` whose code equals the
    /// exemplar's code. Messages, metadata and causes are not compared.
    ///
    /// # Example
    ///
    /// ```
    /// use talaria_core::{codes, RpcError};
    ///
    /// let err: anyhow::Error = RpcError::new(codes::FORBIDDEN).into();
    /// assert!(RpcError::matches(&err, &RpcError::new(codes::FORBIDDEN)));
    /// assert!(!RpcError::matches(&err, &RpcError::new(codes::UNKNOWN)));
    /// ```
    #[must_use]
    pub fn matches(err: &anyhow::Error, exemplar: &Self) -> bool {
        err.downcast_ref::<Self>()
            .is_some_and(|e| e.code == exemplar.code)
    }

    /// Maps the error code to an HTTP response status.
    ///
    /// Codes outside the closed vocabulary land in the 500 bucket.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self.code.as_str() {
            codes::BAD_REQUEST
            | codes::INVALID_BODY
            | codes::SCHEMA_VALIDATION_FAILED
            | codes::MISSING_REQUEST_BODY => StatusCode::BAD_REQUEST,

            codes::NO_AUTHENTICATION
            | codes::INVALID_AUTHENTICATION
            | codes::INVALID_TOKEN
            | codes::ACCESS_DENIED => StatusCode::UNAUTHORIZED,

            codes::FORBIDDEN => StatusCode::FORBIDDEN,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

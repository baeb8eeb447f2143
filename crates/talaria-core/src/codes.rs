//! The closed vocabulary of wire error codes.
//!
//! Every error that reaches a caller carries one of these codes. Codes are
//! stable identifiers: handlers compare on them, clients branch on them, and
//! [`RpcError::http_status`](crate::RpcError::http_status) maps them to
//! response status codes. Unrecognised codes fall into the 500 bucket.

/// The handler failed in a way it did not account for. Never carries detail.
pub const UNKNOWN: &str = "unknown";

/// The caller is authenticated but lacks a required scope.
pub const ACCESS_DENIED: &str = "access_denied";

/// The request was understood but is not acceptable.
pub const BAD_REQUEST: &str = "bad_request";

/// A request body was required and not provided.
pub const MISSING_REQUEST_BODY: &str = "missing_request_body";

/// The request body could not be used: unexpected, absent, or unparseable.
pub const INVALID_BODY: &str = "invalid_body";

/// The request body parsed but failed JSON Schema validation.
pub const SCHEMA_VALIDATION_FAILED: &str = "schema_validation_failed";

/// The caller may not perform this operation.
pub const FORBIDDEN: &str = "forbidden";

/// No credentials were presented.
pub const NO_AUTHENTICATION: &str = "no_authentication";

/// Credentials were presented but could not be validated.
pub const INVALID_AUTHENTICATION: &str = "invalid_authentication";

/// A bearer token was presented but is malformed or expired.
pub const INVALID_TOKEN: &str = "invalid_token";

/// The requested method is not registered on the service.
pub const METHOD_NOT_FOUND: &str = "method_not_found";

/// A call to a downstream service failed without a usable error body.
pub const DOWNSTREAM_REQUEST_FAILED: &str = "downstream_request_failed";

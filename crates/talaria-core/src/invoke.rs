//! The invocation pipeline.
//!
//! [`Method::invoke`] takes raw request bytes to a normalised [`Reply`] or
//! [`RpcError`] for one method call: schema validation, body/shape
//! reconciliation, decoding, the handler itself, then outcome
//! normalisation. Every outcome is logged with the handler duration in
//! microseconds.

use std::sync::Once;
use std::time::Instant;

use bytes::Bytes;
use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::{json, Value};
use tracing::{error, info, info_span, warn, Instrument};

use crate::codes;
use crate::context::RequestContext;
use crate::error::{Meta, RpcError};
use crate::method::{Method, Reply};

static MISSING_SPAN_WARNING: Once = Once::new();

impl Method {
    /// Executes the method against a raw request body.
    ///
    /// The body is validated against the method's schema (when one is
    /// attached), reconciled against the handler's shape, decoded into the
    /// request record, and handed to the handler. Whatever comes back is
    /// normalised: an [`RpcError`] is forwarded as-is, any other handler
    /// error is logged in full and replaced with `unknown`, and a missing
    /// response record becomes the no-content sentinel.
    ///
    /// Log events nest under the span carried by `ctx`; an absent span falls
    /// back to the current subscriber with a one-time warning.
    ///
    /// # Errors
    ///
    /// Returns an [`RpcError`] for every failure path. The error's code is
    /// always drawn from [`codes`].
    pub async fn invoke(&self, ctx: RequestContext, body: &[u8]) -> Result<Reply, RpcError> {
        let started = Instant::now();

        let span = if ctx.span().is_none() {
            MISSING_SPAN_WARNING.call_once(|| {
                warn!("request context carries no span; rpc logs fall back to the current subscriber");
            });
            info_span!("rpc_method", rpc_method = %self.name)
        } else {
            info_span!(parent: ctx.span(), "rpc_method", rpc_method = %self.name)
        };

        self.run(ctx, body, started).instrument(span).await
    }

    async fn run(
        &self,
        ctx: RequestContext,
        body: &[u8],
        started: Instant,
    ) -> Result<Reply, RpcError> {
        // Schema validation runs before shape reconciliation so that a
        // malformed input always reports as a validation failure.
        if let Some(validator) = &self.schema {
            let instance: Value = match serde_json::from_slice(body) {
                Ok(instance) => instance,
                Err(err) => {
                    return Err(handled(RpcError::wrap(codes::INVALID_BODY, err), started));
                }
            };

            let reasons = schema_reasons(validator, &instance);
            if !reasons.is_empty() {
                let mut meta = Meta::new();
                meta.insert("reasons".into(), Value::Array(reasons));

                return Err(handled(
                    RpcError::new(codes::SCHEMA_VALIDATION_FAILED).with_meta(meta),
                    started,
                ));
            }
        }

        if !body.is_empty() && !self.expects_request_body {
            return Err(handled(
                RpcError::new(codes::INVALID_BODY).with_message("unexpected request body"),
                started,
            ));
        }

        if body.is_empty() && self.expects_request_body {
            return Err(handled(
                RpcError::new(codes::INVALID_BODY).with_message("expecting request body"),
                started,
            ));
        }

        match (self.handler)(ctx, Bytes::copy_from_slice(body)).await {
            Ok(reply) => {
                info!(handler_duration = duration_us(started), "rpc request handled");
                Ok(reply)
            }
            Err(err) => Err(normalise(err, started)),
        }
    }
}

/// Collapses a handler error onto the wire vocabulary.
///
/// Expected failures pass through untouched; everything else is logged in
/// full and reaches the caller as a bare `unknown`.
fn normalise(err: anyhow::Error, started: Instant) -> RpcError {
    match err.downcast::<RpcError>() {
        Ok(expected) => handled(expected, started),
        Err(unhandled) => {
            let chain = format!("{unhandled:#}");
            error!(
                handler_duration = duration_us(started),
                error = chain.as_str(),
                "rpc request unhandled error"
            );
            RpcError::new(codes::UNKNOWN)
        }
    }
}

/// Logs a handled failure and passes it back for propagation.
fn handled(err: RpcError, started: Instant) -> RpcError {
    let duration = duration_us(started);
    let cause = err.cause().map(|cause| format!("{cause:#}"));

    if err.is_code(codes::UNKNOWN) {
        error!(
            handler_duration = duration,
            err_code = err.code(),
            err_message = err.message(),
            err_cause = cause.as_deref(),
            "rpc request handled error"
        );
    } else {
        warn!(
            handler_duration = duration,
            err_code = err.code(),
            err_message = err.message(),
            err_cause = cause.as_deref(),
            "rpc request handled error"
        );
    }

    err
}

fn duration_us(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}

/// Renders schema violations as ordered `{field, type, message}` records,
/// one per validation error, in the schema library's iteration order.
fn schema_reasons(validator: &Validator, instance: &Value) -> Vec<Value> {
    validator
        .iter_errors(instance)
        .map(|err| {
            json!({
                "field": field_label(&err.instance_path().to_string()),
                "type": kind_label(err.kind()),
                "message": err.to_string(),
            })
        })
        .collect()
}

/// Converts a JSON pointer into the dotted form reported to callers.
fn field_label(pointer: &str) -> String {
    if pointer.is_empty() {
        return "(root)".to_string();
    }

    pointer.trim_start_matches('/').replace('/', ".")
}

/// A stable label for the violated schema keyword.
fn kind_label(kind: &ValidationErrorKind) -> &'static str {
    match kind {
        ValidationErrorKind::Required { .. } => "required",
        ValidationErrorKind::Type { .. } => "type",
        ValidationErrorKind::AdditionalProperties { .. } => "additional_properties",
        ValidationErrorKind::Enum { .. } => "enum",
        ValidationErrorKind::Format { .. } => "format",
        ValidationErrorKind::Pattern { .. } => "pattern",
        ValidationErrorKind::MinLength { .. } => "min_length",
        ValidationErrorKind::MaxLength { .. } => "max_length",
        ValidationErrorKind::Minimum { .. } => "minimum",
        ValidationErrorKind::Maximum { .. } => "maximum",
        ValidationErrorKind::MinItems { .. } => "min_items",
        ValidationErrorKind::MaxItems { .. } => "max_items",
        _ => "schema",
    }
}

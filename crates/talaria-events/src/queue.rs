//! The queue batch adapter.
//!
//! Fans one invocation out to one method call per queued message,
//! concurrently, and joins on the first error. A batch either fully
//! succeeds or is reported as failed so the platform retries it whole;
//! partial acknowledgement is deliberately not modelled.

use std::sync::Arc;

use futures_util::future::try_join_all;
use tracing::{error, info, info_span};

use talaria_core::{codes, Reply, RequestContext, RpcError, Service};

use crate::event::QueueEvent;

/// Serves one method of a [`Service`] from a queue trigger.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use talaria_core::{Method, Service};
/// use talaria_events::QueueHandler;
///
/// let service =
///     Service::new().add_method(Method::no_body("compact", |_ctx| async move { Ok(()) }));
/// let handler = QueueHandler::new(Arc::new(service), "compact");
/// ```
#[derive(Debug, Clone)]
pub struct QueueHandler {
    service: Arc<Service>,
    method: String,
}

impl QueueHandler {
    /// Creates a queue binding invoking the named method for every message.
    #[must_use]
    pub fn new(service: Arc<Service>, method: impl Into<String>) -> Self {
        Self {
            service,
            method: method.into(),
        }
    }

    /// Handles one batch of queued messages.
    ///
    /// Workers share the batch context and race to completion; the first
    /// error resolves the join and cancels the messages still in flight.
    /// Message ordering within the batch carries no meaning beyond that.
    ///
    /// # Errors
    ///
    /// Returns `method_not_found` when the configured method is not
    /// registered, otherwise the first error produced by any message.
    pub async fn handle(&self, event: QueueEvent) -> Result<(), RpcError> {
        let Some(method) = self.service.get_method(&self.method) else {
            error!(
                rpc_method = self.method.as_str(),
                "queue invocation failed: method not found"
            );
            return Err(RpcError::new(codes::METHOD_NOT_FOUND));
        };

        let workers = event.records.iter().map(|record| {
            let span = info_span!("queue_message", sqs_msg_id = %record.message_id);

            async move {
                let ctx = RequestContext::new()
                    .with_request_id(record.message_id.clone())
                    .with_span(span.clone());
                let ctx = self.service.apply_context_providers(ctx);

                let reply = method.invoke(ctx, record.body.as_bytes()).await?;

                if let Reply::Json(value) = reply {
                    span.in_scope(|| info!(result = %value, "invocation result"));
                }

                Ok::<(), RpcError>(())
            }
        });

        try_join_all(workers).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde::Deserialize;
    use serde_json::json;

    use talaria_core::Method;

    use crate::event::QueueRecord;

    #[derive(Deserialize)]
    struct Job {
        id: u64,
    }

    fn batch(bodies: &[&str]) -> QueueEvent {
        QueueEvent {
            records: bodies
                .iter()
                .enumerate()
                .map(|(index, body)| QueueRecord {
                    message_id: format!("msg_{index}"),
                    body: (*body).to_string(),
                })
                .collect(),
        }
    }

    fn job_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}},
            "required": ["id"],
        })
    }

    #[tokio::test]
    async fn test_batch_success_invokes_every_message() {
        static SEEN: AtomicUsize = AtomicUsize::new(0);

        let service = Service::new().add_method(Method::request_only(
            "process",
            &job_schema(),
            |_ctx, _job: Job| async move {
                SEEN.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        ));
        let handler = QueueHandler::new(Arc::new(service), "process");

        let result = handler
            .handle(batch(&[r#"{"id":1}"#, r#"{"id":2}"#, r#"{"id":3}"#]))
            .await;

        assert!(result.is_ok());
        assert_eq!(SEEN.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_first_error_fails_the_batch() {
        let service = Service::new().add_method(Method::request_only(
            "process",
            &job_schema(),
            |_ctx, job: Job| async move {
                if job.id == 2 {
                    return Err(RpcError::new(codes::BAD_REQUEST).into());
                }
                Ok(())
            },
        ));
        let handler = QueueHandler::new(Arc::new(service), "process");

        let err = handler
            .handle(batch(&[r#"{"id":1}"#, r#"{"id":2}"#]))
            .await
            .expect_err("batch should fail");

        assert!(err.is_code(codes::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_unknown_method_fails_the_whole_batch() {
        let service = Service::new();
        let handler = QueueHandler::new(Arc::new(service), "missing");

        let err = handler
            .handle(batch(&[r#"{"id":1}"#]))
            .await
            .expect_err("batch should fail");

        assert!(err.is_code(codes::METHOD_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_empty_batch_succeeds() {
        let service = Service::new().add_method(Method::no_body("noop", |_ctx| async move {
            Ok(())
        }));
        let handler = QueueHandler::new(Arc::new(service), "noop");

        assert!(handler.handle(batch(&[])).await.is_ok());
    }
}

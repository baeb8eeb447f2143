//! Client/server symmetry tests against a bound development server.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use talaria_client::RpcClient;
use talaria_core::{codes, Meta, Method, RequestContext, RpcError, Service};
use talaria_server::Server;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EchoBody {
    name: String,
}

fn upstream_service() -> Arc<Service> {
    let echo_schema = json!({
        "type": "object",
        "properties": {"name": {"type": "string"}},
        "required": ["name"],
    });

    let service = Service::new()
        .add_method(Method::no_body("ping", |_ctx| async move { Ok(()) }))
        .add_method(Method::request_response(
            "echo",
            &echo_schema,
            |_ctx, req: EchoBody| async move { Ok(Some(req)) },
        ))
        .add_method(Method::no_body("locked", |_ctx| async move {
            let mut meta = Meta::new();
            meta.insert("scope".into(), json!("api:admin"));
            Err(RpcError::new(codes::ACCESS_DENIED)
                .with_message("missing scope")
                .with_meta(meta)
                .into())
        }));

    Arc::new(service)
}

async fn start_upstream() -> SocketAddr {
    let bound = Server::new("127.0.0.1:0")
        .add_service("svc", upstream_service(), false)
        .bind()
        .await
        .expect("test server should bind");

    let addr = bound.local_addr();
    tokio::spawn(async move {
        let _ = bound.serve().await;
    });

    addr
}

fn client_for(addr: SocketAddr) -> RpcClient {
    RpcClient::new(format!("http://{addr}/svc"), None, "client-tests")
}

#[tokio::test]
async fn test_no_content_call() {
    let addr = start_upstream().await;
    let client = client_for(addr);

    let response: Option<EchoBody> = client
        .call(&RequestContext::mock(), "ping", None::<&()>)
        .await
        .expect("ping should succeed");

    assert!(response.is_none());
}

#[tokio::test]
async fn test_round_trip_preserves_the_record() {
    let addr = start_upstream().await;
    let client = client_for(addr);

    let request = EchoBody {
        name: "alice".into(),
    };
    let response: Option<EchoBody> = client
        .call(&RequestContext::mock(), "echo", Some(&request))
        .await
        .expect("echo should succeed");

    assert_eq!(response, Some(request));
}

#[tokio::test]
async fn test_error_codes_survive_the_hop() {
    let addr = start_upstream().await;
    let client = client_for(addr);

    let err = client
        .call::<EchoBody, _>(&RequestContext::mock(), "locked", None::<&()>)
        .await
        .expect_err("locked should fail");

    assert!(err.is_code(codes::ACCESS_DENIED));
    assert_eq!(err.message(), Some("missing scope"));
    assert_eq!(err.meta().expect("meta should survive")["scope"], "api:admin");

    // The hop preserves equality-by-code with a locally constructed error.
    let as_any: anyhow::Error = err.into();
    assert!(RpcError::matches(
        &as_any,
        &RpcError::new(codes::ACCESS_DENIED)
    ));
}

#[tokio::test]
async fn test_schema_failures_cross_the_hop() {
    let addr = start_upstream().await;
    let client = client_for(addr);

    let err = client
        .call::<EchoBody, _>(&RequestContext::mock(), "echo", Some(&json!({})))
        .await
        .expect_err("invalid body should fail");

    assert!(err.is_code(codes::SCHEMA_VALIDATION_FAILED));
    let reasons = err.meta().expect("meta should survive")["reasons"]
        .as_array()
        .expect("reasons should be a list");
    assert!(!reasons.is_empty());
}

#[tokio::test]
async fn test_unknown_method_crosses_the_hop() {
    let addr = start_upstream().await;
    let client = client_for(addr);

    let err = client
        .call::<EchoBody, _>(&RequestContext::mock(), "teleport", None::<&()>)
        .await
        .expect_err("unknown method should fail");

    assert!(err.is_code(codes::METHOD_NOT_FOUND));
}

#[tokio::test]
async fn test_unreachable_service_is_downstream_failure() {
    // Bind and immediately drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("bound listener has an address");
    drop(listener);

    let client = client_for(addr);

    let err = client
        .call::<EchoBody, _>(&RequestContext::mock(), "ping", None::<&()>)
        .await
        .expect_err("unreachable service should fail");

    assert!(err.is_code(codes::DOWNSTREAM_REQUEST_FAILED));
}

//! End-to-end scenarios driven against the in-memory loopback transport: a
//! hand-written fake server on one end, an `McpClient` on the other. These
//! cover the six concrete scenarios from the testable-properties section of
//! the requirements this crate implements.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use mcp_client::client::error::ClientError;
use mcp_client::client::{ClientConfigBuilder, ConnectionState, McpClient};
use mcp_client::protocol::{JsonRpcMessageTrait, JsonRpcRequest, JsonRpcResponse, RequestId};
use mcp_client::transport::memory::InMemoryTransport;

/// Read one JSON-RPC request off `server` and return its method, id, and
/// params, ignoring notifications (whose `id` field is absent).
async fn recv_request(server: &mut InMemoryTransport) -> JsonRpcRequest {
    use mcp_client::transport::Transport;
    loop {
        let bytes = server.receive().await.expect("server receive");
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        if value.get("id").is_some() && value.get("method").is_some() {
            return serde_json::from_value(value).unwrap();
        }
        // a notification (e.g. `initialized`) — keep waiting for the next request
    }
}

async fn send_response(server: &mut InMemoryTransport, result: Value, id: RequestId) {
    use mcp_client::transport::Transport;
    let response = JsonRpcResponse::success(result, id);
    let bytes = response.to_bytes().unwrap();
    server.send(&bytes).await.unwrap();
}

fn initialize_result(version: &str) -> Value {
    json!({
        "protocolVersion": version,
        "capabilities": {},
        "serverInfo": {"name": "S", "version": "1"},
    })
}

#[tokio::test]
async fn old_dialect_handshake_negotiates_old_version() {
    use mcp_client::transport::Transport;

    let (client_transport, mut server) = InMemoryTransport::pair();
    let config = ClientConfigBuilder::new().client_info("test-client", "0.0.1").build();

    let client_task = tokio::spawn(async move {
        McpClient::connect_and_initialize(Box::new(client_transport), config).await
    });

    let init_request = recv_request(&mut server).await;
    assert_eq!(init_request.method, "initialize");
    let params = init_request.params.unwrap();
    assert_eq!(params["protocolVersion"], "2025-03-26");

    send_response(&mut server, initialize_result("2024-11-05"), init_request.id).await;

    let (client, caps) = client_task.await.unwrap().expect("handshake succeeds");
    assert!(client.is_initialized().await);
    assert_eq!(
        client.negotiated_version().await.unwrap().as_str(),
        "2024-11-05"
    );
    let _ = caps;
    let _ = server.close().await;
}

#[tokio::test]
async fn version_downgrade_is_accepted_and_stored() {
    use mcp_client::transport::Transport;

    let (client_transport, mut server) = InMemoryTransport::pair();
    let config = ClientConfigBuilder::new().build();

    let client_task = tokio::spawn(async move {
        McpClient::connect_and_initialize(Box::new(client_transport), config).await
    });

    let init_request = recv_request(&mut server).await;
    send_response(&mut server, initialize_result("2024-11-05"), init_request.id).await;

    let (client, _caps) = client_task.await.unwrap().expect("handshake succeeds");
    assert_eq!(
        client.negotiated_version().await.unwrap().as_str(),
        "2024-11-05"
    );
    let _ = server.close().await;
}

#[tokio::test]
async fn unsupported_version_fails_connect_and_closes_transport() {
    use mcp_client::transport::Transport;

    let (client_transport, mut server) = InMemoryTransport::pair();
    let config = ClientConfigBuilder::new().build();

    let client_task = tokio::spawn(async move {
        McpClient::connect_and_initialize(Box::new(client_transport), config).await
    });

    let init_request = recv_request(&mut server).await;
    send_response(&mut server, initialize_result("1999-01-01"), init_request.id).await;

    let err = client_task.await.unwrap().expect_err("unsupported version must fail");
    assert!(matches!(err, ClientError::VersionMismatch { .. }));
    let _ = server.close().await;
}

#[tokio::test]
async fn ten_concurrent_calls_each_get_their_own_response() {
    use mcp_client::transport::Transport;

    let (client_transport, mut server) = InMemoryTransport::pair();
    let config = ClientConfigBuilder::new().build();

    let client_task = tokio::spawn(async move {
        McpClient::connect_and_initialize(Box::new(client_transport), config).await
    });

    let init_request = recv_request(&mut server).await;
    send_response(&mut server, initialize_result("2025-03-26"), init_request.id).await;

    let (client, _caps) = client_task.await.unwrap().expect("handshake succeeds");

    // Drain the `initialized` notification before the server starts
    // answering `tools/list` calls.
    let server_task = tokio::spawn(async move {
        for _ in 0..10 {
            let request = recv_request(&mut server).await;
            assert_eq!(request.method, "tools/list");
            send_response(&mut server, json!({"tools": []}), request.id).await;
        }
        server
    });

    let mut handles = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        handles.push(tokio::spawn(async move { client.list_tools().await }));
    }
    for handle in handles {
        let tools = handle.await.unwrap().expect("each call resolves");
        assert!(tools.is_empty());
    }

    let mut server = server_task.await.unwrap();
    let _ = server.close().await;
}

#[tokio::test]
async fn progress_notification_fans_out_to_every_handler_once() {
    use mcp_client::transport::Transport;

    let (client_transport, mut server) = InMemoryTransport::pair();
    let config = ClientConfigBuilder::new().build();

    let client_task = tokio::spawn(async move {
        McpClient::connect_and_initialize(Box::new(client_transport), config).await
    });

    let init_request = recv_request(&mut server).await;
    send_response(&mut server, initialize_result("2025-03-26"), init_request.id).await;

    let (client, _caps) = client_task.await.unwrap().expect("handshake succeeds");

    let first_count = Arc::new(AtomicUsize::new(0));
    let second_count = Arc::new(AtomicUsize::new(0));
    {
        let first_count = Arc::clone(&first_count);
        client
            .on_progress(Arc::new(move |_| {
                first_count.fetch_add(1, Ordering::SeqCst);
            }))
            .await;
    }
    {
        let second_count = Arc::clone(&second_count);
        client
            .on_progress(Arc::new(move |_| {
                second_count.fetch_add(1, Ordering::SeqCst);
            }))
            .await;
    }

    let notification = json!({
        "jsonrpc": "2.0",
        "method": "notifications/progress",
        "params": {"progressToken": "t1", "progress": 0.5},
    });
    server
        .send(notification.to_string().as_bytes())
        .await
        .unwrap();

    // Handler dispatch happens on a spawned task; give it a moment to run.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(first_count.load(Ordering::SeqCst), 1);
    assert_eq!(second_count.load(Ordering::SeqCst), 1);
    let _ = server.close().await;
}

#[tokio::test]
async fn call_with_timeout_recovers_and_leaves_client_usable() {
    use mcp_client::transport::Transport;

    let (client_transport, mut server) = InMemoryTransport::pair();
    let config = ClientConfigBuilder::new().build();

    let client_task = tokio::spawn(async move {
        McpClient::connect_and_initialize(Box::new(client_transport), config).await
    });

    let init_request = recv_request(&mut server).await;
    send_response(&mut server, initialize_result("2025-03-26"), init_request.id).await;

    let (client, _caps) = client_task.await.unwrap().expect("handshake succeeds");

    let started = std::time::Instant::now();
    let result = client
        .call_with_timeout("tools/list", None, Duration::from_millis(50))
        .await;
    assert!(matches!(result, Err(ClientError::Timeout(_))));
    assert!(started.elapsed() <= Duration::from_millis(100));

    // The server never answered the first call; it does now, for the
    // second one, proving the transport is still open and the client
    // still usable.
    let request = recv_request(&mut server).await;
    assert_eq!(request.method, "tools/list");
    send_response(&mut server, json!({"tools": []}), request.id).await;

    let tools = client.list_tools().await.expect("second call succeeds");
    assert!(tools.is_empty());

    assert_eq!(client.connection_state().await, ConnectionState::Initialized);
    let _ = server.close().await;
}

//! The dispatch loop (spec §4.7): a single task that owns the transport and
//! is the sole consumer of [`Transport::receive`]. Everything else — `Call`'s
//! sends, server-request replies, handler fan-out — reaches the transport
//! only by handing bytes to this task over `outbound_rx`, which keeps the
//! `&mut self` transport contract from requiring a lock held across I/O.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::correlation::CorrelationManager;
use crate::protocol::{
    JsonRpcMessage, JsonRpcMessageTrait, JsonRpcResponse, MessageKind, RequestId,
};
use crate::router::Router;
use crate::transport::{Transport, TransportError};

/// One outbound write, with an ack channel so the caller learns about I/O
/// failures instead of silently losing the send.
pub struct OutboundMessage {
    pub bytes: Vec<u8>,
    pub ack: oneshot::Sender<Result<(), TransportError>>,
}

pub type OutboundSender = mpsc::Sender<OutboundMessage>;

/// Send `bytes` through the dispatch loop and wait for the transport write
/// to complete (not for any RPC response — just the local I/O outcome).
pub async fn send_via_loop(outbound: &OutboundSender, bytes: Vec<u8>) -> Result<(), TransportError> {
    let (ack_tx, ack_rx) = oneshot::channel();
    outbound
        .send(OutboundMessage { bytes, ack: ack_tx })
        .await
        .map_err(|_| TransportError::Closed)?;
    ack_rx.await.map_err(|_| TransportError::Closed)?
}

/// Runs until the transport reports end-of-stream, a fatal I/O error, the
/// `outbound_rx` channel closes, or `shutdown_rx` fires (an explicit `Close`).
/// Takes ownership of `transport` for its entire lifetime — this is the only
/// task that ever calls `receive()` or `send()` on it.
pub async fn run(
    mut transport: Box<dyn Transport>,
    mut outbound_rx: mpsc::Receiver<OutboundMessage>,
    mut shutdown_rx: oneshot::Receiver<()>,
    correlation: Arc<CorrelationManager>,
    router: Arc<Router>,
    outbound_tx: OutboundSender,
) {
    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => {
                debug!("dispatch loop received shutdown signal");
                break;
            }

            incoming = transport.receive() => {
                match incoming {
                    Ok(bytes) => {
                        let correlation = Arc::clone(&correlation);
                        let router = Arc::clone(&router);
                        let outbound_tx = outbound_tx.clone();
                        tokio::spawn(async move {
                            handle_inbound(bytes, correlation, router, outbound_tx).await;
                        });
                    }
                    Err(err) => {
                        debug!(error = %err, "dispatch loop receive failed, shutting down");
                        break;
                    }
                }
            }

            message = outbound_rx.recv() => {
                match message {
                    Some(OutboundMessage { bytes, ack }) => {
                        let result = transport.send(&bytes).await;
                        let _ = ack.send(result);
                    }
                    None => {
                        debug!("outbound channel closed, shutting down dispatch loop");
                        break;
                    }
                }
            }
        }
    }

    let _ = transport.close().await;

    for id in correlation.get_pending_request_ids() {
        let _ = correlation.cancel_request(&id);
    }

    router.notify_connection_status(false).await;
}

/// Classify and route one inbound message. Runs on its own task so a slow
/// handler or notification callback never blocks the receive loop.
async fn handle_inbound(
    bytes: Vec<u8>,
    correlation: Arc<CorrelationManager>,
    router: Arc<Router>,
    outbound_tx: OutboundSender,
) {
    let value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "dropped unparsable inbound message");
            return;
        }
    };

    match JsonRpcMessage::classify(&value) {
        MessageKind::Response => {
            let id = match value.get("id").cloned() {
                Some(raw) => match serde_json::from_value::<RequestId>(raw) {
                    Ok(id) => id,
                    Err(_) => {
                        warn!("dropped response with unparsable id");
                        return;
                    }
                },
                None => {
                    warn!("dropped response with no id");
                    return;
                }
            };

            // Deliver the raw envelope value as-is; the `Call` call-site
            // (which knows the negotiated version) is what distinguishes a
            // success result from a server error envelope.
            correlation.correlate_response(&id, Ok(value));
        }

        MessageKind::Request => {
            let method = value
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let id = match value.get("id").cloned().and_then(|raw| serde_json::from_value(raw).ok()) {
                Some(id) => id,
                None => {
                    warn!("dropped server-initiated request with unparsable id");
                    return;
                }
            };
            let params = value.get("params").cloned();

            let response: JsonRpcResponse = router.dispatch_request(&method, id, params).await;
            if let Ok(bytes) = response.to_bytes() {
                let _ = send_via_loop(&outbound_tx, bytes.to_vec()).await;
            }
        }

        MessageKind::Notification => {
            let method = value
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let params = value.get("params").cloned();
            router.dispatch_notification(&method, params).await;
        }

        MessageKind::Unknown => {
            trace!("dropped inbound message of unknown shape");
        }
    }
}

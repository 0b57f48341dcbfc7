//! WebSocket endpoint for the push relay
//!
//! One route serves both parties. The first frame must be a registration
//! envelope: `register_device` puts the socket in the device table and
//! starts command delivery; `register_admin` subscribes the socket to
//! device status and lifecycle fan-out and accepts command envelopes.
//! A JSON-level ping/pong cycle detects dead sockets.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use sw_core::types::DeviceId;
use sw_protocol::{CommandKind, Envelope};

use crate::state::CoordinatorState;

/// How long a fresh socket may sit silent before registering
const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Missed keep-alive rounds before a socket counts as dead
const KEEPALIVE_GRACE: u32 = 2;

/// HTTP handler that upgrades the connection to a relay socket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<CoordinatorState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<CoordinatorState>) {
    let (sink, mut stream) = socket.split();

    // The first envelope decides what this socket is.
    let registration = tokio::time::timeout(REGISTRATION_TIMEOUT, next_envelope(&mut stream)).await;
    match registration {
        Ok(Some(Envelope::RegisterDevice { device_id })) => {
            run_device_connection(sink, stream, state, DeviceId::new(device_id)).await;
        }
        Ok(Some(Envelope::RegisterAdmin)) => {
            run_admin_connection(sink, stream, state).await;
        }
        Ok(Some(other)) => {
            tracing::warn!(
                "Socket sent {:?} before registering, closing",
                other
            );
        }
        Ok(None) => {
            tracing::debug!("Socket closed before registering");
        }
        Err(_) => {
            tracing::debug!("Socket registration timed out");
        }
    }
}

/// Read frames until a parseable envelope or end of stream
async fn next_envelope(stream: &mut SplitStream<WebSocket>) -> Option<Envelope> {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match Envelope::from_text(&text) {
                Ok(envelope) => return Some(envelope),
                Err(e) => {
                    tracing::warn!("Undecodable relay frame: {}", e);
                    return None;
                }
            },
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("Relay socket receive error: {}", e);
                return None;
            }
        }
    }
    None
}

/// Spawn the writer task forwarding queued envelopes onto the socket
fn spawn_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                envelope = rx.recv() => {
                    let Some(envelope) = envelope else { break };
                    let text = match envelope.to_text() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("Failed to encode envelope: {}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                _ = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    })
}

async fn run_device_connection(
    sink: SplitSink<WebSocket, Message>,
    mut stream: SplitStream<WebSocket>,
    state: Arc<CoordinatorState>,
    device_id: DeviceId,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let seq = state.relay.register_device(device_id.clone(), tx.clone(), cancel.clone());
    let writer = spawn_writer(sink, rx, cancel.clone());

    tracing::info!("Device {} registered on relay", device_id);
    let _ = tx.send(Envelope::RegistrationSuccess);
    state
        .relay
        .broadcast_admins(Envelope::DeviceConnected { device_id: device_id.to_string() });

    let mut keepalive = interval(state.config.keepalive_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    keepalive.tick().await; // first tick fires immediately
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            frame = stream.next() => {
                let Some(Ok(message)) = frame else { break };
                match message {
                    Message::Text(text) => {
                        last_seen = Instant::now();
                        match Envelope::from_text(&text) {
                            Ok(Envelope::Pong) => {}
                            Ok(Envelope::Ping) => {
                                let _ = tx.send(Envelope::Pong);
                            }
                            Ok(Envelope::CommandResult { command_id, status, result, .. }) => {
                                // Authoritative completion goes over HTTP ack;
                                // this copy is for watching admins only.
                                state.relay.broadcast_admins(Envelope::CommandResult {
                                    device_id: device_id.to_string(),
                                    command_id,
                                    status,
                                    result,
                                });
                            }
                            Ok(other) => {
                                tracing::warn!("Unexpected envelope from {}: {:?}", device_id, other);
                            }
                            Err(e) => {
                                tracing::warn!("Undecodable frame from {}: {}", device_id, e);
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = keepalive.tick() => {
                if last_seen.elapsed() > state.config.keepalive_interval * KEEPALIVE_GRACE {
                    tracing::warn!("Device {} socket went silent, dropping", device_id);
                    break;
                }
                let _ = tx.send(Envelope::Ping);
            }
            _ = cancel.cancelled() => break,
        }
    }

    cancel.cancel();
    let _ = writer.await;
    if state.relay.unregister_device(&device_id, seq) {
        tracing::info!("Device {} left the relay", device_id);
        state
            .relay
            .broadcast_admins(Envelope::DeviceDisconnected { device_id: device_id.to_string() });
    }
}

async fn run_admin_connection(
    sink: SplitSink<WebSocket, Message>,
    mut stream: SplitStream<WebSocket>,
    state: Arc<CoordinatorState>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let seq = state.relay.register_admin(tx.clone());
    let writer = spawn_writer(sink, rx, cancel.clone());

    tracing::info!("Administrator registered on relay");
    let _ = tx.send(Envelope::RegistrationSuccess);

    let mut keepalive = interval(state.config.keepalive_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    keepalive.tick().await;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            frame = stream.next() => {
                let Some(Ok(message)) = frame else { break };
                match message {
                    Message::Text(text) => {
                        last_seen = Instant::now();
                        match Envelope::from_text(&text) {
                            Ok(Envelope::Pong) => {}
                            Ok(Envelope::Ping) => {
                                let _ = tx.send(Envelope::Pong);
                            }
                            Ok(Envelope::Command { device_id: Some(device_id), kind, .. }) => {
                                dispatch_admin_command(&state, DeviceId::new(device_id), kind);
                            }
                            Ok(Envelope::Command { device_id: None, .. }) => {
                                tracing::warn!("Admin command without device_id dropped");
                            }
                            Ok(other) => {
                                tracing::warn!("Unexpected admin envelope: {:?}", other);
                            }
                            Err(e) => {
                                tracing::warn!("Undecodable admin frame: {}", e);
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            _ = keepalive.tick() => {
                if last_seen.elapsed() > state.config.keepalive_interval * KEEPALIVE_GRACE {
                    tracing::warn!("Admin socket went silent, dropping");
                    break;
                }
                let _ = tx.send(Envelope::Ping);
            }
        }
    }

    cancel.cancel();
    let _ = writer.await;
    state.relay.unregister_admin(seq);
    tracing::info!("Administrator left the relay");
}

/// Queue an admin-issued command and push it if the device socket is live.
///
/// The command always lands in the queue first, so a device without a
/// socket still picks it up on its next heartbeat.
fn dispatch_admin_command(state: &CoordinatorState, device_id: DeviceId, kind: CommandKind) {
    if let CommandKind::AssignPresentation { presentation_id, auto_play, loop_mode } = &kind {
        state
            .assignments
            .assign(device_id.clone(), *presentation_id, *auto_play, *loop_mode);
    }

    let wire = state.commands.enqueue(device_id.clone(), kind);
    if state
        .relay
        .push_to_device(&device_id, Envelope::from_wire_command(&wire))
    {
        tracing::debug!("Pushed {} to {}", wire.id, device_id);
    } else {
        tracing::debug!("{} queued for {} (no live socket)", wire.id, device_id);
    }
}

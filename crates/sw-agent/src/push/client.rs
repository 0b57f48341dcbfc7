//! WebSocket client for the coordinator relay

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use sw_core::config::AgentConfig;
use sw_core::time;
use sw_protocol::{Envelope, WireCommand};

use crate::commands::{Delivered, DeliveryChannel};

use super::reconnect::ExponentialBackoff;

/// Why a connection ended
enum Disconnect {
    /// Transport closed or errored; reconnect with backoff
    Lost(String),
    /// Shutdown requested
    Cancelled,
}

/// The push-socket client loop
pub struct PushChannel {
    config: Arc<AgentConfig>,
    relay_url: String,
    device_id: String,
    router_tx: mpsc::UnboundedSender<Delivered>,
}

impl PushChannel {
    pub fn new(
        config: Arc<AgentConfig>,
        relay_url: String,
        router_tx: mpsc::UnboundedSender<Delivered>,
    ) -> Self {
        let device_id = config.effective_device_id();
        Self {
            config,
            relay_url,
            device_id,
            router_tx,
        }
    }

    /// Run until cancelled. Waits for presence to be confirmed healthy
    /// before the first connection attempt, then reconnects forever with
    /// exponential backoff.
    pub async fn run(
        self,
        mut result_rx: mpsc::UnboundedReceiver<Envelope>,
        mut health_rx: watch::Receiver<bool>,
        cancel: CancellationToken,
    ) {
        tokio::select! {
            result = health_rx.wait_for(|healthy| *healthy) => {
                if result.is_err() {
                    return;
                }
            }
            _ = cancel.cancelled() => return,
        }

        let mut backoff = ExponentialBackoff::from_config(&self.config.backoff);
        loop {
            // Results queued while offline are stale for watchers; the
            // HTTP ack already recorded them.
            while result_rx.try_recv().is_ok() {}

            match self.run_connection(&mut result_rx, &mut backoff, &cancel).await {
                Disconnect::Cancelled => break,
                Disconnect::Lost(reason) => {
                    let delay = backoff.next_delay();
                    tracing::debug!("Push socket lost ({}); reconnecting in {:?}", reason, delay);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
            }
        }
        tracing::debug!("Push channel stopped");
    }

    async fn run_connection(
        &self,
        result_rx: &mut mpsc::UnboundedReceiver<Envelope>,
        backoff: &mut ExponentialBackoff,
        cancel: &CancellationToken,
    ) -> Disconnect {
        let (ws, _) = match connect_async(&self.relay_url).await {
            Ok(connection) => connection,
            Err(e) => return Disconnect::Lost(e.to_string()),
        };
        let (mut sink, mut stream) = ws.split();

        let register = Envelope::RegisterDevice { device_id: self.device_id.clone() };
        let frame = match register.to_text() {
            Ok(text) => text,
            Err(e) => return Disconnect::Lost(e.to_string()),
        };
        if let Err(e) = sink.send(WsMessage::Text(frame)).await {
            return Disconnect::Lost(e.to_string());
        }

        loop {
            tokio::select! {
                frame = stream.next() => {
                    let Some(Ok(message)) = frame else {
                        return Disconnect::Lost("stream closed".to_string());
                    };
                    let WsMessage::Text(text) = message else { continue };
                    match Envelope::from_text(&text) {
                        Ok(Envelope::RegistrationSuccess) => {
                            tracing::info!("Push socket registered");
                            backoff.reset();
                        }
                        Ok(Envelope::Ping) => {
                            let pong = Envelope::Pong.to_text().expect("pong encodes");
                            if let Err(e) = sink.send(WsMessage::Text(pong)).await {
                                return Disconnect::Lost(e.to_string());
                            }
                        }
                        Ok(Envelope::Pong) => {}
                        Ok(Envelope::Command { id: Some(id), kind, created_at, .. }) => {
                            let command = WireCommand {
                                id,
                                kind,
                                created_at: created_at.unwrap_or_else(time::now_millis),
                            };
                            let _ = self.router_tx.send(Delivered {
                                command,
                                via: DeliveryChannel::Push,
                            });
                        }
                        Ok(Envelope::Command { id: None, .. }) => {
                            tracing::warn!("Pushed command without an ID dropped");
                        }
                        Ok(other) => {
                            tracing::debug!("Ignoring envelope: {:?}", other);
                        }
                        Err(e) => {
                            tracing::warn!("Undecodable push frame: {}", e);
                        }
                    }
                }
                result = result_rx.recv() => {
                    let Some(envelope) = result else {
                        return Disconnect::Lost("result channel closed".to_string());
                    };
                    match envelope.to_text() {
                        Ok(text) => {
                            if let Err(e) = sink.send(WsMessage::Text(text)).await {
                                return Disconnect::Lost(e.to_string());
                            }
                        }
                        Err(e) => tracing::error!("Failed to encode result: {}", e),
                    }
                }
                _ = cancel.cancelled() => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return Disconnect::Cancelled;
                }
            }
        }
    }
}

//! Presence reporter
//!
//! Sends the periodic heartbeat that keeps the device alive on the
//! coordinator and doubles as the command pull. Failures are counted
//! visibly; after enough consecutive failures the fixed-interval loop is
//! abandoned and restarted after a cool-down rather than hammering an
//! unreachable coordinator. A health watch publishes whether presence is
//! confirmed - dependent loops (assignment polls, push socket) only start
//! once it flips true.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use sw_core::config::AgentConfig;
use sw_protocol::{HeartbeatRequest, StatusSnapshot};

use crate::api::CoordinatorClient;
use crate::commands::{Delivered, DeliveryChannel};
use crate::metrics::MetricsCollector;
use crate::playback::PlaybackStatus;

/// The heartbeat loop
pub struct PresenceReporter {
    config: Arc<AgentConfig>,
    client: Arc<CoordinatorClient>,
    status_rx: watch::Receiver<PlaybackStatus>,
    router_tx: mpsc::UnboundedSender<Delivered>,
    health_tx: watch::Sender<bool>,
    metrics: MetricsCollector,
    device_id: String,
    /// Unix millis of the last successful heartbeat
    last_success_at: Option<u64>,
}

impl PresenceReporter {
    pub fn new(
        config: Arc<AgentConfig>,
        client: Arc<CoordinatorClient>,
        status_rx: watch::Receiver<PlaybackStatus>,
        router_tx: mpsc::UnboundedSender<Delivered>,
        health_tx: watch::Sender<bool>,
    ) -> Self {
        let device_id = config.effective_device_id();
        Self {
            config,
            client,
            status_rx,
            router_tx,
            health_tx,
            metrics: MetricsCollector::new(),
            device_id,
            last_success_at: None,
        }
    }

    /// Run until cancelled
    pub async fn run(mut self, cancel: CancellationToken) {
        let failure_limit = self.config.tuning.heartbeat_failure_limit;
        let cooldown = self.config.tuning.heartbeat_cooldown;

        'outer: loop {
            let mut ticker = interval(self.config.tuning.heartbeat_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut failures: u32 = 0;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = cancel.cancelled() => break 'outer,
                }

                match self.beat_once().await {
                    Ok(command_count) => {
                        if failures > 0 {
                            tracing::info!("Heartbeat recovered after {} failures", failures);
                        }
                        failures = 0;
                        self.last_success_at = Some(sw_core::time::now_millis());
                        let _ = self.health_tx.send(true);
                        if command_count > 0 {
                            tracing::debug!("Heartbeat delivered {} commands", command_count);
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        tracing::warn!(
                            "Heartbeat failed ({} consecutive): {}",
                            failures,
                            e
                        );
                        if failures >= failure_limit {
                            // Stop the fixed-interval loop entirely and
                            // come back after the cool-down.
                            let silent_for = self
                                .last_success_at
                                .map(sw_core::time::elapsed_since);
                            tracing::warn!(
                                "{} consecutive heartbeat failures (silent for {:?}); backing off for {:?}",
                                failures,
                                silent_for,
                                cooldown
                            );
                            tokio::select! {
                                _ = tokio::time::sleep(cooldown) => continue 'outer,
                                _ = cancel.cancelled() => break 'outer,
                            }
                        }
                    }
                }
            }
        }

        tracing::debug!("Presence reporter stopped");
    }

    /// One heartbeat round-trip; returns how many commands came back
    async fn beat_once(&mut self) -> Result<usize, crate::api::ApiError> {
        let request = self.build_request();
        let response = self.client.heartbeat(&request).await?;

        let count = response.commands.len();
        for command in response.commands {
            let _ = self.router_tx.send(Delivered {
                command,
                via: DeliveryChannel::Poll,
            });
        }
        Ok(count)
    }

    fn build_request(&mut self) -> HeartbeatRequest {
        let playback = self.status_rx.borrow().clone();
        let metrics = self.metrics.collect();

        HeartbeatRequest {
            device_id: self.device_id.clone(),
            display_name: self.config.display_name.clone(),
            capabilities: Default::default(),
            snapshot: StatusSnapshot {
                status: playback.status,
                current_presentation_id: playback.presentation_id,
                current_presentation_name: playback.presentation_name,
                slide_index: playback.slide_index,
                total_slides: playback.total_slides,
                is_looping: playback.is_looping,
                auto_play: playback.auto_play,
                uptime_seconds: metrics.uptime_seconds,
                memory_pct: metrics.memory_pct,
                wifi_pct: metrics.wifi_pct,
                app_version: env!("CARGO_PKG_VERSION").to_string(),
                local_ip: metrics.local_ip,
                external_ip: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn reporter(url: &str) -> (PresenceReporter, mpsc::UnboundedReceiver<Delivered>, watch::Receiver<bool>) {
        let config = Arc::new(AgentConfig {
            device_id: Some("kiosk-t".to_string()),
            ..Default::default()
        });
        let client =
            Arc::new(CoordinatorClient::new(url, Duration::from_millis(200)).unwrap());
        let (_status_tx, status_rx) = watch::channel(PlaybackStatus::default());
        let (router_tx, router_rx) = mpsc::unbounded_channel();
        let (health_tx, health_rx) = watch::channel(false);
        (
            PresenceReporter::new(config, client, status_rx, router_tx, health_tx),
            router_rx,
            health_rx,
        )
    }

    #[tokio::test]
    async fn test_request_carries_playback_and_version() {
        let (mut reporter, _router_rx, _health_rx) = reporter("http://127.0.0.1:9");
        let request = reporter.build_request();
        assert_eq!(request.device_id, "kiosk-t");
        assert_eq!(request.snapshot.app_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(request.snapshot.status, sw_protocol::ReportedStatus::Idle);
    }

    #[tokio::test]
    async fn test_unreachable_coordinator_is_an_error() {
        let (mut reporter, _router_rx, health_rx) = reporter("http://127.0.0.1:9");
        assert!(reporter.beat_once().await.is_err());
        // Health never confirmed.
        assert!(!*health_rx.borrow());
    }
}

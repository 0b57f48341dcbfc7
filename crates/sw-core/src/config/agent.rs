//! Agent configuration
//!
//! Every timing constant of the agent's loops is named configuration, not a
//! protocol invariant: deployments tune them, the defaults match the values
//! the fleet has run with for multi-day unattended stretches.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};

/// Configuration for the kiosk agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Coordinator base URL, e.g. `http://coordinator.local:8787`
    pub coordinator_url: String,

    /// Device identifier (defaults to a sanitized hostname)
    pub device_id: Option<String>,

    /// Human-facing device name shown on the fleet dashboard
    pub display_name: Option<String>,

    /// Command executed for `reboot` (log-only when unset)
    pub reboot_command: Option<String>,

    /// Command executed for `update_app` (log-only when unset)
    pub update_command: Option<String>,

    /// Timer and threshold tuning
    pub tuning: TuningConfig,

    /// Reconnect backoff for the push socket
    pub backoff: BackoffConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            coordinator_url: "http://localhost:8787".to_string(),
            device_id: None,
            display_name: None,
            reboot_command: None,
            update_command: None,
            tuning: TuningConfig::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Effective device ID, falling back to the sanitized hostname
    pub fn effective_device_id(&self) -> String {
        self.device_id.clone().unwrap_or_else(|| {
            crate::types::DeviceId::from_hostname(
                &gethostname::gethostname().to_string_lossy(),
            )
            .0
        })
    }
}

/// Named timing constants for the agent's cooperative loops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Heartbeat interval
    #[serde(with = "duration_secs")]
    pub heartbeat_interval: Duration,

    /// Consecutive heartbeat failures before the loop backs off
    pub heartbeat_failure_limit: u32,

    /// Cool-down slept before restarting a backed-off heartbeat loop
    #[serde(with = "duration_secs")]
    pub heartbeat_cooldown: Duration,

    /// Assignment poll interval
    #[serde(with = "duration_secs")]
    pub assignment_poll_interval: Duration,

    /// Default-presentation poll interval
    #[serde(with = "duration_secs")]
    pub default_poll_interval: Duration,

    /// Dwell before an unattended default presentation auto-launches
    #[serde(with = "duration_secs")]
    pub auto_launch_delay: Duration,

    /// How long the default-presentation prompt stays visible
    #[serde(with = "duration_secs")]
    pub prompt_visibility: Duration,

    /// Delay between detecting an assignment and opening it
    #[serde(with = "duration_millis")]
    pub settle_delay: Duration,

    /// Slide countdown granularity
    #[serde(with = "duration_millis")]
    pub countdown_tick: Duration,

    /// Watchdog check interval
    #[serde(with = "duration_secs")]
    pub watchdog_tick: Duration,

    /// Slide age past which a looping session counts as stalled
    #[serde(with = "duration_secs")]
    pub stall_threshold: Duration,

    /// Grace before a finished assignment session restarts itself
    #[serde(with = "duration_secs")]
    pub finished_grace: Duration,

    /// Loop count at which degraded-resource mode engages
    pub degraded_loop_threshold: u32,

    /// In degraded mode, cached decode/error state is dropped every N loops
    pub cache_drop_stride: u32,

    /// Idle time before on-screen controls hide
    #[serde(with = "duration_secs")]
    pub hide_controls_delay: Duration,

    /// Bound on every network round-trip
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_failure_limit: 5,
            heartbeat_cooldown: Duration::from_secs(5),
            assignment_poll_interval: Duration::from_secs(15),
            default_poll_interval: Duration::from_secs(30),
            auto_launch_delay: Duration::from_secs(30),
            prompt_visibility: Duration::from_secs(10),
            settle_delay: Duration::from_millis(1500),
            countdown_tick: Duration::from_millis(100),
            watchdog_tick: Duration::from_secs(30),
            stall_threshold: Duration::from_secs(120),
            finished_grace: Duration::from_secs(5),
            degraded_loop_threshold: 10,
            cache_drop_stride: 5,
            hide_controls_delay: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Exponential backoff configuration for push-socket reconnects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Initial delay
    #[serde(with = "duration_secs")]
    pub initial: Duration,

    /// Maximum delay
    #[serde(with = "duration_secs")]
    pub max: Duration,

    /// Multiplier for each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

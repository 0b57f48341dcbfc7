//! System metrics for the heartbeat snapshot
//!
//! Everything here is best-effort: a field the platform cannot provide is
//! reported as `None` rather than blocking the heartbeat.

use std::net::UdpSocket;
use std::time::Instant;

use sysinfo::System;

/// Collected metrics for one heartbeat
#[derive(Debug, Clone)]
pub struct Metrics {
    /// Seconds since the agent process started
    pub uptime_seconds: u64,
    /// Memory usage percentage (0-100)
    pub memory_pct: Option<f32>,
    /// WiFi link quality percentage (0-100)
    pub wifi_pct: Option<f32>,
    /// Primary local IP address
    pub local_ip: Option<String>,
}

/// Collector reused across heartbeats
pub struct MetricsCollector {
    started: Instant,
    system: System,
}

impl MetricsCollector {
    /// Create a collector; process start counts from here
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            system: System::new(),
        }
    }

    /// Collect a fresh snapshot
    pub fn collect(&mut self) -> Metrics {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let memory_pct = if total > 0 {
            Some((self.system.used_memory() as f32 / total as f32) * 100.0)
        } else {
            None
        };

        Metrics {
            uptime_seconds: self.started.elapsed().as_secs(),
            memory_pct,
            wifi_pct: read_wifi_quality(),
            local_ip: detect_local_ip(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Local IP as seen on the default route. No packet is sent; connecting a
/// UDP socket only selects the outbound interface.
fn detect_local_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}

/// WiFi link quality from /proc/net/wireless, scaled to a percentage
#[cfg(target_os = "linux")]
fn read_wifi_quality() -> Option<f32> {
    let content = std::fs::read_to_string("/proc/net/wireless").ok()?;
    parse_wireless_quality(&content)
}

#[cfg(not(target_os = "linux"))]
fn read_wifi_quality() -> Option<f32> {
    None
}

/// Parse the link-quality column of /proc/net/wireless (x/70 scale)
#[allow(dead_code)]
fn parse_wireless_quality(content: &str) -> Option<f32> {
    for line in content.lines().skip(2) {
        let mut fields = line.split_whitespace();
        let _interface = fields.next()?;
        let _status = fields.next()?;
        let quality: f32 = fields.next()?.trim_end_matches('.').parse().ok()?;
        return Some((quality / 70.0 * 100.0).clamp(0.0, 100.0));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_populates_uptime() {
        let mut collector = MetricsCollector::new();
        let metrics = collector.collect();
        assert!(metrics.uptime_seconds < 10);
    }

    #[test]
    fn test_parse_wireless_quality() {
        let sample = "\
Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
 face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
 wlan0: 0000   56.  -54.  -256        0      0      0      0      0        0";
        let quality = parse_wireless_quality(sample).unwrap();
        assert!((quality - 80.0).abs() < 0.1);
    }

    #[test]
    fn test_parse_wireless_no_interface() {
        let sample = "\
Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
 face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22";
        assert!(parse_wireless_quality(sample).is_none());
    }
}

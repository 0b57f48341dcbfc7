//! Relay connection registry
//!
//! Owned exclusively by this process: each entry is mutated only by its own
//! connection's open/close events, so no locking beyond the map itself is
//! needed. The flip side is that nothing survives a restart - horizontal
//! scaling or a relay restart requires every device and admin to
//! re-register on a fresh socket.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sw_core::types::DeviceId;
use sw_protocol::Envelope;

/// Sender half used to push envelopes to one connection's writer task
pub type EnvelopeSender = mpsc::UnboundedSender<Envelope>;

/// A live connection owned by the relay
struct Connection {
    /// Monotonic connection sequence, used so a stale socket's cleanup
    /// cannot unregister its replacement
    seq: u64,
    sender: EnvelopeSender,
    cancel: CancellationToken,
}

/// Registry of live device and administrator connections
pub struct RelayRegistry {
    devices: DashMap<DeviceId, Connection>,
    admins: DashMap<u64, EnvelopeSender>,
    next_seq: AtomicU64,
}

impl RelayRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
            admins: DashMap::new(),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Register a device connection, displacing any prior socket for the
    /// same device. Returns the connection sequence to pass back to
    /// [`unregister_device`].
    pub fn register_device(
        &self,
        device_id: DeviceId,
        sender: EnvelopeSender,
        cancel: CancellationToken,
    ) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        if let Some(old) = self.devices.insert(device_id.clone(), Connection { seq, sender, cancel })
        {
            tracing::info!("Displacing stale socket for {}", device_id);
            old.cancel.cancel();
        }
        seq
    }

    /// Remove a device connection if it is still the registered one.
    /// Returns true when an entry was actually removed.
    pub fn unregister_device(&self, device_id: &DeviceId, seq: u64) -> bool {
        self.devices
            .remove_if(device_id, |_, conn| conn.seq == seq)
            .is_some()
    }

    /// Register an administrator connection; returns its registry key
    pub fn register_admin(&self, sender: EnvelopeSender) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.admins.insert(seq, sender);
        seq
    }

    /// Remove an administrator connection
    pub fn unregister_admin(&self, seq: u64) {
        self.admins.remove(&seq);
    }

    /// Push an envelope to a device if it has a live socket.
    ///
    /// Returns false when the device is not connected (or its writer has
    /// gone away) - the caller leaves the command in the queue for the next
    /// poll rather than buffering here.
    pub fn push_to_device(&self, device_id: &DeviceId, envelope: Envelope) -> bool {
        match self.devices.get(device_id) {
            Some(conn) => conn.sender.send(envelope).is_ok(),
            None => false,
        }
    }

    /// Fan an envelope out to every connected administrator
    pub fn broadcast_admins(&self, envelope: Envelope) {
        for entry in self.admins.iter() {
            // Closed channels are skipped; their receive loops clean up.
            let _ = entry.value().send(envelope.clone());
        }
    }

    /// Whether a device has a live socket
    pub fn device_connected(&self, device_id: &DeviceId) -> bool {
        self.devices.contains_key(device_id)
    }

    /// Number of live device connections
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Number of live administrator connections
    pub fn admin_count(&self) -> usize {
        self.admins.len()
    }
}

impl Default for RelayRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (EnvelopeSender, mpsc::UnboundedReceiver<Envelope>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_push_to_unconnected_device_is_noop() {
        let registry = RelayRegistry::new();
        assert!(!registry.push_to_device(&DeviceId::new("kiosk-1"), Envelope::Ping));
    }

    #[test]
    fn test_push_to_registered_device() {
        let registry = RelayRegistry::new();
        let (tx, mut rx) = channel();
        registry.register_device(DeviceId::new("kiosk-1"), tx, CancellationToken::new());

        assert!(registry.push_to_device(&DeviceId::new("kiosk-1"), Envelope::Ping));
        assert_eq!(rx.try_recv().unwrap(), Envelope::Ping);
    }

    #[test]
    fn test_reregistration_displaces_and_cancels_old_socket() {
        let registry = RelayRegistry::new();
        let device = DeviceId::new("kiosk-1");

        let (old_tx, _old_rx) = channel();
        let old_cancel = CancellationToken::new();
        let old_seq = registry.register_device(device.clone(), old_tx, old_cancel.clone());

        let (new_tx, mut new_rx) = channel();
        registry.register_device(device.clone(), new_tx, CancellationToken::new());
        assert!(old_cancel.is_cancelled());

        // The stale socket's teardown must not remove the replacement.
        assert!(!registry.unregister_device(&device, old_seq));
        assert!(registry.device_connected(&device));

        assert!(registry.push_to_device(&device, Envelope::Ping));
        assert_eq!(new_rx.try_recv().unwrap(), Envelope::Ping);
    }

    #[test]
    fn test_admin_broadcast() {
        let registry = RelayRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        registry.register_admin(tx1);
        let seq2 = registry.register_admin(tx2);

        registry.broadcast_admins(Envelope::DeviceConnected { device_id: "kiosk-1".into() });
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());

        registry.unregister_admin(seq2);
        registry.broadcast_admins(Envelope::DeviceDisconnected { device_id: "kiosk-1".into() });
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }
}

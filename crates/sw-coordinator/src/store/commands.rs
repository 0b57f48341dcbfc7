//! Per-device command queue
//!
//! Delivery is at-least-once: pending commands are handed out on every
//! heartbeat (and optionally pushed) until the device acknowledges them.
//! Acknowledgment is idempotent - the first terminal outcome wins and a
//! replayed ack is a no-op, never an error.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use sw_core::time;
use sw_core::types::DeviceId;
use sw_protocol::{CommandId, CommandKind, CommandOutcome, WireCommand};

/// Lifecycle of a queued command; transitions are monotonic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Created, not yet acknowledged
    Pending,
    /// Acknowledged as executed
    Executed,
    /// Acknowledged as failed
    Failed,
}

impl CommandStatus {
    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CommandStatus::Pending)
    }
}

impl From<CommandOutcome> for CommandStatus {
    fn from(outcome: CommandOutcome) -> Self {
        match outcome {
            CommandOutcome::Executed => CommandStatus::Executed,
            CommandOutcome::Failed => CommandStatus::Failed,
        }
    }
}

/// Stored command row
#[derive(Debug, Clone)]
pub struct CommandRecord {
    pub id: CommandId,
    pub device_id: DeviceId,
    pub kind: CommandKind,
    pub status: CommandStatus,
    pub created_at: u64,
    pub executed_at: Option<u64>,
    pub result: Option<String>,
}

impl CommandRecord {
    /// Wire form delivered to the agent
    pub fn to_wire(&self) -> WireCommand {
        WireCommand {
            id: self.id,
            kind: self.kind.clone(),
            created_at: self.created_at,
        }
    }
}

/// What an acknowledgment did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDisposition {
    /// First terminal outcome recorded
    Applied,
    /// Command was already terminal; the stored outcome is kept
    AlreadyTerminal,
}

/// Command queue errors
#[derive(Error, Debug)]
pub enum CommandError {
    /// No command with this ID exists
    #[error("Unknown command: {0}")]
    UnknownCommand(CommandId),
}

/// FIFO of pending commands per device with idempotent acknowledgment
pub struct CommandQueue {
    commands: DashMap<CommandId, CommandRecord>,
    next_id: AtomicU64,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            commands: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a pending command for a device.
    ///
    /// The kind has already been validated against the vocabulary at the
    /// API boundary; this only assigns the ID and creation stamp.
    pub fn enqueue(&self, device_id: DeviceId, kind: CommandKind) -> WireCommand {
        let id = CommandId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = CommandRecord {
            id,
            device_id: device_id.clone(),
            kind,
            status: CommandStatus::Pending,
            created_at: time::now_millis(),
            executed_at: None,
            result: None,
        };
        let wire = record.to_wire();
        self.commands.insert(id, record);
        tracing::debug!("Enqueued {} for {}", id, device_id);
        wire
    }

    /// All pending commands for a device, in creation order.
    ///
    /// Commands stay pending until acknowledged, so the same list is
    /// redelivered on every heartbeat until the agent acks - the agent's
    /// per-session dedupe set collapses the duplicates.
    pub fn pending_for(&self, device_id: &DeviceId) -> Vec<WireCommand> {
        let mut wires: Vec<WireCommand> = self
            .commands
            .iter()
            .filter(|r| r.device_id == *device_id && r.status == CommandStatus::Pending)
            .map(|r| r.to_wire())
            .collect();
        wires.sort_by_key(|w| w.id.as_u64());
        wires
    }

    /// Idempotently record a terminal outcome.
    ///
    /// A command acknowledged twice - with the same or a different outcome -
    /// keeps its first terminal state and the replay reports
    /// [`AckDisposition::AlreadyTerminal`].
    pub fn acknowledge(
        &self,
        id: CommandId,
        outcome: CommandOutcome,
        result: Option<String>,
    ) -> Result<AckDisposition, CommandError> {
        let mut record = self
            .commands
            .get_mut(&id)
            .ok_or(CommandError::UnknownCommand(id))?;

        if record.status.is_terminal() {
            tracing::debug!("Replayed ack for {} ignored (already {:?})", id, record.status);
            return Ok(AckDisposition::AlreadyTerminal);
        }

        record.status = outcome.into();
        record.executed_at = Some(time::now_millis());
        record.result = result;
        Ok(AckDisposition::Applied)
    }

    /// Look up a command row
    pub fn get(&self, id: CommandId) -> Option<CommandRecord> {
        self.commands.get(&id).map(|r| r.clone())
    }

    /// Number of commands ever enqueued and still retained
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_in_creation_order() {
        let queue = CommandQueue::new();
        let device = DeviceId::new("kiosk-1");
        queue.enqueue(device.clone(), CommandKind::NextSlide);
        queue.enqueue(device.clone(), CommandKind::Restart);

        let pending = queue.pending_for(&device);
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].kind, CommandKind::NextSlide);
        assert_eq!(pending[1].kind, CommandKind::Restart);
        assert!(pending[0].id.as_u64() < pending[1].id.as_u64());
    }

    #[test]
    fn test_pending_scoped_per_device() {
        let queue = CommandQueue::new();
        queue.enqueue(DeviceId::new("kiosk-1"), CommandKind::Play);
        queue.enqueue(DeviceId::new("kiosk-2"), CommandKind::Pause);

        assert_eq!(queue.pending_for(&DeviceId::new("kiosk-1")).len(), 1);
        assert_eq!(queue.pending_for(&DeviceId::new("kiosk-2")).len(), 1);
    }

    #[test]
    fn test_redelivered_until_acked() {
        let queue = CommandQueue::new();
        let device = DeviceId::new("kiosk-1");
        let wire = queue.enqueue(device.clone(), CommandKind::Play);

        assert_eq!(queue.pending_for(&device).len(), 1);
        assert_eq!(queue.pending_for(&device).len(), 1);

        queue.acknowledge(wire.id, CommandOutcome::Executed, None).unwrap();
        assert!(queue.pending_for(&device).is_empty());
    }

    #[test]
    fn test_ack_first_writer_wins() {
        let queue = CommandQueue::new();
        let wire = queue.enqueue(DeviceId::new("kiosk-1"), CommandKind::Stop);

        let first = queue
            .acknowledge(wire.id, CommandOutcome::Failed, Some("boom".into()))
            .unwrap();
        assert_eq!(first, AckDisposition::Applied);

        // Replay with a different outcome: no error, stored outcome kept.
        let replay = queue
            .acknowledge(wire.id, CommandOutcome::Executed, None)
            .unwrap();
        assert_eq!(replay, AckDisposition::AlreadyTerminal);
        assert_eq!(queue.get(wire.id).unwrap().status, CommandStatus::Failed);
        assert_eq!(queue.get(wire.id).unwrap().result.as_deref(), Some("boom"));
    }

    #[test]
    fn test_ack_unknown_command() {
        let queue = CommandQueue::new();
        let err = queue
            .acknowledge(CommandId::new(999), CommandOutcome::Executed, None)
            .unwrap_err();
        assert!(matches!(err, CommandError::UnknownCommand(id) if id == CommandId::new(999)));
    }
}

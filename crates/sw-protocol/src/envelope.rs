//! Push-channel JSON envelopes
//!
//! The push channel is a persistent bidirectional WebSocket carrying one
//! JSON envelope per text frame, discriminated by a `type` field. It exists
//! purely to lower command latency: everything it delivers is also
//! reachable through the heartbeat poll, and the relay never buffers for
//! offline devices.
//!
//! # Message Flow
//!
//! 1. A device (or admin) connects and sends `register_device`
//!    (`register_admin`)
//! 2. The relay replies `registration_success`
//! 3. Admins receive `device_connected` / `device_disconnected` as devices
//!    register and drop
//! 4. `command` envelopes flow coordinator → device; `command_result`
//!    envelopes flow device → coordinator → admins
//! 5. `ping`/`pong` (~30s) detects dead sockets

use serde::{Deserialize, Serialize};

use crate::command::{CommandId, CommandKind, CommandOutcome, WireCommand};
use crate::error::ProtocolError;
use crate::heartbeat::StatusSnapshot;

/// A push-channel envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Device side of the registration handshake
    RegisterDevice { device_id: String },

    /// Administrator side of the registration handshake
    RegisterAdmin,

    /// Registration accepted
    RegistrationSuccess,

    /// Device status fan-out to administrators
    DeviceStatus {
        device_id: String,
        snapshot: StatusSnapshot,
    },

    /// A command bound for a device.
    ///
    /// Administrators send this with `device_id` set and no `id` (the
    /// coordinator assigns one while enqueuing); devices receive it with
    /// `id` populated. `admin_command` is accepted as a legacy alias.
    #[serde(alias = "admin_command")]
    Command {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<CommandId>,
        #[serde(flatten)]
        kind: CommandKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        created_at: Option<u64>,
    },

    /// Execution outcome, forwarded to administrators
    CommandResult {
        device_id: String,
        command_id: CommandId,
        status: CommandOutcome,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },

    /// Keep-alive probe
    Ping,

    /// Keep-alive reply
    Pong,

    /// A device registered on the relay
    DeviceConnected { device_id: String },

    /// A device's socket closed or went dead
    DeviceDisconnected { device_id: String },
}

impl Envelope {
    /// Build a device-bound command envelope from a queued command
    pub fn from_wire_command(command: &WireCommand) -> Self {
        Envelope::Command {
            device_id: None,
            id: Some(command.id),
            kind: command.kind.clone(),
            created_at: Some(command.created_at),
        }
    }

    /// Encode to a single JSON text frame
    pub fn to_text(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from a JSON text frame
    pub fn from_text(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names_match_wire_vocabulary() {
        let cases = [
            (
                Envelope::RegisterDevice { device_id: "kiosk-1".into() },
                "register_device",
            ),
            (Envelope::RegisterAdmin, "register_admin"),
            (Envelope::RegistrationSuccess, "registration_success"),
            (Envelope::Ping, "ping"),
            (Envelope::Pong, "pong"),
            (Envelope::DeviceConnected { device_id: "kiosk-1".into() }, "device_connected"),
            (Envelope::DeviceDisconnected { device_id: "kiosk-1".into() }, "device_disconnected"),
        ];
        for (envelope, tag) in cases {
            let value = serde_json::to_value(&envelope).unwrap();
            assert_eq!(value["type"], tag);
        }
    }

    #[test]
    fn test_admin_command_alias_accepted() {
        let text = r#"{"type":"admin_command","device_id":"kiosk-9","kind":"next_slide"}"#;
        let envelope = Envelope::from_text(text).unwrap();
        assert_eq!(
            envelope,
            Envelope::Command {
                device_id: Some("kiosk-9".to_string()),
                id: None,
                kind: CommandKind::NextSlide,
                created_at: None,
            }
        );
    }

    #[test]
    fn test_command_envelope_roundtrip() {
        let wire = WireCommand {
            id: CommandId::new(5),
            kind: CommandKind::GotoSlide { slide_index: 2 },
            created_at: 1234,
        };
        let envelope = Envelope::from_wire_command(&wire);
        let text = envelope.to_text().unwrap();
        let back = Envelope::from_text(&text).unwrap();
        assert_eq!(back, envelope);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "command");
        assert_eq!(value["kind"], "goto_slide");
        assert_eq!(value["parameters"]["slide_index"], 2);
    }

    #[test]
    fn test_garbage_frame_is_serialization_error() {
        let err = Envelope::from_text("not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Serialization(_)));
    }
}

//! Remote command vocabulary
//!
//! Commands are created on the coordinator and delivered to agents over two
//! channels: the heartbeat response (pull) and the push socket. Delivery is
//! at-least-once; agents deduplicate by [`CommandId`] and acknowledge over
//! HTTP regardless of which channel delivered the command.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ProtocolError;
use crate::presentation::PresentationId;

/// Unique identifier for a remote command, assigned by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub u64);

impl CommandId {
    /// Create a new command ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

impl From<u64> for CommandId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The fixed command vocabulary
///
/// Serialized as `{"kind": "...", "parameters": {...}}`; parameterless kinds
/// omit the `parameters` key entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "parameters", rename_all = "snake_case")]
pub enum CommandKind {
    /// Resume or start slide playback
    Play,
    /// Pause playback, preserving the remaining slide time
    Pause,
    /// Stop playback and leave the presentation
    Stop,
    /// Restart the current presentation from the first slide
    Restart,
    /// Advance to the next slide
    NextSlide,
    /// Go back to the previous slide
    PrevSlide,
    /// Jump to a specific slide
    GotoSlide { slide_index: usize },
    /// Bind this device to a presentation
    AssignPresentation {
        presentation_id: PresentationId,
        auto_play: bool,
        loop_mode: bool,
    },
    /// Reboot the device
    Reboot,
    /// Trigger an application update
    UpdateApp,
}

impl CommandKind {
    /// All wire names in the vocabulary
    pub const VOCABULARY: [&'static str; 10] = [
        "play",
        "pause",
        "stop",
        "restart",
        "next_slide",
        "prev_slide",
        "goto_slide",
        "assign_presentation",
        "reboot",
        "update_app",
    ];

    /// Wire name of this command kind
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Play => "play",
            CommandKind::Pause => "pause",
            CommandKind::Stop => "stop",
            CommandKind::Restart => "restart",
            CommandKind::NextSlide => "next_slide",
            CommandKind::PrevSlide => "prev_slide",
            CommandKind::GotoSlide { .. } => "goto_slide",
            CommandKind::AssignPresentation { .. } => "assign_presentation",
            CommandKind::Reboot => "reboot",
            CommandKind::UpdateApp => "update_app",
        }
    }

    /// Validate a raw (kind, parameters) pair against the vocabulary.
    ///
    /// Unknown kinds and missing or ill-typed parameters are rejected before
    /// a command is accepted into the queue.
    pub fn parse(
        kind: &str,
        parameters: Option<&serde_json::Value>,
    ) -> Result<Self, ProtocolError> {
        if !Self::VOCABULARY.contains(&kind) {
            return Err(ProtocolError::UnknownCommandKind(kind.to_string()));
        }

        let mut raw = serde_json::Map::new();
        raw.insert("kind".to_string(), serde_json::Value::String(kind.to_string()));
        if let Some(params) = parameters {
            raw.insert("parameters".to_string(), params.clone());
        }

        serde_json::from_value(serde_json::Value::Object(raw)).map_err(|e| {
            ProtocolError::InvalidParameters {
                kind: kind.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// Terminal outcome of a command execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The agent executed the command
    Executed,
    /// The agent could not execute the command
    Failed,
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Executed => write!(f, "executed"),
            CommandOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// A command as delivered to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireCommand {
    /// Coordinator-assigned command ID (dedupe key for the agent)
    pub id: CommandId,
    /// Command kind and parameters
    #[serde(flatten)]
    pub kind: CommandKind,
    /// Creation timestamp (Unix millis); delivery is in creation order
    pub created_at: u64,
}

/// Command acknowledgment sent by the agent after execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandAck {
    pub command_id: CommandId,
    pub status: CommandOutcome,
    /// Optional human-readable result or failure detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_parameterless_kinds() {
        for kind in ["play", "pause", "stop", "restart", "next_slide", "prev_slide", "reboot", "update_app"] {
            let parsed = CommandKind::parse(kind, None).unwrap();
            assert_eq!(parsed.name(), kind);
        }
    }

    #[test]
    fn test_parse_goto_slide() {
        let parsed = CommandKind::parse("goto_slide", Some(&json!({"slide_index": 3}))).unwrap();
        assert_eq!(parsed, CommandKind::GotoSlide { slide_index: 3 });
    }

    #[test]
    fn test_parse_assign_presentation() {
        let params = json!({"presentation_id": 7, "auto_play": true, "loop_mode": true});
        let parsed = CommandKind::parse("assign_presentation", Some(&params)).unwrap();
        assert_eq!(
            parsed,
            CommandKind::AssignPresentation {
                presentation_id: PresentationId::new(7),
                auto_play: true,
                loop_mode: true,
            }
        );
    }

    #[test]
    fn test_parse_unknown_kind_rejected() {
        let err = CommandKind::parse("self_destruct", None).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommandKind(k) if k == "self_destruct"));
    }

    #[test]
    fn test_parse_missing_parameters_rejected() {
        let err = CommandKind::parse("goto_slide", None).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidParameters { kind, .. } if kind == "goto_slide"));
    }

    #[test]
    fn test_wire_command_json_shape() {
        let cmd = WireCommand {
            id: CommandId::new(42),
            kind: CommandKind::GotoSlide { slide_index: 1 },
            created_at: 1700000000000,
        };
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["id"], 42);
        assert_eq!(value["kind"], "goto_slide");
        assert_eq!(value["parameters"]["slide_index"], 1);

        let back: WireCommand = serde_json::from_value(value).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(CommandOutcome::Executed.to_string(), "executed");
        assert_eq!(CommandOutcome::Failed.to_string(), "failed");
    }
}

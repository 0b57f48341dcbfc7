//! sw-protocol: Wire protocol for Slidewall device synchronization
//!
//! This crate defines the vocabulary exchanged between kiosk agents and the
//! coordinator: the remote-command set, the JSON envelopes carried over the
//! push channel, and the heartbeat/probe payloads used by the polling paths.

pub mod command;
pub mod envelope;
pub mod error;
pub mod heartbeat;
pub mod presentation;

pub use command::{CommandAck, CommandId, CommandKind, CommandOutcome, WireCommand};
pub use envelope::Envelope;
pub use error::ProtocolError;
pub use heartbeat::{CapabilitySet, HeartbeatRequest, HeartbeatResponse, ReportedStatus, StatusSnapshot};
pub use presentation::{
    AssignedPresentation, AssignmentProbeResponse, DefaultProbeResponse, Presentation,
    PresentationFetchResponse, PresentationId, Slide, TransitionType, ValidationError,
};

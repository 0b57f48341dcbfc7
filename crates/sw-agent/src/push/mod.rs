//! Push channel client
//!
//! Keeps a WebSocket open to the coordinator's relay for low-latency
//! command delivery. Strictly an accelerator: everything it carries also
//! flows through the heartbeat poll, so connection loss degrades latency
//! but never correctness - and never interrupts playback.

mod client;
mod reconnect;

pub use client::PushChannel;
pub use reconnect::ExponentialBackoff;

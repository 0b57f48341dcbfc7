//! Push relay
//!
//! Fans commands out to connected devices and device status out to
//! connected administrators over persistent WebSocket connections. The
//! relay holds no durable state and never buffers for offline devices: a
//! command for a device without a live socket simply waits in the command
//! queue for the next heartbeat.

mod registry;
mod socket;

pub use registry::RelayRegistry;
pub use socket::ws_handler;

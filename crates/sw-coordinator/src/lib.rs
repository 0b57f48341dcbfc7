//! sw-coordinator: Central daemon for the Slidewall kiosk fleet
//!
//! The coordinator owns the durable view of the fleet: which devices exist
//! and when they last reported (presence registry), which commands are
//! pending per device (command queue), and which presentation each device
//! should be showing (assignment store). It serves the HTTP API the agents
//! poll and a WebSocket push relay for low-latency command delivery.

pub mod api;
pub mod relay;
pub mod state;
pub mod store;

pub use state::CoordinatorState;

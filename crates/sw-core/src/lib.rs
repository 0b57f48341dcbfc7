//! sw-core: Core types and configuration for Slidewall
//!
//! This crate provides the shared domain types (device identity, derived
//! presence), configuration structures for the coordinator and agent
//! daemons, the error taxonomy, and time helpers used by both sides.

pub mod config;
pub mod error;
pub mod time;
pub mod types;

pub use error::SwError;
pub use types::{DeviceId, PresenceStatus};

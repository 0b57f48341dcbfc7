//! slidewall: Operator CLI for the Slidewall fleet
//!
//! Thin client over the coordinator's HTTP API plus an admin registration
//! on the push relay for live watching.

pub mod client;
pub mod commands;
pub mod output;

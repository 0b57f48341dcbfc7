//! sw-agent: Kiosk agent for Slidewall
//!
//! The agent runs unattended on a display device. It reports presence to
//! the coordinator, receives commands over both the heartbeat poll and the
//! push socket, resolves which presentation to show (assignment over
//! default), and drives the slide playback state machine with its
//! self-healing watchdog.
//!
//! Every loop in this crate - heartbeat, command routing, the two
//! assignment polls, slide countdown, watchdog, one-shot timers - is a
//! logical timer multiplexed cooperatively on one current-thread runtime.

pub mod api;
pub mod commands;
pub mod input;
pub mod metrics;
pub mod playback;
pub mod presence;
pub mod push;
pub mod resolver;
pub mod timers;

pub use playback::{PlaybackStatus, PlayerHandle};

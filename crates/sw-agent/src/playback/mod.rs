//! Playback engine
//!
//! The engine owns the slide-advance state machine and every timer that
//! belongs to a playback session. It runs as a single task whose loop
//! multiplexes the command channel, the 100 ms countdown tick, and the
//! 30 s watchdog tick; one-shot timers (finished-grace, hide-controls) are
//! keyed in a [`crate::timers::TimerSet`] and torn down together with the
//! session that armed them.

mod engine;
mod loader;
mod session;

pub use engine::{spawn, OpenRequest, PlaybackError, PlayerCommand, PlayerHandle};
pub use loader::{FetchError, HttpSlideLoader, LoadError, PresentationSource, SlideLoader};
pub use session::PlaybackSession;

use serde::Serialize;
use sw_protocol::{PresentationId, ReportedStatus};

/// Externally visible playback state, published on a watch channel.
///
/// The presence reporter folds this into the heartbeat snapshot; the
/// assignment resolver watches it to gate default auto-launches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackStatus {
    pub status: ReportedStatus,
    pub presentation_id: Option<PresentationId>,
    pub presentation_name: Option<String>,
    pub slide_index: Option<usize>,
    pub total_slides: Option<usize>,
    pub is_looping: bool,
    pub auto_play: bool,
}

impl PlaybackStatus {
    /// Whether no presentation is open or loading
    pub fn is_idle(&self) -> bool {
        self.status == ReportedStatus::Idle
    }
}

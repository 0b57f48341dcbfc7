//! Ephemeral playback session state
//!
//! A session exists from the moment a fetched presentation passes
//! validation until the user (or a command) navigates away. It is never
//! persisted; a fresh open always starts a fresh session.

use std::collections::HashSet;

use tokio::time::Instant;

use sw_protocol::{Presentation, Slide};

/// Outcome of an automatic slide advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next slide
    Moved(usize),
    /// Wrapped back to the first slide; the loop counter was incremented
    Wrapped,
    /// Ran off the end of a non-looping deck
    Finished,
}

/// Live state of an open presentation
#[derive(Debug)]
pub struct PlaybackSession {
    pub presentation: Presentation,
    /// Assignment-forced session: auto-play and loop were forced on and
    /// exits need confirmation
    pub forced: bool,
    pub auto_play: bool,
    pub playing: bool,
    pub finished: bool,
    pub looping: bool,
    pub loop_count: u32,
    pub current_slide_index: usize,
    /// Time left on the current slide; frozen while paused
    pub ms_remaining: u64,
    pub last_slide_change_at: Instant,
    /// Slides whose image failed to load; rendered as placeholders
    pub slide_errors: HashSet<u64>,
    /// Slides already fetched (current or speculative)
    pub prefetched: HashSet<u64>,
    /// Cleared once the loop counter hits the degraded-mode threshold
    pub prefetch_enabled: bool,
}

impl PlaybackSession {
    /// Create a session positioned on the first slide
    pub fn new(presentation: Presentation, auto_play: bool, looping: bool, forced: bool) -> Self {
        let first_duration = presentation
            .slides
            .first()
            .map(|s| s.effective_duration().as_millis() as u64)
            .unwrap_or(0);
        Self {
            presentation,
            forced,
            auto_play,
            playing: auto_play,
            finished: false,
            looping,
            loop_count: 0,
            current_slide_index: 0,
            ms_remaining: first_duration,
            last_slide_change_at: Instant::now(),
            slide_errors: HashSet::new(),
            prefetched: HashSet::new(),
            prefetch_enabled: true,
        }
    }

    /// Number of slides in the deck
    pub fn slide_count(&self) -> usize {
        self.presentation.slides.len()
    }

    /// The slide under the cursor
    pub fn current_slide(&self) -> &Slide {
        &self.presentation.slides[self.current_slide_index]
    }

    /// The slide after the cursor, honoring wrap-around
    pub fn next_slide(&self) -> Option<&Slide> {
        let next = self.current_slide_index + 1;
        if next < self.slide_count() {
            self.presentation.slides.get(next)
        } else if self.looping {
            self.presentation.slides.first()
        } else {
            None
        }
    }

    /// Position the cursor on a slide and restart its countdown
    pub fn enter(&mut self, index: usize) {
        debug_assert!(index < self.slide_count());
        self.current_slide_index = index;
        self.ms_remaining = self.current_slide().effective_duration().as_millis() as u64;
        self.last_slide_change_at = Instant::now();
    }

    /// Burn `tick_ms` off the countdown. Returns true when the slide's
    /// time is up. Paused and finished sessions never tick down.
    pub fn countdown(&mut self, tick_ms: u64) -> bool {
        if !self.playing || self.finished {
            return false;
        }
        self.ms_remaining = self.ms_remaining.saturating_sub(tick_ms);
        self.ms_remaining == 0
    }

    /// Advance past the current slide at countdown expiry
    pub fn advance_auto(&mut self) -> Advance {
        let next = self.current_slide_index + 1;
        if next < self.slide_count() {
            Advance::Moved(next)
        } else if self.looping {
            self.loop_count += 1;
            Advance::Wrapped
        } else {
            self.finished = true;
            self.playing = false;
            Advance::Finished
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_protocol::{PresentationId, TransitionType};

    fn deck(durations: &[u64]) -> Presentation {
        Presentation {
            id: PresentationId::new(1),
            name: "test deck".to_string(),
            description: None,
            slides: durations
                .iter()
                .enumerate()
                .map(|(i, &d)| Slide {
                    id: i as u64 + 1,
                    image_reference: format!("slides/{}.png", i + 1),
                    duration_seconds: d,
                    transition_type: TransitionType::Cut,
                })
                .collect(),
        }
    }

    /// Run `session` through `ms` of continuous playback in 100 ms ticks,
    /// applying the engine's advance rules.
    fn play_for(session: &mut PlaybackSession, ms: u64) {
        let mut remaining = ms;
        while remaining > 0 {
            remaining -= 100;
            if session.countdown(100) {
                match session.advance_auto() {
                    Advance::Moved(next) => session.enter(next),
                    Advance::Wrapped => session.enter(0),
                    Advance::Finished => {}
                }
            }
        }
    }

    #[tokio::test]
    async fn test_looping_deck_counts_loops() {
        let mut session = PlaybackSession::new(deck(&[1, 2]), true, true, false);

        // After k full passes of sum(durations), the cursor is back on
        // slide 0 and the loop counter equals k.
        play_for(&mut session, 3000);
        assert_eq!(session.loop_count, 1);
        assert_eq!(session.current_slide_index, 0);

        play_for(&mut session, 6000);
        assert_eq!(session.loop_count, 3);
        assert_eq!(session.current_slide_index, 0);
        assert!(session.playing);
    }

    #[tokio::test]
    async fn test_non_looping_deck_finishes() {
        let mut session = PlaybackSession::new(deck(&[1, 1]), true, false, false);
        play_for(&mut session, 2000);
        assert!(session.finished);
        assert!(!session.playing);
        assert_eq!(session.loop_count, 0);
    }

    #[tokio::test]
    async fn test_pause_freezes_countdown() {
        let mut session = PlaybackSession::new(deck(&[2]), true, true, false);
        play_for(&mut session, 500);
        assert_eq!(session.ms_remaining, 1500);

        session.playing = false;
        play_for(&mut session, 10_000);
        assert_eq!(session.ms_remaining, 1500);

        // Resuming picks up the remaining time, not a fresh slide.
        session.playing = true;
        play_for(&mut session, 1400);
        assert_eq!(session.ms_remaining, 100);
    }

    #[tokio::test]
    async fn test_enter_resets_countdown() {
        let mut session = PlaybackSession::new(deck(&[5, 3]), true, true, false);
        play_for(&mut session, 1000);
        session.enter(1);
        assert_eq!(session.current_slide_index, 1);
        assert_eq!(session.ms_remaining, 3000);
    }

    #[tokio::test]
    async fn test_next_slide_wraps_only_when_looping() {
        let mut session = PlaybackSession::new(deck(&[1, 1]), true, false, false);
        session.enter(1);
        assert!(session.next_slide().is_none());

        session.looping = true;
        assert_eq!(session.next_slide().unwrap().id, 1);
    }
}

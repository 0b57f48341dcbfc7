//! The slide-advance state machine
//!
//! States: `Idle -> Loading -> {Playing | Paused} -> Finished`, with
//! `Error` reachable from `Loading`. The engine task owns the countdown
//! and watchdog ticks plus every one-shot timer of the session; teardown
//! cancels them all synchronously so nothing can fire into a dead session.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

use sw_core::config::TuningConfig;
use sw_protocol::{Presentation, PresentationId, ReportedStatus, ValidationError};

use crate::input::{FocusTarget, FocusModel, InputAction, RemoteEvent};
use crate::resolver::ResolverSignal;
use crate::timers::{TimerKey, TimerSet};

use super::loader::{FetchError, LoadError, PresentationSource, SlideLoader};
use super::session::{Advance, PlaybackSession};
use super::PlaybackStatus;

/// Why a presentation could not be opened
#[derive(Debug, Clone)]
pub enum PlaybackError {
    /// The fetch itself failed; retry may help
    Fetch(FetchError),
    /// The deck arrived but is not playable; retry will not help until the
    /// catalog changes
    Validation(ValidationError),
}

/// Parameters of an open request, kept for retry
#[derive(Debug, Clone, Copy)]
pub struct OpenRequest {
    pub presentation_id: PresentationId,
    pub auto_play: bool,
    pub loop_mode: bool,
    /// Assignment-forced: auto-play and loop are forced on and the session
    /// self-recovers from Finished
    pub forced: bool,
}

/// Commands accepted by the engine task
#[derive(Debug)]
pub enum PlayerCommand {
    /// Open a presentation, replacing whatever is showing
    Open(OpenRequest),
    Play,
    Pause,
    TogglePlay,
    /// Leave the playback screen entirely
    Stop,
    Restart,
    NextSlide,
    PrevSlide,
    Goto(usize),
    ToggleLoop,
    /// Re-attempt the open that landed in `Error`
    Retry,
    /// A remote-control event
    Input(RemoteEvent),
    /// Tear down and exit the engine task
    Shutdown,

    // Internal deliveries (fetch results and one-shot timers); routed
    // through the same channel so the engine stays a single event loop.
    Loaded {
        seq: u64,
        result: Result<Presentation, FetchError>,
    },
    SlideLoaded {
        slide_id: u64,
        result: Result<(), LoadError>,
    },
    FinishedGraceElapsed,
    HideControlsElapsed,
}

/// Cloneable handle for submitting commands to the engine
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
}

impl PlayerHandle {
    /// Submit a command; silently dropped if the engine is gone
    pub fn send(&self, command: PlayerCommand) {
        let _ = self.tx.send(command);
    }

    /// Open a presentation
    pub fn open(&self, presentation_id: PresentationId, auto_play: bool, loop_mode: bool, forced: bool) {
        self.send(PlayerCommand::Open(OpenRequest {
            presentation_id,
            auto_play,
            loop_mode,
            forced,
        }));
    }

    /// Forward a remote-control event
    pub fn input(&self, event: RemoteEvent) {
        self.send(PlayerCommand::Input(event));
    }

    /// Request engine shutdown
    pub fn shutdown(&self) {
        self.send(PlayerCommand::Shutdown);
    }

    /// Handle over a bare channel, for exercising consumers without an
    /// engine task behind them
    #[cfg(test)]
    pub(crate) fn for_tests(tx: mpsc::UnboundedSender<PlayerCommand>) -> Self {
        Self { tx }
    }
}

/// Spawn the engine task. Returns the command handle.
pub fn spawn(
    tuning: TuningConfig,
    source: Arc<dyn PresentationSource>,
    loader: Arc<dyn SlideLoader>,
    status_tx: watch::Sender<PlaybackStatus>,
    resolver_tx: mpsc::UnboundedSender<ResolverSignal>,
) -> (PlayerHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = Engine::new(tuning, source, loader, tx.clone(), status_tx, resolver_tx);
    let handle = tokio::spawn(engine.run(rx));
    (PlayerHandle { tx }, handle)
}

enum EngineState {
    Idle,
    Loading {
        request: OpenRequest,
    },
    Active {
        session: PlaybackSession,
        focus: FocusModel,
    },
    Error {
        request: OpenRequest,
        error: PlaybackError,
    },
}

struct Engine {
    tuning: TuningConfig,
    source: Arc<dyn PresentationSource>,
    loader: Arc<dyn SlideLoader>,
    /// Clone of the engine's own command sender, used by fetch tasks and
    /// one-shot timers
    tx: mpsc::UnboundedSender<PlayerCommand>,
    status_tx: watch::Sender<PlaybackStatus>,
    resolver_tx: mpsc::UnboundedSender<ResolverSignal>,
    timers: TimerSet<PlayerCommand>,
    state: EngineState,
    /// Monotonic open sequence; a stale fetch result is discarded
    load_seq: u64,
    controls_visible: bool,
}

impl Engine {
    fn new(
        tuning: TuningConfig,
        source: Arc<dyn PresentationSource>,
        loader: Arc<dyn SlideLoader>,
        tx: mpsc::UnboundedSender<PlayerCommand>,
        status_tx: watch::Sender<PlaybackStatus>,
        resolver_tx: mpsc::UnboundedSender<ResolverSignal>,
    ) -> Self {
        Self {
            tuning,
            source,
            loader,
            tx: tx.clone(),
            status_tx,
            resolver_tx,
            timers: TimerSet::new(tx),
            state: EngineState::Idle,
            load_seq: 0,
            controls_visible: false,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PlayerCommand>) {
        let mut countdown = interval(self.tuning.countdown_tick);
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut watchdog = interval(self.tuning.watchdog_tick);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = rx.recv() => {
                    match command {
                        None | Some(PlayerCommand::Shutdown) => {
                            self.teardown();
                            break;
                        }
                        Some(command) => self.handle_command(command),
                    }
                }
                _ = countdown.tick() => self.on_countdown_tick(),
                _ = watchdog.tick() => self.on_watchdog_tick(),
            }
        }
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Open(request) => self.handle_open(request),
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::TogglePlay => self.toggle_play(),
            PlayerCommand::Stop => self.handle_stop(),
            PlayerCommand::Restart => self.restart(),
            PlayerCommand::NextSlide => self.manual_step(1),
            PlayerCommand::PrevSlide => self.manual_step(-1),
            PlayerCommand::Goto(index) => self.manual_goto(index),
            PlayerCommand::ToggleLoop => self.toggle_loop(),
            PlayerCommand::Retry => self.handle_retry(),
            PlayerCommand::Input(event) => self.on_input(event),
            PlayerCommand::Loaded { seq, result } => self.on_loaded(seq, result),
            PlayerCommand::SlideLoaded { slide_id, result } => self.on_slide_loaded(slide_id, result),
            PlayerCommand::FinishedGraceElapsed => self.on_finished_grace(),
            PlayerCommand::HideControlsElapsed => self.controls_visible = false,
            PlayerCommand::Shutdown => unreachable!("handled by the run loop"),
        }
    }

    // ------------------------------------------------------------------
    // Opening and loading
    // ------------------------------------------------------------------

    fn handle_open(&mut self, request: OpenRequest) {
        self.teardown_session();
        self.load_seq += 1;
        let seq = self.load_seq;
        self.state = EngineState::Loading { request };
        self.publish_status();
        tracing::info!("Opening {} (forced: {})", request.presentation_id, request.forced);

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = source.fetch(request.presentation_id).await;
            let _ = tx.send(PlayerCommand::Loaded { seq, result });
        });
    }

    fn on_loaded(&mut self, seq: u64, result: Result<Presentation, FetchError>) {
        // A newer open supersedes this fetch entirely.
        if seq != self.load_seq {
            tracing::debug!("Discarding stale fetch result (seq {})", seq);
            return;
        }
        let request = match &self.state {
            EngineState::Loading { request } => *request,
            _ => return,
        };

        let presentation = match result {
            Ok(presentation) => presentation,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", request.presentation_id, e);
                self.state = EngineState::Error { request, error: PlaybackError::Fetch(e) };
                self.publish_status();
                return;
            }
        };

        if let Err(e) = presentation.validate_playable() {
            tracing::warn!("Rejecting unplayable deck: {}", e);
            self.state = EngineState::Error { request, error: PlaybackError::Validation(e) };
            self.publish_status();
            return;
        }

        // Assignments are always auto-played and looped, whatever their
        // own flags say: an unattended display must not sit on a paused
        // first slide.
        let auto_play = request.forced || request.auto_play;
        let looping = request.forced || request.loop_mode;
        let slide_count = presentation.slides.len();
        let session = PlaybackSession::new(presentation, auto_play, looping, request.forced);

        tracing::info!(
            "Now {} {} ({} slides)",
            if auto_play { "playing" } else { "showing" },
            request.presentation_id,
            slide_count
        );
        self.state = EngineState::Active { session, focus: FocusModel::new(slide_count) };
        self.warm_slides();
        self.publish_status();
    }

    fn handle_retry(&mut self) {
        if let EngineState::Error { request, .. } = &self.state {
            self.handle_open(*request);
        }
    }

    // ------------------------------------------------------------------
    // Countdown, advancement, watchdog
    // ------------------------------------------------------------------

    fn on_countdown_tick(&mut self) {
        let tick_ms = self.tuning.countdown_tick.as_millis() as u64;
        let advance = match &mut self.state {
            EngineState::Active { session, .. } => {
                if session.countdown(tick_ms) {
                    Some(session.advance_auto())
                } else {
                    None
                }
            }
            _ => None,
        };

        match advance {
            Some(Advance::Moved(next)) => self.enter_slide(next),
            Some(Advance::Wrapped) => {
                self.enter_slide(0);
                self.on_loop_completed();
            }
            Some(Advance::Finished) => self.on_finished(),
            None => {}
        }
    }

    fn enter_slide(&mut self, index: usize) {
        if let EngineState::Active { session, .. } = &mut self.state {
            session.enter(index);
        }
        self.warm_slides();
        self.publish_status();
    }

    fn on_loop_completed(&mut self) {
        let threshold = self.tuning.degraded_loop_threshold;
        let stride = self.tuning.cache_drop_stride.max(1);
        let EngineState::Active { session, .. } = &mut self.state else { return };

        let loops = session.loop_count;
        if loops < threshold {
            return;
        }
        if session.prefetch_enabled {
            session.prefetch_enabled = false;
            tracing::info!("Degraded-resource mode after {} loops: prefetch off", loops);
        }
        if (loops - threshold) % stride == 0 {
            session.slide_errors.clear();
            session.prefetched.clear();
            tracing::debug!("Dropped cached slide state at loop {}", loops);
        }
    }

    fn on_finished(&mut self) {
        self.publish_status();
        if let EngineState::Active { session, .. } = &self.state {
            if session.forced {
                tracing::info!("Assigned session ran out; restarting after grace");
                self.timers.schedule(
                    TimerKey::FinishedGrace,
                    self.tuning.finished_grace,
                    PlayerCommand::FinishedGraceElapsed,
                );
            } else {
                tracing::info!("Presentation finished; awaiting restart/loop/exit choice");
            }
        }
    }

    fn on_finished_grace(&mut self) {
        if let EngineState::Active { session, .. } = &mut self.state {
            if session.finished && session.forced {
                session.looping = true;
                session.finished = false;
                session.playing = true;
                self.enter_slide(0);
            }
        }
    }

    fn on_watchdog_tick(&mut self) {
        let stalled = matches!(
            &self.state,
            EngineState::Active { session, .. }
                if session.playing
                    && session.looping
                    && session.last_slide_change_at.elapsed() > self.tuning.stall_threshold
        );
        if !stalled {
            return;
        }

        // Self-healing, not a user-visible failure: restart the session
        // as a normal transition back into playback.
        tracing::warn!(
            "No slide change for over {:?} while playing; forcing session restart",
            self.tuning.stall_threshold
        );
        if let EngineState::Active { session, .. } = &mut self.state {
            session.finished = false;
            session.playing = true;
        }
        self.enter_slide(0);
    }

    // ------------------------------------------------------------------
    // Slide image warming
    // ------------------------------------------------------------------

    fn warm_slides(&mut self) {
        let mut wanted: Vec<(u64, String)> = Vec::new();
        {
            let EngineState::Active { session, .. } = &mut self.state else { return };

            let current = session.current_slide().clone();
            if !current.has_media() {
                session.slide_errors.insert(current.id);
            } else if !session.prefetched.contains(&current.id)
                && !session.slide_errors.contains(&current.id)
            {
                wanted.push((current.id, current.image_reference.clone()));
            }

            if session.prefetch_enabled {
                if let Some(next) = session.next_slide() {
                    if next.id != current.id
                        && next.has_media()
                        && !session.prefetched.contains(&next.id)
                        && !session.slide_errors.contains(&next.id)
                    {
                        wanted.push((next.id, next.image_reference.clone()));
                    }
                }
            }
        }

        for (slide_id, reference) in wanted {
            let loader = Arc::clone(&self.loader);
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let result = loader.load(&reference).await;
                let _ = tx.send(PlayerCommand::SlideLoaded { slide_id, result });
            });
        }
    }

    fn on_slide_loaded(&mut self, slide_id: u64, result: Result<(), LoadError>) {
        let EngineState::Active { session, .. } = &mut self.state else { return };
        match result {
            Ok(()) => {
                session.prefetched.insert(slide_id);
            }
            Err(e) => {
                // Placeholder from here on; the countdown keeps running.
                if session.slide_errors.insert(slide_id) {
                    tracing::warn!("Slide {} failed to load ({}); showing placeholder", slide_id, e);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Transport controls
    // ------------------------------------------------------------------

    fn play(&mut self) {
        let restart = match &mut self.state {
            EngineState::Active { session, .. } => {
                if session.finished {
                    session.finished = false;
                    session.playing = true;
                    true
                } else {
                    session.playing = true;
                    false
                }
            }
            _ => return,
        };
        if restart {
            self.enter_slide(0);
        } else {
            self.publish_status();
        }
    }

    fn pause(&mut self) {
        if let EngineState::Active { session, .. } = &mut self.state {
            session.playing = false;
            self.publish_status();
        }
    }

    fn toggle_play(&mut self) {
        let playing = matches!(&self.state, EngineState::Active { session, .. } if session.playing);
        if playing {
            self.pause();
        } else {
            self.play();
        }
    }

    fn restart(&mut self) {
        if let EngineState::Active { session, .. } = &mut self.state {
            session.finished = false;
            session.playing = true;
            self.enter_slide(0);
        }
    }

    fn manual_step(&mut self, delta: i64) {
        let target = match &mut self.state {
            EngineState::Active { session, .. } => {
                let count = session.slide_count() as i64;
                let target = (session.current_slide_index as i64 + delta).rem_euclid(count);
                session.finished = false;
                target as usize
            }
            // Navigation is illegal while Loading or in Error.
            _ => return,
        };
        self.enter_slide(target);
    }

    fn manual_goto(&mut self, index: usize) {
        let valid = match &mut self.state {
            EngineState::Active { session, .. } => {
                if index < session.slide_count() {
                    session.finished = false;
                    true
                } else {
                    tracing::warn!("Ignoring goto past the deck: {}", index);
                    false
                }
            }
            _ => return,
        };
        if valid {
            self.enter_slide(index);
        }
    }

    fn toggle_loop(&mut self) {
        let resume = match &mut self.state {
            EngineState::Active { session, .. } => {
                session.looping = !session.looping;
                if session.finished && session.looping {
                    session.finished = false;
                    session.playing = true;
                    true
                } else {
                    false
                }
            }
            _ => return,
        };
        if resume {
            self.enter_slide(0);
        } else {
            self.publish_status();
        }
    }

    fn handle_stop(&mut self) {
        self.teardown_session();
        self.publish_status();
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    fn on_input(&mut self, event: RemoteEvent) {
        match &self.state {
            EngineState::Idle => {
                // No session: the prompt (if any) belongs to the resolver.
                let _ = self.resolver_tx.send(ResolverSignal::PromptInput(event));
                return;
            }
            EngineState::Loading { .. } => return,
            EngineState::Error { .. } => {
                match event {
                    RemoteEvent::Select => self.handle_retry(),
                    RemoteEvent::Back => self.handle_stop(),
                    _ => {}
                }
                return;
            }
            EngineState::Active { .. } => {}
        }

        let action = {
            let EngineState::Active { session, focus } = &mut self.state else { return };
            let protected = session.forced && session.playing && session.looping;
            focus.handle(event, protected)
        };
        self.show_controls();

        match action {
            InputAction::FocusMoved | InputAction::None => {}
            InputAction::Activate(target) => self.activate(target),
            InputAction::Exit => {
                tracing::info!("Exiting playback via remote");
                self.handle_stop();
            }
            InputAction::ConfirmExit => {
                tracing::info!("Assigned session active; press back again to exit");
            }
        }
    }

    fn activate(&mut self, target: FocusTarget) {
        match target {
            FocusTarget::Exit => self.handle_stop(),
            FocusTarget::Prev => self.manual_step(-1),
            FocusTarget::PlayPause => self.toggle_play(),
            FocusTarget::Next => self.manual_step(1),
            FocusTarget::Restart => self.restart(),
            FocusTarget::LoopToggle => self.toggle_loop(),
            FocusTarget::Thumbnail(index) => self.manual_goto(index),
        }
    }

    fn show_controls(&mut self) {
        self.controls_visible = true;
        self.timers.schedule(
            TimerKey::HideControls,
            self.tuning.hide_controls_delay,
            PlayerCommand::HideControlsElapsed,
        );
    }

    // ------------------------------------------------------------------
    // Teardown and status
    // ------------------------------------------------------------------

    /// Drop the session and every timer it owns. Nothing may fire into a
    /// torn-down session; the input handler detaches with it.
    fn teardown_session(&mut self) {
        self.timers.cancel_all();
        self.controls_visible = false;
        if matches!(self.state, EngineState::Active { .. }) {
            tracing::info!("Leaving playback session");
        }
        self.state = EngineState::Idle;
    }

    fn teardown(&mut self) {
        self.teardown_session();
        self.publish_status();
    }

    fn publish_status(&self) {
        let status = match &self.state {
            EngineState::Idle => PlaybackStatus::default(),
            EngineState::Loading { request } => PlaybackStatus {
                status: ReportedStatus::Loading,
                presentation_id: Some(request.presentation_id),
                ..Default::default()
            },
            EngineState::Error { request, .. } => PlaybackStatus {
                status: ReportedStatus::Error,
                presentation_id: Some(request.presentation_id),
                ..Default::default()
            },
            EngineState::Active { session, .. } => PlaybackStatus {
                status: if session.finished {
                    ReportedStatus::Finished
                } else if session.playing {
                    ReportedStatus::Playing
                } else {
                    ReportedStatus::Paused
                },
                presentation_id: Some(session.presentation.id),
                presentation_name: Some(session.presentation.name.clone()),
                slide_index: Some(session.current_slide_index),
                total_slides: Some(session.slide_count()),
                is_looping: session.looping,
                auto_play: session.auto_play,
            },
        };
        self.status_tx.send_replace(status);
    }
}

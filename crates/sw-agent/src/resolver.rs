//! Assignment resolution
//!
//! Two gated poll loops discover what this device should be showing: the
//! assignment probe (~15 s) and the default-presentation probe (~30 s).
//! The precedence invariant is absolute: an assignment always preempts the
//! fleet default, whichever arrives first. A default is only ever offered -
//! a dismissible prompt plus an auto-launch timer - while an assignment is
//! applied outright after a short settle delay, with auto-play and loop
//! forced on.
//!
//! The first round of each poll doubles as the capability probe: a 404
//! means the coordinator lacks that endpoint, and the loop disables itself
//! for the rest of the session instead of retrying a missing feature.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use sw_core::config::AgentConfig;
use sw_protocol::PresentationId;

use crate::api::{ApiError, CoordinatorClient};
use crate::input::RemoteEvent;
use crate::playback::{PlaybackStatus, PlayerHandle};
use crate::timers::{TimerKey, TimerSet};

/// External triggers routed into the resolver
#[derive(Debug)]
pub enum ResolverSignal {
    /// An `assign_presentation` command arrived (either delivery channel)
    Assignment { presentation_id: PresentationId },
    /// Remote input received while no playback session is active
    PromptInput(RemoteEvent),
}

/// One-shot timer deliveries, routed back into the resolver's own loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverEvent {
    /// Settle delay elapsed; open the assignment
    Settle(PresentationId),
    /// Default auto-launch dwell elapsed
    AutoLaunch(PresentationId),
    /// Prompt visibility timeout (does not touch the auto-launch)
    HidePrompt,
}

#[derive(Debug)]
struct PromptState {
    presentation_id: PresentationId,
    visible: bool,
}

/// The resolver task
pub struct AssignmentResolver {
    config: Arc<AgentConfig>,
    client: Arc<CoordinatorClient>,
    player: PlayerHandle,
    device_id: String,
    timers: TimerSet<ResolverEvent>,
    /// Assignment currently applied to the engine
    applied: Option<PresentationId>,
    /// Assignment waiting out its settle delay
    pending: Option<PresentationId>,
    prompt: Option<PromptState>,
    assignment_supported: bool,
    default_supported: bool,
}

impl AssignmentResolver {
    /// Create the resolver plus the receiver for its internal timers
    pub fn new(
        config: Arc<AgentConfig>,
        client: Arc<CoordinatorClient>,
        player: PlayerHandle,
    ) -> (Self, mpsc::UnboundedReceiver<ResolverEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let device_id = config.effective_device_id();
        let resolver = Self {
            config,
            client,
            player,
            device_id,
            timers: TimerSet::new(event_tx),
            applied: None,
            pending: None,
            prompt: None,
            assignment_supported: true,
            default_supported: true,
        };
        (resolver, event_rx)
    }

    /// Run until cancelled. Starts only after presence is confirmed
    /// healthy (the device is registered by then).
    pub async fn run(
        mut self,
        mut event_rx: mpsc::UnboundedReceiver<ResolverEvent>,
        mut signal_rx: mpsc::UnboundedReceiver<ResolverSignal>,
        mut health_rx: watch::Receiver<bool>,
        mut status_rx: watch::Receiver<PlaybackStatus>,
        cancel: CancellationToken,
    ) {
        tokio::select! {
            result = health_rx.wait_for(|healthy| *healthy) => {
                if result.is_err() {
                    return;
                }
            }
            _ = cancel.cancelled() => return,
        }

        let mut assignment_ticker = interval(self.config.tuning.assignment_poll_interval);
        assignment_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut default_ticker = interval(self.config.tuning.default_poll_interval);
        default_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = assignment_ticker.tick(), if self.assignment_supported => {
                    self.poll_assignment().await;
                }
                _ = default_ticker.tick(), if self.default_supported => {
                    self.poll_default(&status_rx).await;
                }
                signal = signal_rx.recv() => {
                    match signal {
                        Some(ResolverSignal::Assignment { presentation_id }) => {
                            self.on_assignment_detected(presentation_id, "command");
                        }
                        Some(ResolverSignal::PromptInput(event)) => self.on_prompt_input(event),
                        None => break,
                    }
                }
                event = event_rx.recv() => {
                    match event {
                        Some(event) => self.on_timer(event),
                        None => break,
                    }
                }
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    // Something is on screen (manual open, assignment, a
                    // pushed command): a pending default offer is moot.
                    if !status_rx.borrow().is_idle() {
                        self.clear_default_offer();
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }

        self.timers.cancel_all();
        tracing::debug!("Assignment resolver stopped");
    }

    // ------------------------------------------------------------------
    // Polls
    // ------------------------------------------------------------------

    async fn poll_assignment(&mut self) {
        match self.client.probe_assignment(&self.device_id).await {
            Ok(response) => match response.assigned_presentation {
                Some(assignment) => {
                    self.on_assignment_detected(assignment.presentation_id, "poll");
                }
                None => {
                    // Assignment withdrawn; the default becomes eligible
                    // again on its next poll.
                    self.applied = None;
                }
            },
            Err(ApiError::EndpointMissing) => {
                tracing::info!("Coordinator has no assignment endpoint; disabling that poll");
                self.assignment_supported = false;
            }
            Err(e) if e.is_transient() => {
                tracing::debug!("Assignment poll failed: {}", e);
            }
            Err(e) => {
                tracing::warn!("Assignment poll failed: {}", e);
            }
        }
    }

    async fn poll_default(&mut self, status_rx: &watch::Receiver<PlaybackStatus>) {
        if self.applied.is_some() || self.pending.is_some() {
            return;
        }

        match self.client.probe_default().await {
            Ok(response) => match response.default_presentation {
                Some(deck) => {
                    let idle = status_rx.borrow().is_idle();
                    self.offer_default(deck.id, idle);
                }
                None => self.clear_default_offer(),
            },
            Err(ApiError::EndpointMissing) => {
                tracing::info!("Coordinator has no default-presentation endpoint; disabling that poll");
                self.default_supported = false;
            }
            Err(e) if e.is_transient() => {
                tracing::debug!("Default poll failed: {}", e);
            }
            Err(e) => {
                tracing::warn!("Default poll failed: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // Assignment precedence
    // ------------------------------------------------------------------

    fn on_assignment_detected(&mut self, presentation_id: PresentationId, via: &str) {
        // The assignment always wins: kill the default's offer first so no
        // auto-launch can slip in during the settle delay.
        self.timers.cancel(TimerKey::DefaultAutoLaunch);
        self.hide_prompt();

        if self.applied == Some(presentation_id) || self.pending == Some(presentation_id) {
            return;
        }

        tracing::info!(
            "Assignment {} detected via {}; opening after settle delay",
            presentation_id,
            via
        );
        self.pending = Some(presentation_id);
        self.timers.schedule(
            TimerKey::SettleDelay,
            self.config.tuning.settle_delay,
            ResolverEvent::Settle(presentation_id),
        );
    }

    fn on_timer(&mut self, event: ResolverEvent) {
        match event {
            ResolverEvent::Settle(presentation_id) => {
                if self.pending != Some(presentation_id) {
                    return;
                }
                self.pending = None;
                self.applied = Some(presentation_id);
                // Forced: auto-play and loop regardless of the
                // assignment's own flags.
                self.player.open(presentation_id, true, true, true);
                self.notify_viewed();
            }
            ResolverEvent::AutoLaunch(presentation_id) => {
                self.prompt = None;
                if self.applied.is_some() || self.pending.is_some() {
                    return;
                }
                tracing::info!("Auto-launching default presentation {}", presentation_id);
                self.player.open(presentation_id, true, true, false);
            }
            ResolverEvent::HidePrompt => {
                // Visibility only; the auto-launch timer keeps running.
                if let Some(prompt) = &mut self.prompt {
                    prompt.visible = false;
                    tracing::debug!("Default-presentation prompt hidden");
                }
            }
        }
    }

    /// Best-effort viewed notification; never blocks playback
    fn notify_viewed(&self) {
        let client = Arc::clone(&self.client);
        let device_id = self.device_id.clone();
        tokio::spawn(async move {
            if let Err(e) = client.mark_viewed(&device_id).await {
                tracing::debug!("Viewed notification failed: {}", e);
            }
        });
    }

    // ------------------------------------------------------------------
    // Default offer
    // ------------------------------------------------------------------

    fn offer_default(&mut self, presentation_id: PresentationId, engine_idle: bool) {
        if !engine_idle || self.prompt.is_some() || self.timers.is_armed(TimerKey::DefaultAutoLaunch)
        {
            return;
        }

        tracing::info!(
            "Default presentation {} available; auto-launching in {:?} unless dismissed",
            presentation_id,
            self.config.tuning.auto_launch_delay
        );
        self.prompt = Some(PromptState { presentation_id, visible: true });
        self.timers.schedule(
            TimerKey::PromptHide,
            self.config.tuning.prompt_visibility,
            ResolverEvent::HidePrompt,
        );
        self.timers.schedule(
            TimerKey::DefaultAutoLaunch,
            self.config.tuning.auto_launch_delay,
            ResolverEvent::AutoLaunch(presentation_id),
        );
    }

    fn on_prompt_input(&mut self, event: RemoteEvent) {
        let Some(prompt) = &self.prompt else { return };
        let presentation_id = prompt.presentation_id;

        match event {
            RemoteEvent::Select => {
                tracing::info!("Default presentation launched from the prompt");
                self.clear_default_offer();
                self.player.open(presentation_id, true, true, false);
            }
            RemoteEvent::Back | RemoteEvent::Menu => {
                tracing::info!("Default-presentation prompt dismissed");
                self.clear_default_offer();
            }
            _ => {}
        }
    }

    fn clear_default_offer(&mut self) {
        self.timers.cancel(TimerKey::DefaultAutoLaunch);
        self.hide_prompt();
    }

    fn hide_prompt(&mut self) {
        self.timers.cancel(TimerKey::PromptHide);
        self.prompt = None;
    }
}

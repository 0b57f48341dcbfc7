//! Unified command channel
//!
//! Commands reach the agent over two channels - the heartbeat response and
//! the push socket - and delivery is at-least-once, so the same command may
//! arrive several times. The router executes each distinct command ID
//! exactly once per session and acknowledges over HTTP every time, giving
//! the coordinator a single channel-agnostic place to observe completion.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use sw_core::config::AgentConfig;
use sw_protocol::{CommandAck, CommandId, CommandKind, CommandOutcome, Envelope, WireCommand};

use crate::api::CoordinatorClient;
use crate::playback::{PlayerCommand, PlayerHandle};
use crate::resolver::ResolverSignal;

/// Which channel delivered a command (logging only; execution is identical)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryChannel {
    Poll,
    Push,
}

/// A command handed to the router
#[derive(Debug)]
pub struct Delivered {
    pub command: WireCommand,
    pub via: DeliveryChannel,
}

/// Executes commands idempotently and acknowledges them
pub struct CommandRouter {
    config: Arc<AgentConfig>,
    client: Arc<CoordinatorClient>,
    player: PlayerHandle,
    resolver_tx: mpsc::UnboundedSender<ResolverSignal>,
    /// Feeds `command_result` envelopes to the push socket (best-effort)
    result_tx: mpsc::UnboundedSender<Envelope>,
    device_id: String,
    /// Command IDs already executed this session
    executed: HashSet<CommandId>,
}

impl CommandRouter {
    pub fn new(
        config: Arc<AgentConfig>,
        client: Arc<CoordinatorClient>,
        player: PlayerHandle,
        resolver_tx: mpsc::UnboundedSender<ResolverSignal>,
        result_tx: mpsc::UnboundedSender<Envelope>,
    ) -> Self {
        let device_id = config.effective_device_id();
        Self {
            config,
            client,
            player,
            resolver_tx,
            result_tx,
            device_id,
            executed: HashSet::new(),
        }
    }

    /// Run the router task until every sender is gone
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Delivered>) {
        while let Some(delivered) = rx.recv().await {
            self.deliver(delivered).await;
        }
        tracing::debug!("Command router stopped");
    }

    /// Execute (at most once) and acknowledge (every time) one delivery
    pub async fn deliver(&mut self, delivered: Delivered) {
        let Delivered { command, via } = delivered;

        let outcome = if self.executed.contains(&command.id) {
            // Duplicate from the other channel or a redelivery; the
            // earlier execution stands, only the ack is repeated.
            tracing::debug!("Duplicate {} via {:?} collapsed", command.id, via);
            CommandOutcome::Executed
        } else {
            tracing::info!("Executing {} ({}) via {:?}", command.id, command.kind.name(), via);
            let outcome = self.execute(&command.kind).await;
            self.executed.insert(command.id);
            outcome
        };

        self.acknowledge(command.id, outcome).await;
    }

    async fn execute(&self, kind: &CommandKind) -> CommandOutcome {
        match kind {
            CommandKind::Play => self.player.send(PlayerCommand::Play),
            CommandKind::Pause => self.player.send(PlayerCommand::Pause),
            CommandKind::Stop => self.player.send(PlayerCommand::Stop),
            CommandKind::Restart => self.player.send(PlayerCommand::Restart),
            CommandKind::NextSlide => self.player.send(PlayerCommand::NextSlide),
            CommandKind::PrevSlide => self.player.send(PlayerCommand::PrevSlide),
            CommandKind::GotoSlide { slide_index } => {
                self.player.send(PlayerCommand::Goto(*slide_index))
            }
            CommandKind::AssignPresentation { presentation_id, .. } => {
                // Assignment precedence, settle delay and the viewed
                // notification live in the resolver; routing through it
                // makes poll- and push-delivered assignments identical.
                let _ = self.resolver_tx.send(ResolverSignal::Assignment {
                    presentation_id: *presentation_id,
                });
            }
            CommandKind::Reboot => {
                return self.run_hook("reboot", self.config.reboot_command.as_deref()).await;
            }
            CommandKind::UpdateApp => {
                return self.run_hook("update_app", self.config.update_command.as_deref()).await;
            }
        }
        CommandOutcome::Executed
    }

    async fn run_hook(&self, name: &str, hook: Option<&str>) -> CommandOutcome {
        let Some(hook) = hook else {
            tracing::warn!("No hook configured for {}; ignoring", name);
            return CommandOutcome::Executed;
        };

        tracing::info!("Running {} hook: {}", name, hook);
        match tokio::process::Command::new("sh").arg("-c").arg(hook).status().await {
            Ok(status) if status.success() => CommandOutcome::Executed,
            Ok(status) => {
                tracing::error!("{} hook exited with {}", name, status);
                CommandOutcome::Failed
            }
            Err(e) => {
                tracing::error!("{} hook failed to start: {}", name, e);
                CommandOutcome::Failed
            }
        }
    }

    async fn acknowledge(&self, command_id: CommandId, outcome: CommandOutcome) {
        let ack = CommandAck { command_id, status: outcome, result: None };
        if let Err(e) = self.client.acknowledge(&ack).await {
            // The command stays terminal here; the coordinator will hand
            // it back on the next heartbeat and the dedupe set turns that
            // redelivery into another ack attempt.
            tracing::warn!("Failed to acknowledge {}: {}", command_id, e);
            return;
        }

        // Mirror the outcome onto the push socket for watching admins.
        let _ = self.result_tx.send(Envelope::CommandResult {
            device_id: self.device_id.clone(),
            command_id,
            status: outcome,
            result: None,
        });
    }
}

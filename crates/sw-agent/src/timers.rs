//! Keyed one-shot timer set
//!
//! Every one-shot timer in the agent lives in a [`TimerSet`] under a
//! [`TimerKey`]; ad-hoc unkeyed timers are not used. Scheduling a key that
//! is already armed cancels the predecessor first, so two timers for the
//! same purpose can never be in flight. `cancel_all` is the single
//! teardown call an owner makes when its session ends; a cancelled timer
//! never fires, even if its payload is later reused by a fresh timer.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The fixed set of one-shot timers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Delay between detecting an assignment and opening it
    SettleDelay,
    /// Dwell before the default presentation auto-launches
    DefaultAutoLaunch,
    /// Visibility timeout of the default-presentation prompt
    PromptHide,
    /// Grace before a finished assignment session restarts
    FinishedGrace,
    /// Idle delay before on-screen controls hide
    HideControls,
}

struct TimerEntry {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keyed one-shot timers delivering events into one owner's channel
pub struct TimerSet<E: Send + 'static> {
    tx: mpsc::UnboundedSender<E>,
    timers: HashMap<TimerKey, TimerEntry>,
}

impl<E: Send + 'static> TimerSet<E> {
    /// Create a timer set delivering into `tx`
    pub fn new(tx: mpsc::UnboundedSender<E>) -> Self {
        Self {
            tx,
            timers: HashMap::new(),
        }
    }

    /// Arm `key` to deliver `event` after `delay`, cancelling any timer
    /// already armed under the same key.
    pub fn schedule(&mut self, key: TimerKey, delay: Duration, event: E) {
        self.cancel(key);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(event);
                }
                _ = token.cancelled() => {}
            }
        });

        self.timers.insert(key, TimerEntry { cancel, handle });
    }

    /// Cancel one timer. Returns true when a still-armed timer was stopped.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        match self.timers.remove(&key) {
            Some(entry) => {
                let was_armed = !entry.handle.is_finished();
                entry.cancel.cancel();
                was_armed
            }
            None => false,
        }
    }

    /// Whether a timer is armed and has not yet fired
    pub fn is_armed(&self, key: TimerKey) -> bool {
        self.timers
            .get(&key)
            .map(|entry| !entry.handle.is_finished())
            .unwrap_or(false)
    }

    /// Cancel every timer. The one teardown call session owners make.
    pub fn cancel_all(&mut self) {
        for (_, entry) in self.timers.drain() {
            entry.cancel.cancel();
        }
    }
}

impl<E: Send + 'static> Drop for TimerSet<E> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx);

        timers.schedule(TimerKey::DefaultAutoLaunch, Duration::from_secs(30), 7u32);
        assert!(timers.is_armed(TimerKey::DefaultAutoLaunch));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(rx.recv().await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx);

        timers.schedule(TimerKey::DefaultAutoLaunch, Duration::from_secs(30), 1u32);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(timers.cancel(TimerKey::DefaultAutoLaunch));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx);

        timers.schedule(TimerKey::SettleDelay, Duration::from_secs(5), "old");
        tokio::time::sleep(Duration::from_secs(3)).await;
        timers.schedule(TimerKey::SettleDelay, Duration::from_secs(5), "new");

        // Only the replacement fires, at its own deadline.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(rx.recv().await, Some("new"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_tears_down_every_key() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx);

        timers.schedule(TimerKey::DefaultAutoLaunch, Duration::from_secs(30), 1u32);
        timers.schedule(TimerKey::PromptHide, Duration::from_secs(10), 2u32);
        timers.schedule(TimerKey::HideControls, Duration::from_secs(10), 3u32);
        timers.cancel_all();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err());
        assert!(!timers.is_armed(TimerKey::PromptHide));
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_keys_fire_independently() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new(tx);

        // Hiding the prompt must not cancel the pending auto-launch.
        timers.schedule(TimerKey::DefaultAutoLaunch, Duration::from_secs(30), "launch");
        timers.schedule(TimerKey::PromptHide, Duration::from_secs(10), "hide");

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(rx.recv().await, Some("hide"));
        assert!(timers.is_armed(TimerKey::DefaultAutoLaunch));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(rx.recv().await, Some("launch"));
    }
}

//! Poll scheduler
//!
//! Refreshes the store from the inbox endpoint on a fixed interval. At most
//! one fetch is in flight; triggers that arrive meanwhile are dropped rather
//! than queued.

use crate::client::MessageApi;
use crate::grouper::group;
use crate::guard::PollGate;
use crate::messages::normalize_all;
use crate::notify::{Notification, Notifier};
use crate::store::{ConversationStore, MergeOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
}

/// What a tick or forced sync ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Merged(MergeOutcome),
    /// Timed poll skipped while the user is typing
    Suppressed,
    /// Another fetch was already in flight
    Dropped,
    Failed(String),
}

/// Resets the fetching flag even if the cycle future is dropped mid-request
struct FetchingFlag<'a>(&'a AtomicBool);

impl Drop for FetchingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct PollScheduler {
    api: Arc<dyn MessageApi>,
    store: ConversationStore,
    gate: Arc<dyn PollGate>,
    notifier: Arc<dyn Notifier>,
    identity: String,
    interval: Duration,
    fetching: AtomicBool,
}

impl PollScheduler {
    pub fn new(
        api: Arc<dyn MessageApi>,
        store: ConversationStore,
        gate: Arc<dyn PollGate>,
        notifier: Arc<dyn Notifier>,
        identity: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            store,
            gate,
            notifier,
            identity: identity.into(),
            interval,
            fetching: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> PollState {
        if self.fetching.load(Ordering::SeqCst) {
            PollState::Fetching
        } else {
            PollState::Idle
        }
    }

    /// Timed poll; skipped while the gate is closed
    pub async fn tick(&self) -> CycleOutcome {
        if self.gate.suppresses_polling() {
            debug!("Draft in progress, skipping poll");
            return CycleOutcome::Suppressed;
        }
        self.cycle().await
    }

    /// Poll now regardless of the gate, after a user action completed
    pub async fn force_sync(&self) -> CycleOutcome {
        self.cycle().await
    }

    async fn cycle(&self) -> CycleOutcome {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Fetch already in flight, dropping trigger");
            return CycleOutcome::Dropped;
        }
        let _flag = FetchingFlag(&self.fetching);

        match self.api.fetch_inbox().await {
            Ok(raw) => {
                let records = normalize_all(&raw, &self.identity);
                let outcome = self.store.merge(group(records));
                debug!(
                    messages = raw.len(),
                    conversations = outcome.conversations,
                    unread = outcome.unread,
                    "Poll cycle complete"
                );
                CycleOutcome::Merged(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Failed to poll inbox");
                self.notifier.notify(Notification::error("Could not load inbox"));
                CycleOutcome::Failed(e.to_string())
            }
        }
    }

    /// Sync once immediately, then tick on the fixed interval until
    /// `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "Inbox polling started");
        self.force_sync().await;

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Inbox polling stopped");
    }
}

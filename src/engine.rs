//! Inbox engine
//!
//! Wires the store, typing guard, scheduler and the user actions around a
//! single [`MessageApi`]. This is the surface a presentation layer drives.

use crate::client::{HttpMessageApi, MessageApi};
use crate::composer::{ReplyComposer, ReplySent};
use crate::config::Config;
use crate::deleter::{ConversationDeleter, Deleted};
use crate::error::Result;
use crate::guard::{PollGate, TypingGuard};
use crate::messages::ListingId;
use crate::notify::Notifier;
use crate::read_state::{ReadStateSynchronizer, ReadSync};
use crate::scheduler::{CycleOutcome, PollScheduler};
use crate::store::{ConversationStore, InboxState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

pub struct InboxEngine {
    store: ConversationStore,
    scheduler: Arc<PollScheduler>,
    read_state: ReadStateSynchronizer,
    composer: ReplyComposer,
    deleter: ConversationDeleter,
}

impl InboxEngine {
    pub fn new(
        api: Arc<dyn MessageApi>,
        notifier: Arc<dyn Notifier>,
        identity: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        let guard = TypingGuard::new();
        let store = ConversationStore::with_guard(guard.clone());
        let gate: Arc<dyn PollGate> = Arc::new(guard);

        let scheduler = Arc::new(PollScheduler::new(
            api.clone(),
            store.clone(),
            gate,
            notifier.clone(),
            identity,
            poll_interval,
        ));
        let read_state =
            ReadStateSynchronizer::new(api.clone(), store.clone(), notifier.clone());
        let composer = ReplyComposer::new(
            api.clone(),
            store.clone(),
            scheduler.clone(),
            notifier.clone(),
        );
        let deleter = ConversationDeleter::new(api, store.clone(), scheduler.clone(), notifier);

        Self {
            store,
            scheduler,
            read_state,
            composer,
            deleter,
        }
    }

    /// Engine backed by the REST API described by `config`
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        if config.identity.is_empty() {
            warn!("No identity configured, every message will count as received");
        }
        let api = Arc::new(HttpMessageApi::new(config)?);
        Ok(Self::new(
            api,
            notifier,
            config.identity.clone(),
            config.poll_interval,
        ))
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn state(&self) -> InboxState {
        self.store.snapshot()
    }

    pub fn scheduler(&self) -> &Arc<PollScheduler> {
        &self.scheduler
    }

    pub fn is_typing(&self) -> bool {
        self.store.guard().is_engaged()
    }

    pub async fn select_thread(&self, listing_id: ListingId) -> Result<ReadSync> {
        self.read_state.select(listing_id).await
    }

    pub fn type_draft(&self, text: impl Into<String>) {
        self.composer.update_draft(text);
    }

    pub async fn send_reply(&self) -> Result<ReplySent> {
        self.composer.send().await
    }

    pub async fn delete_conversation(&self, listing_id: ListingId) -> Result<Deleted> {
        self.deleter.delete(listing_id).await
    }

    pub async fn tick(&self) -> CycleOutcome {
        self.scheduler.tick().await
    }

    pub async fn sync_now(&self) -> CycleOutcome {
        self.scheduler.force_sync().await
    }

    /// Run the poll loop in the background until `shutdown` turns true
    pub fn spawn_polling(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let scheduler = self.scheduler.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    }
}

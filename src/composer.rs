//! Reply composer
//!
//! A reply is attached to the most recent message of the selected thread.
//! Draft edits go through the store, which keeps the typing guard in step.

use crate::client::MessageApi;
use crate::error::{Error, Result};
use crate::messages::MessageId;
use crate::notify::{Notification, Notifier};
use crate::scheduler::{CycleOutcome, PollScheduler};
use crate::store::ConversationStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySent {
    pub anchor: MessageId,
    /// Result of the sync forced after sending
    pub sync: CycleOutcome,
}

pub struct ReplyComposer {
    api: Arc<dyn MessageApi>,
    store: ConversationStore,
    scheduler: Arc<PollScheduler>,
    notifier: Arc<dyn Notifier>,
}

impl ReplyComposer {
    pub fn new(
        api: Arc<dyn MessageApi>,
        store: ConversationStore,
        scheduler: Arc<PollScheduler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            store,
            scheduler,
            notifier,
        }
    }

    /// Record a keystroke in the reply box
    pub fn update_draft(&self, text: impl Into<String>) {
        self.store.set_draft(text);
    }

    pub async fn send(&self) -> Result<ReplySent> {
        let (anchor, draft) = self.validate().map_err(|e| {
            debug!(reason = %e, "Reply rejected");
            e
        })?;

        if let Err(e) = self.api.reply(anchor, &draft).await {
            warn!(anchor = %anchor, error = %e, "Failed to send reply");
            self.notifier.notify(Notification::error("Failed to send reply"));
            return Err(e);
        }
        info!(anchor = %anchor, "Reply sent");

        self.store.clear_draft();
        let sync = self.scheduler.force_sync().await;

        Ok(ReplySent { anchor, sync })
    }

    fn validate(&self) -> Result<(MessageId, String)> {
        let listing_id = self.store.selected().ok_or(Error::NoSelection)?;

        let draft = self.store.draft();
        if draft.trim().is_empty() {
            return Err(Error::EmptyDraft);
        }

        let anchor = self
            .store
            .conversation(listing_id)
            .and_then(|c| c.latest().map(|m| m.id))
            .ok_or(Error::ConversationNotFound(listing_id))?;

        Ok((anchor, draft))
    }
}

//! Conversation deletion with optimistic removal

use crate::client::MessageApi;
use crate::error::{Error, Result};
use crate::messages::ListingId;
use crate::notify::{Notification, Notifier};
use crate::scheduler::{CycleOutcome, PollScheduler};
use crate::store::ConversationStore;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deleted {
    pub listing_id: ListingId,
    pub sync: CycleOutcome,
}

pub struct ConversationDeleter {
    api: Arc<dyn MessageApi>,
    store: ConversationStore,
    scheduler: Arc<PollScheduler>,
    notifier: Arc<dyn Notifier>,
}

impl ConversationDeleter {
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

    /// Remove the thread locally, then on the server. Puts it back if the
    /// server refuses.
    pub async fn delete(&self, listing_id: ListingId) -> Result<Deleted> {
        let removed = self
            .store
            .remove(listing_id)
            .ok_or(Error::ConversationNotFound(listing_id))?;

        match self.api.delete_conversation(listing_id).await {
            Ok(()) => {
                info!(listing_id = %listing_id, "Conversation deleted");
                self.notifier.notify(Notification::success("Conversation deleted"));
                let sync = self.scheduler.force_sync().await;
                Ok(Deleted { listing_id, sync })
            }
            Err(e) => {
                let restored = self.store.restore(removed.conversation);
                warn!(listing_id = %listing_id, restored, error = %e, "Failed to delete conversation");
                self.notifier.notify(Notification::error("Failed to delete"));
                self.scheduler.force_sync().await;
                Err(e)
            }
        }
    }
}

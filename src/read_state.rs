//! Read-state synchronization
//!
//! Selecting a thread marks its unread messages read locally right away and
//! then tells the server. A failed request is reported but not rolled back;
//! the next poll carries the server's view.

use crate::client::MessageApi;
use crate::error::Result;
use crate::messages::{ListingId, MessageId};
use crate::notify::{Notification, Notifier};
use crate::store::ConversationStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of selecting a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSync {
    pub listing_id: ListingId,
    /// Messages flipped to read by this selection
    pub marked: Vec<MessageId>,
    /// Server accepted the mark-read request (trivially true when nothing was unread)
    pub confirmed: bool,
}

pub struct ReadStateSynchronizer {
    api: Arc<dyn MessageApi>,
    store: ConversationStore,
    notifier: Arc<dyn Notifier>,
}

impl ReadStateSynchronizer {
    pub fn new(
        api: Arc<dyn MessageApi>,
        store: ConversationStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            store,
            notifier,
        }
    }

    pub async fn select(&self, listing_id: ListingId) -> Result<ReadSync> {
        let selection = self.store.select(listing_id)?;

        let ids = selection.unread_ids;
        if ids.is_empty() {
            return Ok(ReadSync {
                listing_id,
                marked: ids,
                confirmed: true,
            });
        }

        // Badge drops before the request leaves
        self.store.mark_read_local(listing_id, &ids);
        debug!(listing_id = %listing_id, count = ids.len(), "Marking messages read");

        let confirmed = match self.api.mark_read(&ids).await {
            Ok(()) => true,
            Err(e) => {
                warn!(listing_id = %listing_id, error = %e, "Failed to mark messages read");
                self.notifier.notify(Notification::error("Failed to mark as read"));
                false
            }
        };

        Ok(ReadSync {
            listing_id,
            marked: ids,
            confirmed,
        })
    }
}

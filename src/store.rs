//! Conversation store
//!
//! The single mutation point for inbox state. Every operation takes the lock
//! once, mutates, and releases it before returning, so readers never observe
//! a half-applied update.
//!
//! The store owns the [`TypingGuard`] and flips it under the same lock as the
//! draft, so the guard is engaged exactly while the draft holds text.

use crate::error::{Error, Result};
use crate::grouper::{Conversation, ConversationMap};
use crate::guard::TypingGuard;
use crate::messages::{ListingId, MessageId};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

/// Characters of the latest message shown in a thread preview
pub const PREVIEW_CHARS: usize = 30;

/// Inbox state as seen by the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboxState {
    pub conversations: ConversationMap,
    pub selected: Option<ListingId>,
    pub draft: String,
}

/// Thread list ordering by last activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// One row of the thread list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSummary {
    pub listing_id: ListingId,
    pub title: String,
    pub unread: usize,
    pub preview: String,
    pub preview_is_own: bool,
    pub avatar_initial: Option<char>,
    pub last_activity: DateTime<Utc>,
}

impl InboxState {
    pub fn unread_count(&self, listing_id: ListingId) -> Option<usize> {
        self.conversations
            .get(&listing_id)
            .map(Conversation::unread_count)
    }

    pub fn total_unread(&self) -> usize {
        self.conversations.values().map(Conversation::unread_count).sum()
    }

    pub fn threads(&self, order: SortOrder) -> Vec<ThreadSummary> {
        let mut threads: Vec<ThreadSummary> = self
            .conversations
            .values()
            .filter_map(summarize)
            .collect();

        threads.sort_by(|a, b| {
            let by_time = a.last_activity.cmp(&b.last_activity);
            let by_time = match order {
                SortOrder::Newest => by_time.reverse(),
                SortOrder::Oldest => by_time,
            };
            by_time.then(a.listing_id.cmp(&b.listing_id))
        });
        threads
    }
}

fn summarize(conversation: &Conversation) -> Option<ThreadSummary> {
    let latest = conversation.latest()?;
    Some(ThreadSummary {
        listing_id: conversation.listing_id,
        title: conversation.title.clone(),
        unread: conversation.unread_count(),
        preview: preview(&latest.body),
        preview_is_own: latest.is_own,
        avatar_initial: latest
            .sender_identity
            .chars()
            .next()
            .and_then(|c| c.to_uppercase().next()),
        last_activity: latest.created_at,
    })
}

fn preview(body: &str) -> String {
    if body.chars().count() > PREVIEW_CHARS {
        let mut short: String = body.chars().take(PREVIEW_CHARS).collect();
        short.push('…');
        short
    } else {
        body.to_string()
    }
}

/// What a merge changed besides the conversation set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub conversations: usize,
    pub unread: usize,
    pub selection_cleared: bool,
    pub draft_discarded: bool,
}

/// Result of selecting a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub listing_id: ListingId,
    /// Unread messages from others at the time of selection
    pub unread_ids: Vec<MessageId>,
    pub draft_discarded: bool,
}

/// A conversation taken out of the store, kept for restoration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    pub conversation: Conversation,
    pub was_selected: bool,
    pub draft_discarded: bool,
}

/// Shared handle to the inbox state
#[derive(Debug, Clone)]
pub struct ConversationStore {
    state: Arc<Mutex<InboxState>>,
    revision: Arc<watch::Sender<u64>>,
    guard: TypingGuard,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::with_guard(TypingGuard::new())
    }

    /// Store that keeps `guard` in step with its draft
    pub fn with_guard(guard: TypingGuard) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(InboxState::default())),
            revision: Arc::new(revision),
            guard,
        }
    }

    pub fn guard(&self) -> &TypingGuard {
        &self.guard
    }

    fn lock(&self) -> MutexGuard<'_, InboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    /// Receiver that changes after every mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn snapshot(&self) -> InboxState {
        self.lock().clone()
    }

    /// Replace all conversations with freshly fetched ones.
    ///
    /// A selection that no longer exists is cleared together with its draft.
    pub fn merge(&self, groups: ConversationMap) -> MergeOutcome {
        let outcome = {
            let mut state = self.lock();
            state.conversations = groups;

            let mut outcome = MergeOutcome {
                conversations: state.conversations.len(),
                unread: state.total_unread(),
                ..MergeOutcome::default()
            };

            if let Some(selected) = state.selected {
                if !state.conversations.contains_key(&selected) {
                    state.selected = None;
                    outcome.selection_cleared = true;
                    outcome.draft_discarded = !state.draft.is_empty();
                    state.draft.clear();
                    self.guard.release();
                }
            }
            outcome
        };

        self.bump();
        debug!(
            conversations = outcome.conversations,
            unread = outcome.unread,
            selection_cleared = outcome.selection_cleared,
            "Merged inbox"
        );
        outcome
    }

    /// Make `listing_id` the selected thread. Switching threads discards the
    /// draft typed for the previous one.
    pub fn select(&self, listing_id: ListingId) -> Result<Selection> {
        let selection = {
            let mut state = self.lock();
            let unread_ids = state
                .conversations
                .get(&listing_id)
                .map(Conversation::unread_ids)
                .ok_or(Error::ConversationNotFound(listing_id))?;

            let switching = state.selected != Some(listing_id);
            let draft_discarded = switching && !state.draft.is_empty();
            if switching {
                state.draft.clear();
                self.guard.release();
            }
            state.selected = Some(listing_id);

            Selection {
                listing_id,
                unread_ids,
                draft_discarded,
            }
        };

        self.bump();
        Ok(selection)
    }

    /// Flip `read` on the given messages without waiting for the server.
    /// Returns how many flags changed.
    pub fn mark_read_local(&self, listing_id: ListingId, ids: &[MessageId]) -> usize {
        let mut flipped = 0;
        if let Some(conversation) = self.lock().conversations.get_mut(&listing_id) {
            for message in conversation.messages.iter_mut() {
                if !message.read && ids.contains(&message.id) {
                    message.read = true;
                    flipped += 1;
                }
            }
        }

        if flipped > 0 {
            self.bump();
        }
        flipped
    }

    pub fn selected(&self) -> Option<ListingId> {
        self.lock().selected
    }

    pub fn conversation(&self, listing_id: ListingId) -> Option<Conversation> {
        self.lock().conversations.get(&listing_id).cloned()
    }

    pub fn draft(&self) -> String {
        self.lock().draft.clone()
    }

    /// Replace the draft. Non-empty text engages the typing guard, empty
    /// text releases it.
    pub fn set_draft(&self, text: impl Into<String>) {
        {
            let mut state = self.lock();
            state.draft = text.into();
            self.guard.track(&state.draft);
        }
        self.bump();
    }

    /// Empty the reply box and release the typing guard
    pub fn clear_draft(&self) {
        {
            let mut state = self.lock();
            state.draft.clear();
            self.guard.release();
        }
        self.bump();
    }

    /// Take a conversation out of the store. Clears the selection (and its
    /// draft) if it pointed at the removed thread.
    pub fn remove(&self, listing_id: ListingId) -> Option<Removed> {
        let removed = {
            let mut state = self.lock();
            let conversation = state.conversations.remove(&listing_id)?;

            let was_selected = state.selected == Some(listing_id);
            let mut draft_discarded = false;
            if was_selected {
                state.selected = None;
                draft_discarded = !state.draft.is_empty();
                state.draft.clear();
                self.guard.release();
            }

            Removed {
                conversation,
                was_selected,
                draft_discarded,
            }
        };

        self.bump();
        Some(removed)
    }

    /// Put a removed conversation back under its listing. A conversation a
    /// newer poll already brought back is left alone. Returns whether the
    /// conversation was inserted.
    pub fn restore(&self, conversation: Conversation) -> bool {
        let inserted = {
            let mut state = self.lock();
            let listing_id = conversation.listing_id;
            if state.conversations.contains_key(&listing_id) {
                false
            } else {
                state.conversations.insert(listing_id, conversation);
                true
            }
        };

        if inserted {
            self.bump();
        }
        inserted
    }

    pub fn unread_count(&self, listing_id: ListingId) -> Option<usize> {
        self.lock().unread_count(listing_id)
    }

    pub fn total_unread(&self) -> usize {
        self.lock().total_unread()
    }

    pub fn threads(&self, order: SortOrder) -> Vec<ThreadSummary> {
        self.lock().threads(order)
    }
}

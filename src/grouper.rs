//! Conversation grouping
//!
//! Partitions a flat list of records into one conversation per listing.

use crate::messages::{ListingId, MessageId, MessageRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// All messages exchanged about one listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub listing_id: ListingId,
    pub title: String,
    /// In fetch order; use [`Conversation::sorted_messages`] for display
    pub messages: Vec<MessageRecord>,
}

/// Conversations keyed by listing
pub type ConversationMap = BTreeMap<ListingId, Conversation>;

impl Conversation {
    pub fn unread_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_unread()).count()
    }

    pub fn unread_ids(&self) -> Vec<MessageId> {
        self.messages
            .iter()
            .filter(|m| m.is_unread())
            .map(|m| m.id)
            .collect()
    }

    /// Chronologically last message; on equal timestamps the later one in
    /// fetch order wins
    pub fn latest(&self) -> Option<&MessageRecord> {
        self.messages.iter().max_by_key(|m| m.created_at)
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.latest().map(|m| m.created_at)
    }

    /// Messages oldest first
    pub fn sorted_messages(&self) -> Vec<&MessageRecord> {
        let mut sorted: Vec<&MessageRecord> = self.messages.iter().collect();
        sorted.sort_by_key(|m| m.created_at);
        sorted
    }
}

/// Group records by listing. Every record lands in exactly one conversation.
///
/// When records of one listing disagree on the title, the last one seen wins.
pub fn group<I>(records: I) -> ConversationMap
where
    I: IntoIterator<Item = MessageRecord>,
{
    let mut grouped = ConversationMap::new();

    for record in records {
        let conversation = grouped
            .entry(record.listing_id)
            .or_insert_with(|| Conversation {
                listing_id: record.listing_id,
                title: String::new(),
                messages: Vec::new(),
            });
        conversation.title = record.listing_title.clone();
        conversation.messages.push(record);
    }

    grouped
}

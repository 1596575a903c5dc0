//! Marketplace messages
//!
//! Wire representation of inbox messages and the normalized records the
//! rest of the engine works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

/// Identifier of the listing a conversation is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ListingId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ListingId)
    }
}

/// A message as returned by `GET /messages/inbox/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: MessageId,
    pub listing: ListingId,
    #[serde(default)]
    pub listing_title: String,
    pub sender: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// A normalized inbox message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: MessageId,
    pub listing_id: ListingId,
    pub listing_title: String,
    pub sender_identity: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Only field that changes after normalization (optimistic or polled)
    pub read: bool,
    /// Sent by the current user; derived, never transmitted
    pub is_own: bool,
}

impl MessageRecord {
    /// Counts toward the unread badge
    pub fn is_unread(&self) -> bool {
        !self.is_own && !self.read
    }
}

/// Convert a wire message into a record tagged with ownership
pub fn normalize(raw: &RawMessage, identity: &str) -> MessageRecord {
    MessageRecord {
        id: raw.id,
        listing_id: raw.listing,
        listing_title: raw.listing_title.clone(),
        sender_identity: raw.sender.clone(),
        body: raw.content.clone(),
        created_at: raw.created_at,
        read: raw.read,
        is_own: raw.sender == identity,
    }
}

pub fn normalize_all(raw: &[RawMessage], identity: &str) -> Vec<MessageRecord> {
    raw.iter().map(|m| normalize(m, identity)).collect()
}

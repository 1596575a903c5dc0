//! In-memory marketplace backend shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use inbox_sync::client::MessageApi;
use inbox_sync::messages::{ListingId, MessageId, RawMessage};
use inbox_sync::notify::{Notification, Notifier};
use inbox_sync::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

pub const ME: &str = "me@x.com";
pub const ALICE: &str = "alice@x.com";
pub const BOB: &str = "bob@x.com";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch,
    Reply { anchor: MessageId, content: String },
    MarkRead(Vec<MessageId>),
    Delete(ListingId),
}

/// Pauses a request until the test releases it
#[derive(Default)]
pub struct Hold {
    held: AtomicBool,
    pub started: Notify,
    release: Notify,
}

impl Hold {
    pub fn engage(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.held.load(Ordering::SeqCst) {
            self.started.notify_one();
            self.release.notified().await;
        }
    }
}

#[derive(Default)]
pub struct MockApi {
    server: Mutex<Vec<RawMessage>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    pub fail_fetch: AtomicBool,
    pub fail_reply: AtomicBool,
    pub fail_mark_read: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fetch_hold: Hold,
    pub reply_hold: Hold,
    pub mark_read_hold: Hold,
}

impl MockApi {
    pub fn with_messages(messages: Vec<RawMessage>) -> Self {
        let next = messages.iter().map(|m| m.id.0).max().unwrap_or(0) + 1;
        let api = Self::default();
        *api.server.lock().unwrap() = messages;
        api.next_id.store(next, Ordering::SeqCst);
        api
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Fetch).count()
    }

    pub fn push_message(&self, message: RawMessage) {
        self.server.lock().unwrap().push(message);
    }

    /// Drop a thread on the server side, as another device would
    pub fn remove_listing(&self, listing_id: ListingId) {
        self.server
            .lock()
            .unwrap()
            .retain(|m| m.listing != listing_id);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn server_error(status: u16) -> Error {
    Error::Server {
        status,
        message: "simulated failure".to_string(),
    }
}

#[async_trait]
impl MessageApi for MockApi {
    async fn fetch_inbox(&self) -> Result<Vec<RawMessage>> {
        self.record(Call::Fetch);
        self.fetch_hold.pass().await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(server_error(503));
        }
        Ok(self.server.lock().unwrap().clone())
    }

    async fn reply(&self, anchor: MessageId, content: &str) -> Result<()> {
        self.record(Call::Reply {
            anchor,
            content: content.to_string(),
        });
        self.reply_hold.pass().await;
        if self.fail_reply.load(Ordering::SeqCst) {
            return Err(server_error(500));
        }

        let mut server = self.server.lock().unwrap();
        let parent = server
            .iter()
            .find(|m| m.id == anchor)
            .cloned()
            .ok_or_else(|| server_error(404))?;
        server.push(RawMessage {
            id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            listing: parent.listing,
            listing_title: parent.listing_title,
            sender: ME.to_string(),
            content: content.to_string(),
            created_at: parent.created_at + chrono::Duration::minutes(1),
            read: false,
        });
        Ok(())
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<()> {
        self.record(Call::MarkRead(ids.to_vec()));
        self.mark_read_hold.pass().await;
        if self.fail_mark_read.load(Ordering::SeqCst) {
            return Err(server_error(500));
        }

        for message in self.server.lock().unwrap().iter_mut() {
            if ids.contains(&message.id) {
                message.read = true;
            }
        }
        Ok(())
    }

    async fn delete_conversation(&self, listing_id: ListingId) -> Result<()> {
        self.record(Call::Delete(listing_id));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(server_error(500));
        }
        self.remove_listing(listing_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct Recorder(Mutex<Vec<Notification>>);

impl Recorder {
    pub fn notices(&self) -> Vec<Notification> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for Recorder {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
}

pub fn message(
    id: i64,
    listing: i64,
    title: &str,
    sender: &str,
    created_at: DateTime<Utc>,
    read: bool,
) -> RawMessage {
    RawMessage {
        id: MessageId(id),
        listing: ListingId(listing),
        listing_title: title.to_string(),
        sender: sender.to_string(),
        content: format!("message {} about {}", id, title),
        created_at,
        read,
    }
}

/// Listing 10 "Bike" with one unread message from alice, listing 20 "Desk"
/// with nothing unread
pub fn bike_and_desk() -> Vec<RawMessage> {
    vec![
        message(1, 10, "Bike", ALICE, at(12, 0), false),
        message(2, 20, "Desk", BOB, at(11, 0), true),
        message(3, 20, "Desk", ME, at(11, 30), false),
    ]
}

//! Inbox sync - marketplace conversation engine
//!
//! Polls the marketplace inbox, groups messages into per-listing threads and
//! keeps read state, replies and deletions consistent with the server without
//! losing the selected thread or an unsent reply.

pub mod messages;
pub mod grouper;
pub mod store;
pub mod guard;
pub mod scheduler;
pub mod read_state;
pub mod composer;
pub mod deleter;
pub mod client;
pub mod notify;
pub mod engine;
pub mod config;
pub mod error;

pub use engine::InboxEngine;
pub use error::{Error, Result};

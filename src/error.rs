//! Error types for inbox-sync

use crate::messages::ListingId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reply text is empty")]
    EmptyDraft,

    #[error("No conversation selected")]
    NoSelection,

    #[error("Conversation not found: {0}")]
    ConversationNotFound(ListingId),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Request failed on the network or the server side. Reported to the
    /// user, never fatal to the engine.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Server { .. } | Error::Json(_)
        )
    }

    /// Rejected locally before any request was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EmptyDraft | Error::NoSelection | Error::ConversationNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

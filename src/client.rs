//! Marketplace messaging API
//!
//! The engine talks to the backend only through [`MessageApi`], which keeps
//! the scheduler and action components testable without a server.
//! [`HttpMessageApi`] is the REST implementation.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::messages::{ListingId, MessageId, RawMessage};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait MessageApi: Send + Sync {
    /// Every message visible to the caller, in no particular order
    async fn fetch_inbox(&self) -> Result<Vec<RawMessage>>;

    /// Post `content` as a reply to the thread containing `anchor`
    async fn reply(&self, anchor: MessageId, content: &str) -> Result<()>;

    async fn mark_read(&self, ids: &[MessageId]) -> Result<()>;

    /// Delete every message of the listing's conversation
    async fn delete_conversation(&self, listing_id: ListingId) -> Result<()>;
}

/// Supplies the bearer token, called before every request
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Option<String>>;
}

/// Anonymous requests
pub struct NoAuth;

#[async_trait]
impl TokenSource for NoAuth {
    async fn token(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Token obtained out of band by the session service
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}

#[derive(Serialize)]
struct ReplyBody<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct MarkReadBody<'a> {
    ids: &'a [MessageId],
}

/// REST client for the messaging endpoints
pub struct HttpMessageApi {
    http: reqwest::Client,
    base_url: String,
    token_source: Arc<dyn TokenSource>,
}

impl HttpMessageApi {
    pub fn new(config: &Config) -> Result<Self> {
        let token_source: Arc<dyn TokenSource> = match &config.token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(NoAuth),
        };
        Self::with_token_source(config, token_source)
    }

    pub fn with_token_source(config: &Config, token_source: Arc<dyn TokenSource>) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token_source,
        })
    }

    pub fn inbox_url(&self) -> String {
        format!("{}/messages/inbox/", self.base_url)
    }

    pub fn reply_url(&self, anchor: MessageId) -> String {
        format!("{}/messages/{}/reply/", self.base_url, anchor)
    }

    pub fn mark_read_url(&self) -> String {
        format!("{}/messages/mark-read/", self.base_url)
    }

    pub fn conversation_url(&self, listing_id: ListingId) -> String {
        format!("{}/messages/conversation/{}/", self.base_url, listing_id)
    }

    async fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        match self.token_source.token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let req = self.authed(builder).await?;
        Ok(req.send().await?)
    }
}

/// 4xx and 5xx are failures; anything else, including an empty 204, is not
pub fn is_error_status(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

async fn server_error(resp: Response) -> Error {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Error::Server { status, message }
}

/// Require a 2xx response
async fn ensure_success(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(server_error(resp).await)
    }
}

/// Require a response that is not an explicit error. The body is ignored.
async fn ensure_not_error(resp: Response) -> Result<()> {
    if is_error_status(resp.status()) {
        Err(server_error(resp).await)
    } else {
        Ok(())
    }
}

fn decode_inbox(body: &[u8]) -> Result<Vec<RawMessage>> {
    Ok(serde_json::from_slice(body)?)
}

#[async_trait]
impl MessageApi for HttpMessageApi {
    async fn fetch_inbox(&self) -> Result<Vec<RawMessage>> {
        let resp = self.send(self.http.get(self.inbox_url())).await?;
        let resp = ensure_success(resp).await?;
        let body = resp.bytes().await?;
        let messages = decode_inbox(&body)?;
        debug!(count = messages.len(), "Fetched inbox");
        Ok(messages)
    }

    async fn reply(&self, anchor: MessageId, content: &str) -> Result<()> {
        let req = self.http.post(self.reply_url(anchor)).json(&ReplyBody { content });
        let resp = self.send(req).await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn mark_read(&self, ids: &[MessageId]) -> Result<()> {
        let req = self.http.post(self.mark_read_url()).json(&MarkReadBody { ids });
        let resp = self.send(req).await?;
        ensure_not_error(resp).await
    }

    async fn delete_conversation(&self, listing_id: ListingId) -> Result<()> {
        let resp = self
            .send(self.http.delete(self.conversation_url(listing_id)))
            .await?;
        ensure_not_error(resp).await
    }
}

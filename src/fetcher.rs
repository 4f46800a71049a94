use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Assistant text shown whenever a reply could not be fetched.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong.";

/// Result of a single reply fetch. All failure kinds collapse into `Fallback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Replies(Vec<String>),
    Fallback,
}

impl FetchOutcome {
    /// Assistant texts to append to the log
    pub fn into_replies(self) -> Vec<String> {
        match self {
            FetchOutcome::Replies(replies) => replies,
            FetchOutcome::Fallback => vec![FALLBACK_REPLY.to_string()],
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FetchOutcome::Fallback)
    }
}

/// Boundary that turns one user utterance into one or more replies.
#[async_trait]
pub trait ReplyFetcher: Send + Sync {
    async fn fetch(&self, text: &str, identity: &str) -> FetchOutcome;
}

/// Request body sent to the reply endpoint
#[derive(Debug, Serialize)]
struct ReplyRequest<'a> {
    message: &'a str,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplyBody {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct ReplyResponse {
    reply: ReplyBody,
}

impl From<ReplyBody> for Vec<String> {
    fn from(body: ReplyBody) -> Self {
        match body {
            ReplyBody::One(reply) => vec![reply],
            ReplyBody::Many(replies) => replies,
        }
    }
}

/// Reply fetcher that POSTs JSON to a fixed endpoint
#[derive(Clone)]
pub struct HttpReplyFetcher {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpReplyFetcher {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("wisp/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    async fn request_replies(&self, text: &str, identity: &str) -> Result<Vec<String>> {
        let payload = ReplyRequest {
            message: text,
            user_id: (!identity.is_empty()).then_some(identity),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Reply endpoint returned {}: {}", status, error_text));
        }

        let body = response
            .json::<ReplyResponse>()
            .await
            .context("Failed to parse reply body")?;

        Ok(body.reply.into())
    }
}

#[async_trait]
impl ReplyFetcher for HttpReplyFetcher {
    #[instrument(skip_all)]
    async fn fetch(&self, text: &str, identity: &str) -> FetchOutcome {
        match self.request_replies(text, identity).await {
            Ok(replies) => {
                debug!(count = replies.len(), "Received replies");
                FetchOutcome::Replies(replies)
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, "Reply fetch failed: {:#}", e);
                FetchOutcome::Fallback
            }
        }
    }
}

use std::sync::Arc;
use tracing::{debug, info};

use crate::conversation::Conversation;
use crate::events::Sender;
use crate::fetcher::{FetchOutcome, ReplyFetcher};
use crate::identity::IdentityResolver;

/// A user message accepted for sending, waiting for its replies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub text: String,
    pub identity: String,
}

/// Result of trying to start a send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStart {
    /// Input was blank; nothing was appended
    Empty,
    /// A request is already in flight
    Busy,
    Started(PendingRequest),
}

/// Drives one user message through the reply fetcher and back into the log.
pub struct ChatSession {
    conversation: Conversation,
    identity: IdentityResolver,
    fetcher: Arc<dyn ReplyFetcher>,
}

impl ChatSession {
    pub fn new(identity: IdentityResolver, fetcher: Arc<dyn ReplyFetcher>) -> Self {
        Self {
            conversation: Conversation::new(),
            identity,
            fetcher,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    pub fn identity_mut(&mut self) -> &mut IdentityResolver {
        &mut self.identity
    }

    pub fn fetcher(&self) -> Arc<dyn ReplyFetcher> {
        Arc::clone(&self.fetcher)
    }

    /// Take the input buffer, append it as a user message and mark the session loading.
    ///
    /// Only one request may be in flight; a second call before `finish_send` returns
    /// `Busy` and leaves the input untouched.
    pub fn begin_send(&mut self) -> SendStart {
        if self.conversation.is_loading() {
            debug!("Send refused, request already in flight");
            return SendStart::Busy;
        }
        let Some(text) = self.conversation.take_input() else {
            return SendStart::Empty;
        };

        self.conversation.append_message(Sender::User, text.clone());
        self.conversation.set_loading(true);

        SendStart::Started(PendingRequest {
            text,
            identity: self.identity.token().to_string(),
        })
    }

    /// Append the replies for the in-flight request and clear the loading flag
    pub fn finish_send(&mut self, outcome: FetchOutcome) {
        let replies = outcome.into_replies();
        info!(count = replies.len(), "Appending replies");
        for reply in replies {
            self.conversation.append_message(Sender::Assistant, reply);
        }
        self.conversation.set_loading(false);
    }

    /// Run the whole cycle for `text` inline
    pub async fn send(&mut self, text: &str) -> SendStart {
        if self.conversation.is_loading() {
            return SendStart::Busy;
        }
        self.conversation.set_input(text);
        let start = self.begin_send();
        if let SendStart::Started(request) = &start {
            let outcome = self.fetcher.fetch(&request.text, &request.identity).await;
            self.finish_send(outcome);
        }
        start
    }

    /// Replace the log with the seeded greeting
    pub fn clear(&mut self) {
        self.conversation.reset();
    }
}

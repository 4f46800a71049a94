//! Conversation state: the ordered message log, the input buffer and the loading flag.

use chrono::{DateTime, Utc};

use crate::events::Sender;

/// Assistant-authored greeting seeded at startup and after every clear.
pub const GREETING: &str = "Hi! I'm your assistant. Ask me anything.\n\n\
You can also use:\n  /save password - save this conversation\n  /load CID password - restore a saved conversation";

/// A single message in the log. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    sender: Sender,
    text: String,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Owned, single-writer chat state passed to the rendering and event handling code.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    input: String,
    loading: bool,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Create a conversation holding only the seeded greeting
    pub fn new() -> Self {
        Self {
            messages: vec![Message::new(Sender::Assistant, GREETING)],
            input: String::new(),
            loading: false,
        }
    }

    /// Push a message to the end of the log.
    ///
    /// Blank user text is ignored and `false` is returned.
    pub fn append_message(&mut self, sender: Sender, text: impl Into<String>) -> bool {
        let text = text.into();
        if sender == Sender::User && text.trim().is_empty() {
            return false;
        }
        self.messages.push(Message::new(sender, text));
        true
    }

    /// Replace the log with the seeded greeting
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message::new(Sender::Assistant, GREETING));
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Take the trimmed input, clearing the buffer. `None` when the input is blank.
    pub fn take_input(&mut self) -> Option<String> {
        let input = std::mem::take(&mut self.input);
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::fetcher::FetchOutcome;
use crate::wallet::WalletError;

/// Internal application events delivered to the UI loop from background tasks
#[derive(Debug)]
pub enum AppEvent {
    /// The reply fetch for the in-flight message finished
    ReplyReceived(FetchOutcome),

    /// Wallet authorization finished
    WalletConnected(Result<Vec<String>, WalletError>),
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Assistant",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Sender::User => "👤",
            Sender::Assistant => "🤖",
        }
    }
}

//! wisp: a terminal chat client that forwards messages to a remote reply endpoint,
//! with an optional wallet address standing in for the random session id.

pub mod chat;
pub mod config;
pub mod conversation;
pub mod events;
pub mod fetcher;
pub mod identity;
pub mod ui;
pub mod wallet;

pub use chat::{ChatSession, PendingRequest, SendStart};
pub use config::Config;
pub use conversation::{Conversation, Message, GREETING};
pub use events::Sender;
pub use fetcher::{FetchOutcome, HttpReplyFetcher, ReplyFetcher, FALLBACK_REPLY};
pub use identity::{Identity, IdentityResolver, IdentityStore};
pub use wallet::{JsonRpcWallet, WalletError, WalletProvider};

//! Conversation UI components for the chat screen

pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;
pub mod thinking;

pub use commands::{get_help_text, parse_slash_command, SlashCommand};
pub use composer::{Composer, ComposerResult, ComposerView};
pub use history::HistoryView;
pub use manager::{ConversationAction, ConversationManager};
pub use thinking::ThinkingIndicator;

use std::str::FromStr;

use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
///
/// Anything else starting with `/` (for example `/save`, or `/exit plans` with
/// trailing words) is sent as ordinary text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Reset the conversation to the greeting
    Clear,
    /// Connect a wallet and use its address as identity
    Connect,
    /// Disconnect the wallet and start a fresh session id
    Disconnect,
    /// Show the active identity
    Whoami,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Clear => "clear the conversation",
            SlashCommand::Connect => "connect a wallet and chat as its address",
            SlashCommand::Disconnect => "disconnect the wallet and start a new session",
            SlashCommand::Whoami => "show the active identity",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }

    /// Whether this command can be run while a reply is pending.
    pub fn available_while_loading(self) -> bool {
        !matches!(self, SlashCommand::Clear)
    }
}

/// Parse a slash command from user input. Commands take no arguments, so
/// input with trailing words is not a command.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let rest = input.trim().strip_prefix('/')?;
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        return None;
    }

    let head = rest.to_lowercase();
    SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "q" | "exit" | "bye" => Some(SlashCommand::Quit),
        "reset" => Some(SlashCommand::Clear),
        "id" | "identity" => Some(SlashCommand::Whoami),
        _ => None,
    })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for entry in command_entries() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }
    help.push_str("\nAliases: /q, /exit for /quit, /reset for /clear, /id for /whoami");
    help
}

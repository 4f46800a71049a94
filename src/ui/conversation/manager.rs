use crate::chat::{ChatSession, SendStart};
use crate::events::AppEvent;
use crate::identity::Identity;
use crate::ui::conversation::{
    get_help_text, Composer, ComposerResult, ComposerView, HistoryView, SlashCommand,
    ThinkingIndicator,
};
use crate::wallet::{abbreviate, WalletProvider};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Manages the conversation flow and UI components
pub struct ConversationManager {
    session: ChatSession,
    composer: Composer,
    thinking: ThinkingIndicator,
    wallet: Arc<dyn WalletProvider>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    alert: Option<String>,
    /// Local information popup; never part of the message log
    notice: Option<String>,
    connecting: bool,
    scroll: usize,
    endpoint_host: String,
    show_identity: bool,
}

impl ConversationManager {
    pub fn new(
        session: ChatSession,
        wallet: Arc<dyn WalletProvider>,
        events_tx: mpsc::UnboundedSender<AppEvent>,
        endpoint_host: impl Into<String>,
    ) -> Self {
        Self {
            session,
            composer: Composer::new("Ask me anything..."),
            thinking: ThinkingIndicator::new(),
            wallet,
            events_tx,
            alert: None,
            notice: None,
            connecting: false,
            scroll: 0,
            endpoint_host: endpoint_host.into(),
            show_identity: true,
        }
    }

    pub fn with_identity_shown(mut self, show: bool) -> Self {
        self.show_identity = show;
        self
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        // Popups block all other input until dismissed
        if self.dismiss_popup() {
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_add(5);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_sub(5);
                return ConversationAction::None;
            }
            _ => {}
        }

        let loading = self.session.conversation().is_loading();
        let mut input = self.session.conversation().input().to_string();
        let result = self.composer.handle_key(key, &mut input, !loading);
        self.session.conversation_mut().set_input(input);

        match result {
            ComposerResult::Submitted => {
                self.submit();
                ConversationAction::None
            }
            ComposerResult::Command(command) => self.handle_slash_command(command),
            ComposerResult::None => ConversationAction::None,
        }
    }

    /// Insert bracketed-paste text into the input as a single edit
    pub fn handle_paste(&mut self, text: &str) {
        self.dismiss_popup();
        let mut input = self.session.conversation().input().to_string();
        self.composer.paste(&mut input, text);
        self.session.conversation_mut().set_input(input);
    }

    fn dismiss_popup(&mut self) -> bool {
        let open = self.alert.is_some() || self.notice.is_some();
        self.alert = None;
        self.notice = None;
        open
    }

    /// Start sending the current input; the reply arrives as `AppEvent::ReplyReceived`
    pub fn submit(&mut self) {
        match self.session.begin_send() {
            SendStart::Started(request) => {
                self.thinking.start();
                self.scroll = 0;
                let fetcher = self.session.fetcher();
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let outcome = fetcher.fetch(&request.text, &request.identity).await;
                    if tx.send(AppEvent::ReplyReceived(outcome)).is_err() {
                        warn!("UI loop gone before reply arrived");
                    }
                });
            }
            SendStart::Busy => debug!("Ignoring submit while a reply is pending"),
            SendStart::Empty => {}
        }
    }

    /// Apply an event coming back from a background task
    pub fn handle_event(&mut self, event: AppEvent) -> ConversationAction {
        match event {
            AppEvent::ReplyReceived(outcome) => {
                self.session.finish_send(outcome);
                self.thinking.stop();
                self.scroll = 0;
            }
            AppEvent::WalletConnected(result) => {
                self.connecting = false;
                let outcome = result
                    .map_err(|e| e.to_string())
                    .and_then(|accounts| {
                        self.session
                            .identity_mut()
                            .apply_accounts(accounts)
                            .map(|identity| identity.token().to_string())
                            .map_err(|e| e.to_string())
                    });
                match outcome {
                    Ok(address) => {
                        self.show_notice(format!("Wallet connected: {}", address));
                    }
                    Err(message) => {
                        warn!("Wallet connection failed: {}", message);
                        self.alert = Some(message);
                    }
                }
            }
        }
        ConversationAction::None
    }

    /// Advance animations
    pub fn tick(&mut self) {
        if self.session.conversation().is_loading() {
            self.thinking.start();
        } else {
            self.thinking.stop();
        }
    }

    fn handle_slash_command(&mut self, command: SlashCommand) -> ConversationAction {
        let loading = self.session.conversation().is_loading();
        if loading && !command.available_while_loading() {
            self.alert = Some(format!(
                "/{} is not available while waiting for a reply",
                command.command()
            ));
            return ConversationAction::None;
        }

        match command {
            SlashCommand::Clear => {
                self.session.clear();
                self.scroll = 0;
            }
            SlashCommand::Connect => self.connect_wallet(),
            SlashCommand::Disconnect => self.disconnect_wallet(),
            SlashCommand::Whoami => {
                let text = format!("Chatting as {}", self.session.identity().current());
                self.show_notice(text);
            }
            SlashCommand::Help => self.show_notice(get_help_text()),
            SlashCommand::Quit => return ConversationAction::Exit,
        }
        ConversationAction::None
    }

    fn connect_wallet(&mut self) {
        if self.connecting {
            return;
        }
        self.connecting = true;
        info!("Requesting wallet accounts");
        let wallet = Arc::clone(&self.wallet);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = wallet.request_accounts().await;
            let _ = tx.send(AppEvent::WalletConnected(result));
        });
    }

    fn disconnect_wallet(&mut self) {
        if !self.session.identity().current().is_wallet() {
            self.show_notice("No wallet connected.".to_string());
            return;
        }
        match self.session.identity_mut().disconnect() {
            Ok(_) => self.show_notice("Wallet disconnected. Started a new session.".to_string()),
            Err(e) => {
                error!("Failed to persist new session identity: {}", e);
                self.alert = Some(e.to_string());
            }
        }
    }

    fn show_notice(&mut self, text: String) {
        self.notice = Some(text);
    }

    /// Render the conversation UI components
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(5),    // History area
                Constraint::Length(1), // Status line
                Constraint::Length(4), // Composer area
            ])
            .split(area);

        let conversation = self.session.conversation();

        HistoryView {
            conversation,
            thinking: &self.thinking,
            scroll: self.scroll,
        }
        .render(chunks[0], buf);

        Paragraph::new(self.status_line()).render(chunks[1], buf);

        ComposerView {
            composer: &self.composer,
            content: conversation.input(),
            has_focus: self.alert.is_none() && self.notice.is_none(),
            loading: conversation.is_loading(),
        }
        .render(chunks[2], buf);

        if let Some(message) = &self.alert {
            render_popup("⚠️ Alert", message, Color::Red, area, buf);
        } else if let Some(message) = &self.notice {
            render_popup("ℹ️ Info", message, Color::Cyan, area, buf);
        }
    }

    fn status_line(&self) -> Line<'static> {
        let mut spans = vec![Span::styled(
            format!(" ⇄ {} ", self.endpoint_host),
            Style::default().fg(Color::DarkGray),
        )];
        if self.show_identity {
            let identity = self.session.identity().current();
            let (label, color) = match identity {
                Identity::Wallet(_) => ("wallet", Color::Magenta),
                Identity::Session(_) => ("session", Color::Cyan),
            };
            spans.push(Span::styled(
                format!(" {} {} ", label, abbreviate(identity.token())),
                Style::default().fg(color),
            ));
        }
        if self.connecting {
            spans.push(Span::styled(
                " connecting wallet… ",
                Style::default().fg(Color::Yellow),
            ));
        }
        Line::from(spans)
    }
}

fn render_popup(title: &str, message: &str, color: Color, area: Rect, buf: &mut Buffer) {
    let width = area.width.saturating_sub(4).min(60);
    let height = (message.lines().count() as u16 + 5).min(area.height);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    Clear.render(popup, buf);
    let mut lines: Vec<Line> = message
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(Color::White))))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Press any key to dismiss",
        Style::default().fg(Color::DarkGray),
    )));

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(Style::default().fg(color)),
        )
        .render(popup, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FetchOutcome, ReplyFetcher};
    use crate::identity::{IdentityResolver, IdentityStore};
    use crate::wallet::WalletError;
    use async_trait::async_trait;
    use crossterm::event::KeyModifiers;
    use tempfile::TempDir;

    struct EchoFetcher;

    #[async_trait]
    impl ReplyFetcher for EchoFetcher {
        async fn fetch(&self, text: &str, _identity: &str) -> FetchOutcome {
            FetchOutcome::Replies(vec![format!("echo: {}", text)])
        }
    }

    struct FixedWallet(Result<Vec<String>, WalletError>);

    #[async_trait]
    impl WalletProvider for FixedWallet {
        async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
            self.0.clone()
        }
    }

    fn manager(
        wallet: FixedWallet,
    ) -> (ConversationManager, mpsc::UnboundedReceiver<AppEvent>, TempDir) {
        let dir = TempDir::new().unwrap();
        let identity = IdentityResolver::load(IdentityStore::in_dir(dir.path())).unwrap();
        let session = ChatSession::new(identity, Arc::new(EchoFetcher));
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ConversationManager::new(session, Arc::new(wallet), tx, "localhost"),
            rx,
            dir,
        )
    }

    fn type_line(manager: &mut ConversationManager, text: &str) -> ConversationAction {
        for c in text.chars() {
            manager.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        manager.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        manager.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
    }

    #[tokio::test]
    async fn test_submit_round_trip() {
        let (mut manager, mut rx, _dir) = manager(FixedWallet(Err(WalletError::Unavailable)));
        type_line(&mut manager, "hello");
        assert!(manager.session().conversation().is_loading());

        let event = rx.recv().await.unwrap();
        manager.handle_event(event);

        let conversation = manager.session().conversation();
        assert!(!conversation.is_loading());
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.last().unwrap().text(), "echo: hello");
    }

    #[tokio::test]
    async fn test_wallet_failure_raises_alert() {
        let (mut manager, mut rx, _dir) = manager(FixedWallet(Err(WalletError::Unavailable)));
        let before = manager.session().identity().token().to_string();

        type_line(&mut manager, "/connect");
        let event = rx.recv().await.unwrap();
        manager.handle_event(event);

        assert!(manager.alert().is_some());
        assert_eq!(manager.session().identity().token(), before);

        manager.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        assert!(manager.alert().is_none());
        assert_eq!(manager.session().conversation().input(), "");
    }

    #[tokio::test]
    async fn test_wallet_connect_and_disconnect() {
        let address = "0xABCDEF0123456789ABCDEF0123456789ABCD1234".to_string();
        let (mut manager, mut rx, _dir) = manager(FixedWallet(Ok(vec![address.clone()])));

        type_line(&mut manager, "/connect");
        let event = rx.recv().await.unwrap();
        manager.handle_event(event);
        assert_eq!(manager.session().identity().token(), address);

        type_line(&mut manager, "/disconnect");
        assert!(!manager.session().identity().current().is_wallet());
        assert_ne!(manager.session().identity().token(), address);
    }

    #[test]
    fn test_quit_command_exits() {
        let (mut manager, _rx, _dir) = manager(FixedWallet(Err(WalletError::Unavailable)));
        assert_eq!(type_line(&mut manager, "/quit"), ConversationAction::Exit);
    }

    #[tokio::test]
    async fn test_clear_command_resets_log() {
        let (mut manager, mut rx, _dir) = manager(FixedWallet(Err(WalletError::Unavailable)));
        type_line(&mut manager, "hello");
        let event = rx.recv().await.unwrap();
        manager.handle_event(event);
        assert_eq!(manager.session().conversation().len(), 3);

        type_line(&mut manager, "/clear");
        assert_eq!(manager.session().conversation().len(), 1);
    }

    #[test]
    fn test_local_notices_stay_out_of_log() {
        let (mut manager, _rx, _dir) = manager(FixedWallet(Err(WalletError::Unavailable)));
        let token = manager.session().identity().token().to_string();

        type_line(&mut manager, "/whoami");
        assert_eq!(manager.session().conversation().len(), 1);
        assert!(manager.notice().unwrap().contains(&token));

        manager.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        assert!(manager.notice().is_none());

        type_line(&mut manager, "/help");
        assert_eq!(manager.session().conversation().len(), 1);
        assert!(manager.notice().unwrap().contains("/connect"));

        manager.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        type_line(&mut manager, "/disconnect");
        assert_eq!(manager.session().conversation().len(), 1);
        assert_eq!(manager.notice(), Some("No wallet connected."));
    }

    #[test]
    fn test_paste_dismisses_popup_and_inserts_text() {
        let (mut manager, _rx, _dir) = manager(FixedWallet(Err(WalletError::Unavailable)));
        type_line(&mut manager, "/help");
        assert!(manager.notice().is_some());

        manager.handle_paste("line one\r\nline two");
        assert!(manager.notice().is_none());
        assert_eq!(manager.session().conversation().input(), "line one\nline two");
    }

    #[tokio::test]
    async fn test_quit_with_trailing_words_is_sent_as_text() {
        let (mut manager, _rx, _dir) = manager(FixedWallet(Err(WalletError::Unavailable)));
        let action = type_line(&mut manager, "/exit strategy for startups?");
        assert_eq!(action, ConversationAction::None);

        let conversation = manager.session().conversation();
        assert!(conversation.is_loading());
        assert_eq!(conversation.last().unwrap().text(), "/exit strategy for startups?");
    }
}

use crate::chat::ChatSession;
use crate::config::Config;
use crate::events::AppEvent;
use crate::ui::conversation::{ConversationAction, ConversationManager};
use crate::wallet::WalletProvider;
use anyhow::{Context, Result};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Run the chat screen until the user quits
pub async fn run(config: &Config, session: ChatSession, wallet: Arc<dyn WalletProvider>) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, config, session, wallet).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Tui,
    config: &Config,
    session: ChatSession,
    wallet: Arc<dyn WalletProvider>,
) -> Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut manager = ConversationManager::new(session, wallet, events_tx, config.endpoint_host())
        .with_identity_shown(config.ui.show_identity);

    let mut terminal_events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(150));

    info!("Chat screen started");

    loop {
        terminal
            .draw(|frame| manager.render(frame.size(), frame.buffer_mut()))
            .context("Failed to draw frame")?;

        let action = tokio::select! {
            maybe_event = terminal_events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => manager.handle_key(key),
                Some(Ok(Event::Paste(text))) => {
                    manager.handle_paste(&text);
                    ConversationAction::None
                }
                Some(Ok(_)) => ConversationAction::None,
                Some(Err(e)) => {
                    error!("Terminal event error: {}", e);
                    ConversationAction::None
                }
                None => ConversationAction::Exit,
            },
            Some(event) = events_rx.recv() => manager.handle_event(event),
            _ = tick.tick() => {
                manager.tick();
                ConversationAction::None
            }
        };

        if action == ConversationAction::Exit {
            info!("Exit requested");
            break;
        }
    }

    Ok(())
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableBracketedPaste)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

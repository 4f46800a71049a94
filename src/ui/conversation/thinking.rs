use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};
use std::time::{Duration, Instant};

/// Transient "thinking" placeholder shown while a reply is pending.
/// Never part of the conversation log.
#[derive(Debug, Clone)]
pub struct ThinkingIndicator {
    started: Option<Instant>,
}

impl Default for ThinkingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkingIndicator {
    pub fn new() -> Self {
        Self { started: None }
    }

    pub fn start(&mut self) {
        self.started.get_or_insert_with(Instant::now);
    }

    pub fn stop(&mut self) {
        self.started = None;
    }

    pub fn is_active(&self) -> bool {
        self.started.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Animated dots, one frame per 300ms
    fn dots(&self) -> &'static str {
        match (self.elapsed().as_millis() / 300) % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        }
    }

    pub fn line(&self) -> Option<Line<'static>> {
        if !self.is_active() {
            return None;
        }
        Some(Line::from(vec![
            Span::styled("🤖 ", Style::default().fg(Color::Green)),
            Span::styled("Thinking", Style::default().fg(Color::Green)),
            Span::styled(self.dots(), Style::default().fg(Color::Yellow)),
        ]))
    }
}

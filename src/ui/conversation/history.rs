//! Conversation history display component

use crate::conversation::{Conversation, Message};
use crate::events::Sender;
use crate::ui::conversation::thinking::ThinkingIndicator;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Render-time view of the message log, newest at the bottom
pub struct HistoryView<'a> {
    pub conversation: &'a Conversation,
    pub thinking: &'a ThinkingIndicator,
    /// Lines scrolled up from the bottom
    pub scroll: usize,
}

impl Widget for HistoryView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("💬 Conversation");

        let inner_area = block.inner(area);
        block.render(area, buf);

        let width = inner_area.width.saturating_sub(2) as usize;
        let mut all_lines: Vec<Line> = Vec::new();
        for message in self.conversation.messages() {
            all_lines.extend(render_message(message, width));
            all_lines.push(Line::from(""));
        }
        if let Some(line) = self.thinking.line() {
            all_lines.push(line);
        }

        let height = inner_area.height as usize;
        let end = all_lines.len().saturating_sub(self.scroll.min(max_scroll(&all_lines, height)));
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

fn max_scroll(lines: &[Line], height: usize) -> usize {
    lines.len().saturating_sub(height)
}

/// Render a single message into lines
pub fn render_message(message: &Message, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let timestamp = message.created_at().format("%H:%M:%S").to_string();
    let header = format!(
        "{} {} {} {}",
        message.sender().icon(),
        message.sender().display_name(),
        timestamp,
        "─".repeat(12)
    );
    lines.push(Line::from(vec![Span::styled(
        header,
        Style::default().fg(Color::DarkGray),
    )]));

    let style = content_style(message.sender());
    for content_line in wrap_text(message.text(), width) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, style),
        ]));
    }

    lines
}

fn content_style(sender: Sender) -> Style {
    match sender {
        Sender::User => Style::default().fg(Color::Blue),
        Sender::Assistant => Style::default().fg(Color::Green),
    }
}

/// Wrap text to fit within the given width, keeping explicit line breaks
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;
        let indent: String = paragraph.chars().take_while(|c| *c == ' ').collect();

        for word in paragraph.split_whitespace().flat_map(|word| split_long_word(word, width)) {
            let word_width = word.chars().count();
            if current_width == 0 {
                current_line.push_str(&indent);
                current_line.push_str(&word);
                current_width = indent.len() + word_width;
            } else if current_width + word_width + 1 <= width {
                current_line.push(' ');
                current_line.push_str(&word);
                current_width += word_width + 1;
            } else {
                lines.push(std::mem::take(&mut current_line));
                current_line.push_str(&word);
                current_width = word_width;
            }
        }
        lines.push(current_line);
    }

    lines
}

/// Break a word wider than `width` into `width`-sized pieces
fn split_long_word(word: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() <= width {
        return vec![word.to_string()];
    }
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}

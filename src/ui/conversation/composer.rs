use crate::ui::conversation::commands::{command_entries, parse_slash_command, CommandEntry, SlashCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted,
    Command(SlashCommand),
    None,
}

/// Cursor and command palette state for the input line.
///
/// The text itself lives in the conversation's input buffer and is passed in.
#[derive(Debug, Clone)]
pub struct Composer {
    placeholder: String,
    /// Byte offset into the input, always on a char boundary
    cursor: usize,
    command_entries: Vec<CommandEntry>,
    filtered_commands: Vec<CommandEntry>,
    show_command_palette: bool,
    selected_command: Option<usize>,
}

impl Composer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            cursor: 0,
            command_entries: command_entries(),
            filtered_commands: Vec::new(),
            show_command_palette: false,
            selected_command: None,
        }
    }

    /// Handle key input. `enabled` is false while a reply is pending; typing
    /// still works but Enter does not submit plain text.
    pub fn handle_key(&mut self, key: KeyEvent, content: &mut String, enabled: bool) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }
        self.cursor = self.cursor.min(content.len());

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char(content, '\n');
                } else if self.show_command_palette {
                    self.apply_selected_command(content);
                } else if !content.trim().is_empty() {
                    if let Some(command) = parse_slash_command(content) {
                        content.clear();
                        self.cursor = 0;
                        return ComposerResult::Command(command);
                    }
                    if enabled {
                        self.cursor = 0;
                        return ComposerResult::Submitted;
                    }
                }
            }
            KeyCode::Up if self.show_command_palette => self.move_command_selection(-1),
            KeyCode::Down if self.show_command_palette => self.move_command_selection(1),
            KeyCode::Esc if self.show_command_palette => self.close_command_palette(),
            KeyCode::Tab if self.show_command_palette => {
                self.apply_selected_command(content);
            }
            KeyCode::Char(c) => {
                self.insert_char(content, c);
                self.sync_command_palette(content);
            }
            KeyCode::Backspace => {
                if self.backspace(content) {
                    self.sync_command_palette(content);
                }
            }
            KeyCode::Delete => {
                if self.delete(content) {
                    self.sync_command_palette(content);
                }
            }
            KeyCode::Left => {
                if let Some((idx, _)) = content[..self.cursor].char_indices().next_back() {
                    self.cursor = idx;
                }
            }
            KeyCode::Right => {
                if let Some(c) = content[self.cursor..].chars().next() {
                    self.cursor += c.len_utf8();
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = content.len(),
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor in one edit. CRLF line endings become `\n`.
    pub fn paste(&mut self, content: &mut String, text: &str) {
        self.cursor = self.cursor.min(content.len());
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        content.insert_str(self.cursor, &text);
        self.cursor += text.len();
        self.sync_command_palette(content);
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_palette_open(&self) -> bool {
        self.show_command_palette
    }

    fn insert_char(&mut self, content: &mut String, c: char) {
        content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Delete character before cursor
    fn backspace(&mut self, content: &mut String) -> bool {
        match content[..self.cursor].char_indices().next_back() {
            Some((idx, _)) => {
                content.remove(idx);
                self.cursor = idx;
                true
            }
            None => false,
        }
    }

    /// Delete character at cursor
    fn delete(&mut self, content: &mut String) -> bool {
        if self.cursor < content.len() {
            content.remove(self.cursor);
            true
        } else {
            false
        }
    }

    fn sync_command_palette(&mut self, content: &str) {
        let is_command_word = content.starts_with('/') && !content.contains(char::is_whitespace);
        if is_command_word {
            if !self.show_command_palette {
                self.show_command_palette = true;
                self.selected_command = Some(0);
            }
            self.refresh_command_palette(content);
        } else if self.show_command_palette {
            self.close_command_palette();
        }
    }

    fn close_command_palette(&mut self) {
        self.show_command_palette = false;
        self.filtered_commands.clear();
        self.selected_command = None;
    }

    fn refresh_command_palette(&mut self, content: &str) {
        let query = content.trim_start_matches('/').to_lowercase();
        self.filtered_commands = self
            .command_entries
            .iter()
            .filter(|entry| query.is_empty() || entry.keyword.starts_with(&query))
            .copied()
            .collect();

        if self.filtered_commands.is_empty() {
            self.selected_command = None;
        } else {
            let index = self.selected_command.unwrap_or(0);
            self.selected_command = Some(index.min(self.filtered_commands.len() - 1));
        }
    }

    fn move_command_selection(&mut self, delta: isize) {
        if self.filtered_commands.is_empty() {
            self.selected_command = None;
            return;
        }

        let len = self.filtered_commands.len() as isize;
        let current = self.selected_command.unwrap_or(0) as isize;
        self.selected_command = Some((current + delta).rem_euclid(len) as usize);
    }

    fn apply_selected_command(&mut self, content: &mut String) {
        if let Some(entry) = self
            .selected_command
            .and_then(|index| self.filtered_commands.get(index))
        {
            *content = format!("/{}", entry.keyword);
            self.cursor = content.len();
        }
        self.close_command_palette();
    }
}

/// Render-time view of the composer and its input
pub struct ComposerView<'a> {
    pub composer: &'a Composer,
    pub content: &'a str,
    pub has_focus: bool,
    pub loading: bool,
}

impl Widget for ComposerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.loading {
            "⏳ Waiting for reply"
        } else {
            "✏️ Message (Enter to send, Shift+Enter for new line)"
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(if self.has_focus && !self.loading {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.composer.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = self.content.to_string();
            if self.has_focus {
                content.insert(self.composer.cursor.min(content.len()), '▌');
            }

            for (i, line_text) in content.split('\n').enumerate() {
                if i < inner_area.height as usize {
                    let line = Line::from(vec![Span::raw(line_text)]);
                    buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
                }
            }
        }

        if self.composer.show_command_palette && !self.composer.filtered_commands.is_empty() {
            let filtered = &self.composer.filtered_commands;
            let palette_height = (filtered.len().min(6) + 2) as u16;
            let palette_area = Rect {
                x: inner_area.x,
                y: area.y.saturating_sub(palette_height),
                width: inner_area.width,
                height: palette_height.min(area.y),
            };
            if palette_area.height < 3 {
                return;
            }

            Clear.render(palette_area, buf);
            let block = Block::default()
                .borders(Borders::ALL)
                .title("Commands")
                .style(Style::default().fg(Color::Blue));
            let inner = block.inner(palette_area);
            block.render(palette_area, buf);

            for (index, entry) in filtered.iter().enumerate() {
                if index >= inner.height as usize {
                    break;
                }

                let style = if self.composer.selected_command == Some(index) {
                    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };

                let line = Line::from(vec![
                    Span::styled(format!("/{}", entry.keyword), style),
                    Span::styled(" - ", Style::default().fg(Color::DarkGray)),
                    Span::styled(entry.description, Style::default().fg(Color::Gray)),
                ]);

                buf.set_line(inner.x, inner.y + index as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(composer: &mut Composer, content: &mut String, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)), content, true);
        }
    }

    #[test]
    fn test_typing_and_submit() {
        let mut composer = Composer::new("Say something");
        let mut content = String::new();
        type_str(&mut composer, &mut content, "hello");

        assert_eq!(content, "hello");
        assert_eq!(composer.handle_key(press(KeyCode::Enter), &mut content, true), ComposerResult::Submitted);
        assert_eq!(composer.cursor(), 0);
    }

    #[test]
    fn test_blank_enter_does_nothing() {
        let mut composer = Composer::new("");
        let mut content = String::from("   ");
        assert_eq!(composer.handle_key(press(KeyCode::Enter), &mut content, true), ComposerResult::None);
    }

    #[test]
    fn test_enter_disabled_while_loading() {
        let mut composer = Composer::new("");
        let mut content = String::new();
        type_str(&mut composer, &mut content, "hi");
        assert_eq!(composer.handle_key(press(KeyCode::Enter), &mut content, false), ComposerResult::None);
        assert_eq!(content, "hi");
    }

    #[test]
    fn test_shift_enter_inserts_newline() {
        let mut composer = Composer::new("");
        let mut content = String::from("a");
        composer.handle_key(press(KeyCode::End), &mut content, true);
        composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT), &mut content, true);
        assert_eq!(content, "a\n");
    }

    #[test]
    fn test_multibyte_editing() {
        let mut composer = Composer::new("");
        let mut content = String::new();
        type_str(&mut composer, &mut content, "héllo");
        composer.handle_key(press(KeyCode::Left), &mut content, true);
        composer.handle_key(press(KeyCode::Left), &mut content, true);
        composer.handle_key(press(KeyCode::Left), &mut content, true);
        composer.handle_key(press(KeyCode::Backspace), &mut content, true);
        assert_eq!(content, "hllo");
    }

    #[test]
    fn test_slash_command_returned() {
        let mut composer = Composer::new("");
        let mut content = String::new();
        type_str(&mut composer, &mut content, "/clear");
        composer.handle_key(press(KeyCode::Esc), &mut content, true);

        let result = composer.handle_key(press(KeyCode::Enter), &mut content, false);
        match result {
            ComposerResult::Command(command) => assert_eq!(command, SlashCommand::Clear),
            other => panic!("expected command, got {:?}", other),
        }
        assert!(content.is_empty());
    }

    #[test]
    fn test_palette_completes_selection() {
        let mut composer = Composer::new("");
        let mut content = String::new();
        type_str(&mut composer, &mut content, "/dis");
        assert!(composer.is_palette_open());

        composer.handle_key(press(KeyCode::Tab), &mut content, true);
        assert_eq!(content, "/disconnect");
        assert!(!composer.is_palette_open());
    }

    #[test]
    fn test_unknown_slash_text_submits() {
        let mut composer = Composer::new("");
        let mut content = String::new();
        type_str(&mut composer, &mut content, "/save secret");
        assert_eq!(composer.handle_key(press(KeyCode::Enter), &mut content, true), ComposerResult::Submitted);
    }

    #[test]
    fn test_command_with_trailing_words_submits_as_text() {
        let mut composer = Composer::new("");
        let mut content = String::new();
        type_str(&mut composer, &mut content, "/clear the air");
        assert!(!composer.is_palette_open());
        assert_eq!(composer.handle_key(press(KeyCode::Enter), &mut content, true), ComposerResult::Submitted);
        assert_eq!(content, "/clear the air");
    }

    #[test]
    fn test_paste_inserts_at_cursor_and_normalizes_crlf() {
        let mut composer = Composer::new("");
        let mut content = String::from("ab");
        composer.handle_key(press(KeyCode::End), &mut content, true);
        composer.handle_key(press(KeyCode::Left), &mut content, true);

        composer.paste(&mut content, "one\r\ntwo");
        assert_eq!(content, "aone\ntwob");
        assert_eq!(composer.cursor(), "aone\ntwo".len());
    }
}

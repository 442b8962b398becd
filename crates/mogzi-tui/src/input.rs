// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The input model: edit buffer, cursor, command history, and the
//! autocomplete / user-selection sub-states.

/// Maximum entries kept in the command history.
const HISTORY_CAP: usize = 100;

/// Sub-state of the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputState {
    #[default]
    Normal,
    /// An autocomplete provider is active; suggestions are shown.
    Autocomplete,
    /// A slash command installed a selection list; Enter picks an entry.
    UserSelection,
}

/// One entry in the suggestion / selection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    /// The value inserted or passed to the selection handler.
    pub value: String,
    /// Short human description shown next to the value.
    pub description: String,
}

impl CompletionItem {
    pub fn new(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: description.into(),
        }
    }

    pub fn simple(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: String::new(),
        }
    }
}

/// The editable input line plus everything hanging off it.
///
/// `cursor_position` is a character index and always satisfies
/// `0 ≤ cursor ≤ chars(current_input)`; `selected_suggestion_index` is in
/// range whenever suggestions are visible.
#[derive(Default)]
pub struct InputContext {
    current_input: String,
    cursor_position: usize,
    pub state: InputState,
    /// Index of the provider that produced the current suggestions.
    pub active_provider: Option<usize>,
    pub completion_items: Vec<CompletionItem>,
    pub selected_suggestion_index: usize,
    pub show_suggestions: bool,
    command_history: Vec<String>,
    /// None = editing a fresh line; Some(i) = browsing history entry i.
    history_index: Option<usize>,
}

impl InputContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_input(&self) -> &str {
        &self.current_input
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    fn char_count(&self) -> usize {
        self.current_input.chars().count()
    }

    /// Byte offset of the character index `pos`.
    fn byte_at(&self, pos: usize) -> usize {
        self.current_input
            .char_indices()
            .nth(pos)
            .map(|(b, _)| b)
            .unwrap_or(self.current_input.len())
    }

    // ── Editing ──────────────────────────────────────────────────────────────

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_at(self.cursor_position);
        self.current_input.insert(at, c);
        self.cursor_position += 1;
        self.history_index = None;
    }

    pub fn backspace(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        let at = self.byte_at(self.cursor_position - 1);
        self.current_input.remove(at);
        self.cursor_position -= 1;
        self.history_index = None;
    }

    pub fn delete(&mut self) {
        if self.cursor_position >= self.char_count() {
            return;
        }
        let at = self.byte_at(self.cursor_position);
        self.current_input.remove(at);
        self.history_index = None;
    }

    pub fn move_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor_position = (self.cursor_position + 1).min(self.char_count());
    }

    pub fn move_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_position = self.char_count();
    }

    pub fn clear(&mut self) {
        self.current_input.clear();
        self.cursor_position = 0;
        self.history_index = None;
        self.dismiss_suggestions();
    }

    /// Replace the whole buffer, cursor at the end.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.current_input = text.into();
        self.cursor_position = self.char_count();
    }

    // ── Submission & history ─────────────────────────────────────────────────

    /// Take the buffer for submission.  Whitespace-only input yields `None`.
    /// Accepted input is recorded in the command history (deduplicated,
    /// capped) and the buffer cleared.
    pub fn take_submission(&mut self) -> Option<String> {
        let text = self.current_input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.command_history.retain(|h| h != &text);
        self.command_history.push(text.clone());
        if self.command_history.len() > HISTORY_CAP {
            let excess = self.command_history.len() - HISTORY_CAP;
            self.command_history.drain(..excess);
        }
        self.clear();
        Some(text)
    }

    /// Up: walk back through history; from the fresh line, start at the most
    /// recent entry.
    pub fn history_up(&mut self) {
        if self.command_history.is_empty() {
            return;
        }
        let next = match self.history_index {
            None => self.command_history.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.history_index = Some(next);
        self.set_input(self.command_history[next].clone());
    }

    /// Down: walk forward; past the newest entry wraps to a blank line.
    pub fn history_down(&mut self) {
        let Some(i) = self.history_index else { return };
        if i + 1 < self.command_history.len() {
            self.history_index = Some(i + 1);
            self.set_input(self.command_history[i + 1].clone());
        } else {
            self.history_index = None;
            self.current_input.clear();
            self.cursor_position = 0;
        }
    }

    pub fn history_len(&self) -> usize {
        self.command_history.len()
    }

    // ── Suggestions ──────────────────────────────────────────────────────────

    pub fn set_suggestions(&mut self, provider: usize, items: Vec<CompletionItem>) {
        self.active_provider = Some(provider);
        self.completion_items = items;
        self.selected_suggestion_index = 0;
        self.show_suggestions = true;
        self.state = InputState::Autocomplete;
    }

    pub fn dismiss_suggestions(&mut self) {
        self.active_provider = None;
        self.completion_items.clear();
        self.selected_suggestion_index = 0;
        self.show_suggestions = false;
        if self.state == InputState::Autocomplete {
            self.state = InputState::Normal;
        }
    }

    pub fn suggestion_next(&mut self) {
        if self.completion_items.is_empty() {
            return;
        }
        self.selected_suggestion_index =
            (self.selected_suggestion_index + 1) % self.completion_items.len();
    }

    pub fn suggestion_prev(&mut self) {
        if self.completion_items.is_empty() {
            return;
        }
        self.selected_suggestion_index = self
            .selected_suggestion_index
            .checked_sub(1)
            .unwrap_or(self.completion_items.len() - 1);
    }

    pub fn selected_item(&self) -> Option<&CompletionItem> {
        self.completion_items.get(self.selected_suggestion_index)
    }

    /// Enter user-selection mode with the given list.
    pub fn enter_user_selection(&mut self, items: Vec<CompletionItem>) {
        self.completion_items = items;
        self.selected_suggestion_index = 0;
        self.show_suggestions = true;
        self.state = InputState::UserSelection;
    }

    pub fn leave_user_selection(&mut self) {
        self.state = InputState::Normal;
        self.dismiss_suggestions();
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

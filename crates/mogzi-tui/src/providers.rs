// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Autocomplete and user-selection providers.
//!
//! Providers are polled in registration order after every buffer or cursor
//! change; the first provider whose trigger condition matches becomes
//! active and populates the suggestion list.

use std::path::{Path, PathBuf};

use crate::commands;
use crate::input::{CompletionItem, InputContext, InputState};

/// Maximum directories and files each returned by the file-path provider.
const FILE_SUGGESTION_CAP: usize = 20;

/// A pluggable completion policy for one kind of input token.
pub trait CompletionProvider: Send {
    fn name(&self) -> &str;

    /// When the provider applies to `(input, cursor)`, return the character
    /// index where the token being completed starts.
    fn trigger(&self, input: &str, cursor: usize) -> Option<usize>;

    /// Suggestions for the partial token.
    fn suggestions(&self, partial: &str) -> Vec<CompletionItem>;

    /// The text that replaces the token when `item` is accepted.
    fn replacement(&self, item: &CompletionItem) -> String;
}

// ─── Slash commands ──────────────────────────────────────────────────────────

/// Completes `/command` names while the cursor is inside the first token.
pub struct SlashCommandProvider;

impl CompletionProvider for SlashCommandProvider {
    fn name(&self) -> &str {
        "slash-commands"
    }

    fn trigger(&self, input: &str, cursor: usize) -> Option<usize> {
        if !input.starts_with('/') {
            return None;
        }
        // Cursor must sit within the first whitespace-delimited token.
        let before: String = input.chars().take(cursor).collect();
        if before.contains(char::is_whitespace) {
            return None;
        }
        Some(0)
    }

    fn suggestions(&self, partial: &str) -> Vec<CompletionItem> {
        commands::catalog()
            .iter()
            .filter(|c| c.name.starts_with(partial))
            .map(|c| CompletionItem::new(c.name, c.description))
            .collect()
    }

    fn replacement(&self, item: &CompletionItem) -> String {
        format!("{} ", item.value)
    }
}

// ─── File paths ──────────────────────────────────────────────────────────────

/// Completes `@path` references against the working directory.
///
/// Triggered when an `@` precedes the cursor with only non-whitespace
/// between.  Suggestions are confined to the working directory, directories
/// first (suffixed `/`), then files, each capped and ordered
/// lexicographically.
pub struct FilePathProvider {
    working_dir: PathBuf,
}

impl FilePathProvider {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

impl CompletionProvider for FilePathProvider {
    fn name(&self) -> &str {
        "file-paths"
    }

    fn trigger(&self, input: &str, cursor: usize) -> Option<usize> {
        let before: Vec<char> = input.chars().take(cursor).collect();
        for (i, &c) in before.iter().enumerate().rev() {
            if c == '@' {
                return Some(i + 1);
            }
            if c.is_whitespace() {
                return None;
            }
        }
        None
    }

    fn suggestions(&self, partial: &str) -> Vec<CompletionItem> {
        // Split the partial into an already-typed directory part and the
        // basename being completed.
        let (dir_part, base) = match partial.rfind('/') {
            Some(i) => (&partial[..i + 1], &partial[i + 1..]),
            None => ("", partial),
        };
        let search_dir = self.working_dir.join(dir_part);
        // Keep completion inside the working directory.
        if !lexically_inside(&self.working_dir, &search_dir) {
            return Vec::new();
        }

        let Ok(entries) = std::fs::read_dir(&search_dir) else {
            return Vec::new();
        };
        let mut dirs: Vec<String> = Vec::new();
        let mut files: Vec<String> = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(base) {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                dirs.push(format!("{name}/"));
            } else {
                files.push(name);
            }
        }
        dirs.sort();
        files.sort();
        dirs.truncate(FILE_SUGGESTION_CAP);
        files.truncate(FILE_SUGGESTION_CAP);

        dirs.into_iter()
            .chain(files)
            .map(|name| CompletionItem::simple(format!("{dir_part}{name}")))
            .collect()
    }

    fn replacement(&self, item: &CompletionItem) -> String {
        item.value.clone()
    }
}

/// Lexical containment check for not-yet-canonicalized paths.
fn lexically_inside(root: &Path, candidate: &Path) -> bool {
    use std::path::Component;
    let mut depth: i64 = 0;
    for component in candidate.strip_prefix(root).unwrap_or(candidate).components() {
        match component {
            Component::ParentDir => depth -= 1,
            Component::Normal(_) => depth += 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    true
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Polls the registered providers and keeps the input context's suggestion
/// state in sync with the buffer.
pub struct AutocompleteEngine {
    providers: Vec<Box<dyn CompletionProvider>>,
}

impl AutocompleteEngine {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn register(&mut self, provider: impl CompletionProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Re-poll providers after a buffer or cursor change.  First trigger in
    /// registration order wins; no trigger dismisses the suggestions.
    pub fn refresh(&self, ctx: &mut InputContext) {
        if ctx.state == InputState::UserSelection {
            return; // selection lists are owned by the slash command
        }
        let input = ctx.current_input().to_string();
        let cursor = ctx.cursor_position();
        for (index, provider) in self.providers.iter().enumerate() {
            if let Some(token_start) = provider.trigger(&input, cursor) {
                let partial: String = input
                    .chars()
                    .skip(token_start)
                    .take(cursor - token_start)
                    .collect();
                let items = provider.suggestions(&partial);
                if items.is_empty() {
                    ctx.dismiss_suggestions();
                } else {
                    ctx.set_suggestions(index, items);
                }
                return;
            }
        }
        ctx.dismiss_suggestions();
    }

    /// Accept the highlighted suggestion: replace the partial token and move
    /// the cursor to the end of the completion.
    pub fn accept(&self, ctx: &mut InputContext) {
        let Some(provider_index) = ctx.active_provider else {
            return;
        };
        let Some(item) = ctx.selected_item().cloned() else {
            return;
        };
        let provider = &self.providers[provider_index];
        let input = ctx.current_input().to_string();
        let cursor = ctx.cursor_position();
        let Some(token_start) = provider.trigger(&input, cursor) else {
            ctx.dismiss_suggestions();
            return;
        };

        let replacement = provider.replacement(&item);
        let prefix: String = input.chars().take(token_start).collect();
        let suffix: String = input.chars().skip(cursor).collect();
        let end = prefix.chars().count() + replacement.chars().count();
        ctx.set_input(format!("{prefix}{replacement}{suffix}"));
        // Cursor lands at the end of the completion, before any suffix.
        while ctx.cursor_position() > end {
            ctx.move_left();
        }
        ctx.dismiss_suggestions();
    }
}

impl Default for AutocompleteEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ─── User selection ──────────────────────────────────────────────────────────

/// What the application should do with a picked selection entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionAction {
    /// Load the session with this id.
    LoadSession(String),
    /// Nothing; dismiss the list.
    Dismiss,
}

/// A slash-command-installed list the user picks from.
pub trait UserSelectionProvider: Send {
    fn title(&self) -> &str;
    fn selections(&self) -> Vec<CompletionItem>;
    fn on_selection(&self, value: &str) -> SelectionAction;
}

/// `/session list` — pick a session to load.
pub struct SessionListProvider {
    sessions: Vec<(String, String)>,
}

impl SessionListProvider {
    /// `sessions` pairs are `(id, label)`.
    pub fn new(sessions: Vec<(String, String)>) -> Self {
        Self { sessions }
    }
}

impl UserSelectionProvider for SessionListProvider {
    fn title(&self) -> &str {
        "Select a session"
    }

    fn selections(&self) -> Vec<CompletionItem> {
        self.sessions
            .iter()
            .map(|(id, label)| CompletionItem::new(id.clone(), label.clone()))
            .collect()
    }

    fn on_selection(&self, value: &str) -> SelectionAction {
        if self.sessions.iter().any(|(id, _)| id == value) {
            SelectionAction::LoadSession(value.to_string())
        } else {
            SelectionAction::Dismiss
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

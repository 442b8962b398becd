// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Component visibility and dynamic-area composition.
//!
//! The layout composes the visible components top to bottom with one blank
//! separator line between them.  Which components are visible depends only
//! on the chat state and the input sub-state.

use crate::input::{InputContext, InputState};
use crate::state::ChatState;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Welcome,
    Input,
    Autocomplete,
    UserSelection,
    Progress,
    Footer,
}

/// Everything the dynamic renderer needs; assembled fresh each frame by the
/// event loop, read-only here.
pub struct ViewModel<'a> {
    pub state: ChatState,
    pub has_history: bool,
    pub input: &'a InputContext,
    /// `"{tool} → {argument}"` label while a tool runs.
    pub current_tool: Option<&'a str>,
    pub elapsed_secs: u64,
    /// Monotonic frame counter for the spinner animation.
    pub frame: usize,
    /// Status line content: profile, model, approvals, token totals.
    pub footer: &'a str,
    /// Title of the active user-selection list, if any.
    pub selection_title: Option<&'a str>,
}

/// The visibility table.
pub fn visible_components(state: ChatState, has_history: bool, input: &InputContext) -> Vec<Component> {
    match state {
        ChatState::Input => {
            let mut components = Vec::new();
            if !has_history {
                components.push(Component::Welcome);
            }
            components.push(Component::Input);
            match input.state {
                InputState::Autocomplete if input.show_suggestions => {
                    components.push(Component::Autocomplete)
                }
                InputState::UserSelection => components.push(Component::UserSelection),
                _ => {}
            }
            components.push(Component::Footer);
            components
        }
        ChatState::Thinking | ChatState::ToolExecution => {
            vec![Component::Progress, Component::Footer]
        }
    }
}

/// Compose the dynamic bottom area for one frame.
pub fn compose_dynamic(view: &ViewModel<'_>) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for (i, component) in visible_components(view.state, view.has_history, view.input)
        .into_iter()
        .enumerate()
    {
        if i > 0 {
            lines.push(String::new());
        }
        match component {
            Component::Welcome => lines.extend(welcome_lines()),
            Component::Input => lines.push(input_line(view.input)),
            Component::Autocomplete => lines.extend(suggestion_lines(view.input)),
            Component::UserSelection => {
                if let Some(title) = view.selection_title {
                    lines.push(title.to_string());
                }
                lines.extend(suggestion_lines(view.input));
            }
            Component::Progress => lines.push(progress_line(view)),
            Component::Footer => lines.push(view.footer.to_string()),
        }
    }
    lines
}

fn welcome_lines() -> Vec<String> {
    vec![
        "mogzi — interactive terminal assistant".to_string(),
        "Type a message, @ to reference files, / for commands.".to_string(),
    ]
}

/// The prompt line with a visible caret at the cursor position.
fn input_line(input: &InputContext) -> String {
    let text = input.current_input();
    let cursor = input.cursor_position();
    let before: String = text.chars().take(cursor).collect();
    let after: String = text.chars().skip(cursor).collect();
    format!("> {before}█{after}")
}

fn suggestion_lines(input: &InputContext) -> Vec<String> {
    input
        .completion_items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = if i == input.selected_suggestion_index {
                "▸"
            } else {
                " "
            };
            if item.description.is_empty() {
                format!("{marker} {}", item.value)
            } else {
                format!("{marker} {}  {}", item.value, item.description)
            }
        })
        .collect()
}

fn progress_line(view: &ViewModel<'_>) -> String {
    let spinner = SPINNER_FRAMES[view.frame % SPINNER_FRAMES.len()];
    match view.state {
        ChatState::ToolExecution => {
            let tool = view.current_tool.unwrap_or("tool");
            format!("{spinner} {tool}")
        }
        _ => format!(
            "{spinner} thinking… {}s (esc to cancel)",
            view.elapsed_secs
        ),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::CompletionItem;

    fn view<'a>(state: ChatState, has_history: bool, input: &'a InputContext) -> ViewModel<'a> {
        ViewModel {
            state,
            has_history,
            input,
            current_tool: None,
            elapsed_secs: 3,
            frame: 0,
            footer: "default · mock-model · all",
            selection_title: None,
        }
    }

    #[test]
    fn fresh_session_shows_welcome_input_footer() {
        let input = InputContext::new();
        let components = visible_components(ChatState::Input, false, &input);
        assert_eq!(
            components,
            vec![Component::Welcome, Component::Input, Component::Footer]
        );
    }

    #[test]
    fn with_history_welcome_disappears() {
        let input = InputContext::new();
        let components = visible_components(ChatState::Input, true, &input);
        assert_eq!(components, vec![Component::Input, Component::Footer]);
    }

    #[test]
    fn autocomplete_panel_appears_when_triggered() {
        let mut input = InputContext::new();
        input.set_suggestions(0, vec![CompletionItem::simple("/help")]);
        let components = visible_components(ChatState::Input, true, &input);
        assert!(components.contains(&Component::Autocomplete));
    }

    #[test]
    fn user_selection_panel_appears_when_active() {
        let mut input = InputContext::new();
        input.enter_user_selection(vec![CompletionItem::new("id", "label")]);
        let components = visible_components(ChatState::Input, true, &input);
        assert!(components.contains(&Component::UserSelection));
        assert!(!components.contains(&Component::Autocomplete));
    }

    #[test]
    fn thinking_shows_progress_and_footer_only() {
        let input = InputContext::new();
        let components = visible_components(ChatState::Thinking, true, &input);
        assert_eq!(components, vec![Component::Progress, Component::Footer]);
    }

    #[test]
    fn thinking_progress_has_elapsed_and_cancel_hint() {
        let input = InputContext::new();
        let v = view(ChatState::Thinking, true, &input);
        let lines = compose_dynamic(&v);
        let progress = &lines[0];
        assert!(progress.contains("3s"));
        assert!(progress.contains("esc to cancel"));
    }

    #[test]
    fn tool_execution_progress_shows_tool_label() {
        let input = InputContext::new();
        let mut v = view(ChatState::ToolExecution, true, &input);
        v.current_tool = Some("replace → code.txt");
        let lines = compose_dynamic(&v);
        assert!(lines[0].contains("replace → code.txt"));
    }

    #[test]
    fn components_are_separated_by_blank_lines() {
        let input = InputContext::new();
        let v = view(ChatState::Input, false, &input);
        let lines = compose_dynamic(&v);
        // welcome(2) + blank + input(1) + blank + footer(1)
        assert_eq!(lines.iter().filter(|l| l.is_empty()).count(), 2);
    }

    #[test]
    fn input_line_marks_cursor_position() {
        let mut input = InputContext::new();
        input.set_input("abc");
        input.move_left();
        assert_eq!(input_line(&input), "> ab█c");
    }

    #[test]
    fn selected_suggestion_is_highlighted() {
        let mut input = InputContext::new();
        input.set_suggestions(
            0,
            vec![CompletionItem::simple("one"), CompletionItem::simple("two")],
        );
        input.suggestion_next();
        let lines = suggestion_lines(&input);
        assert!(lines[0].starts_with("  "));
        assert!(lines[1].starts_with("▸"));
    }
}

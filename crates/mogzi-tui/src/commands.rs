// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Slash-command parsing and the command catalog.
//!
//! Handlers never reach the model: every recognized command resolves to a
//! local [`CommandOutcome`] the event loop acts on.

/// One catalog entry; drives both dispatch and autocomplete.
#[derive(Debug, Clone, Copy)]
pub struct SlashCommand {
    pub name: &'static str,
    pub description: &'static str,
}

/// Every recognized command, in display order.
pub fn catalog() -> &'static [SlashCommand] {
    &[
        SlashCommand {
            name: "/help",
            description: "Show available commands",
        },
        SlashCommand {
            name: "/clear",
            description: "Clear the conversation and the screen",
        },
        SlashCommand {
            name: "/status",
            description: "Show profile, model, and session status",
        },
        SlashCommand {
            name: "/session list",
            description: "Pick a session to load",
        },
        SlashCommand {
            name: "/session clear",
            description: "Empty the current session's history",
        },
        SlashCommand {
            name: "/session rename",
            description: "Rename the current session",
        },
        SlashCommand {
            name: "/exit",
            description: "Quit",
        },
        SlashCommand {
            name: "/quit",
            description: "Quit",
        },
    ]
}

/// The locally handled effect of a submitted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Not a slash command; forward the text to the orchestrator.
    NotACommand,
    /// Render the help panel from the catalog.
    Help,
    /// Cancel the outer token and leave the loop.
    Exit,
    /// Clear transcript and scrollback, re-render initial content.
    Clear,
    /// Render the status panel.
    Status,
    /// Install the session list provider and enter user selection.
    SessionList,
    /// Clear the persisted history of the current session.
    SessionClear,
    /// Rename the current session.
    SessionRename(String),
    /// `/`-prefixed but unrecognized; surfaced as an assistant message.
    Unknown(String),
}

/// Parse a submitted line.  Arguments are everything after a single space
/// following the command name.
pub fn process(input: &str) -> CommandOutcome {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return CommandOutcome::NotACommand;
    }

    match trimmed {
        "/help" => return CommandOutcome::Help,
        "/exit" | "/quit" => return CommandOutcome::Exit,
        "/clear" => return CommandOutcome::Clear,
        "/status" => return CommandOutcome::Status,
        "/session list" => return CommandOutcome::SessionList,
        "/session clear" => return CommandOutcome::SessionClear,
        _ => {}
    }

    if let Some(rest) = trimmed.strip_prefix("/session rename ") {
        let name = rest.trim();
        if name.is_empty() {
            return CommandOutcome::Unknown(trimmed.to_string());
        }
        return CommandOutcome::SessionRename(name.to_string());
    }

    CommandOutcome::Unknown(trimmed.to_string())
}

/// Help panel lines rendered from the catalog.
pub fn help_lines() -> Vec<String> {
    let width = catalog().iter().map(|c| c.name.len()).max().unwrap_or(0);
    let mut lines = vec!["Commands:".to_string()];
    for cmd in catalog() {
        lines.push(format!("  {:width$}  {}", cmd.name, cmd.description));
    }
    lines
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use mogzi_diff::UnifiedDiff;
use mogzi_tools::ToolResponseInfo;

/// What kind of work the stream is doing right now; drives the
/// Thinking ↔ ToolExecution transition in the terminal state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamActivity {
    Thinking,
    ToolExecution,
}

/// The tail of a freshly written file, shown after write-type tools.
#[derive(Debug, Clone)]
pub struct WrittenTail {
    /// "showing last N of M lines" when the content was truncated.
    pub banner: Option<String>,
    pub tail: String,
}

impl WrittenTail {
    /// Keep the last `limit` lines of `content`.
    pub fn from_content(content: &str, limit: usize) -> Self {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() <= limit {
            Self {
                banner: None,
                tail: content.trim_end_matches('\n').to_string(),
            }
        } else {
            Self {
                banner: Some(format!("showing last {limit} of {} lines", lines.len())),
                tail: lines[lines.len() - limit..].join("\n"),
            }
        }
    }
}

/// Events the orchestrator streams to the terminal loop.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Accumulated assistant text so far; rendered as the in-place
    /// updatable block.
    AssistantUpdate(String),
    /// The stream switched between plain text and tool work.
    Activity(StreamActivity),
    /// A tool call is about to execute; `label` is
    /// `"{tool} → {key argument}"` for the progress line.
    ToolStarted { call_id: String, label: String },
    /// A tool finished; everything the display layer needs for the static
    /// tool block.
    ToolFinished {
        call_id: String,
        info: ToolResponseInfo,
        display_diff: Option<UnifiedDiff>,
        written_tail: Option<WrittenTail>,
    },
    /// Cumulative token usage after a provider usage report.
    Usage {
        input_tokens: u64,
        output_tokens: u64,
    },
    /// The user cancelled; the literal message is already in history.
    Cancelled { during_tool: bool },
    /// Stream-level failure surfaced as an assistant message.
    Error(String),
    /// The submit cycle finished; return to Input.
    TurnComplete,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

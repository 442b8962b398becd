// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The chat state machine.
//!
//! Three states drive the terminal loop.  Per-variant behaviour lives in
//! plain functions dispatched on the variant; the shared context is only
//! ever touched from the event loop.

use mogzi_core::StreamActivity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    /// Waiting for keyboard input.
    #[default]
    Input,
    /// An AI stream is producing text.
    Thinking,
    /// The stream is in a tool call / tool response.
    ToolExecution,
}

impl ChatState {
    /// Transition taken when the user submits non-slash input.
    pub fn on_submit(self) -> ChatState {
        ChatState::Thinking
    }

    /// Transition driven by stream classification: tool markers move to
    /// ToolExecution, their absence moves back to Thinking.
    pub fn on_activity(self, activity: StreamActivity) -> ChatState {
        match self {
            ChatState::Input => self,
            ChatState::Thinking | ChatState::ToolExecution => match activity {
                StreamActivity::ToolExecution => ChatState::ToolExecution,
                StreamActivity::Thinking => ChatState::Thinking,
            },
        }
    }

    /// Transition when the stream completes, errors, or is cancelled.
    pub fn on_stream_end(self) -> ChatState {
        ChatState::Input
    }

    /// Whether Esc in this state cancels the active AI operation.
    pub fn esc_cancels_stream(self) -> bool {
        matches!(self, ChatState::Thinking | ChatState::ToolExecution)
    }

    pub fn is_busy(self) -> bool {
        self != ChatState::Input
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_input() {
        assert_eq!(ChatState::default(), ChatState::Input);
    }

    #[test]
    fn submit_enters_thinking() {
        assert_eq!(ChatState::Input.on_submit(), ChatState::Thinking);
    }

    #[test]
    fn tool_markers_toggle_tool_execution() {
        let s = ChatState::Thinking.on_activity(StreamActivity::ToolExecution);
        assert_eq!(s, ChatState::ToolExecution);
        let s = s.on_activity(StreamActivity::Thinking);
        assert_eq!(s, ChatState::Thinking);
    }

    #[test]
    fn activity_does_not_wake_input_state() {
        assert_eq!(
            ChatState::Input.on_activity(StreamActivity::ToolExecution),
            ChatState::Input
        );
    }

    #[test]
    fn stream_end_returns_to_input_from_both_busy_states() {
        assert_eq!(ChatState::Thinking.on_stream_end(), ChatState::Input);
        assert_eq!(ChatState::ToolExecution.on_stream_end(), ChatState::Input);
    }

    #[test]
    fn esc_cancels_only_while_busy() {
        assert!(!ChatState::Input.esc_cancels_stream());
        assert!(ChatState::Thinking.esc_cancels_stream());
        assert!(ChatState::ToolExecution.esc_cancels_stream());
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use tracing::warn;

use mogzi_model::Message;

use crate::SessionStore;

/// In-memory transcript split into a completed (persisted) part and a
/// pending part holding the streaming assistant turn.
///
/// Every append to the completed list fans out to the [`SessionStore`];
/// persistence failures are logged and swallowed so a full disk never takes
/// the conversation down mid-turn.
#[derive(Default)]
pub struct HistoryManager {
    completed: Vec<Message>,
    pending: Vec<Message>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, store: &mut SessionStore, msg: Message) {
        self.add_completed(store, msg);
    }

    pub fn add_assistant(&mut self, store: &mut SessionStore, msg: Message) {
        self.add_completed(store, msg);
    }

    /// Append any completed message (tool results, tool-call markers).
    pub fn add_message(&mut self, store: &mut SessionStore, msg: Message) {
        self.add_completed(store, msg);
    }

    fn add_completed(&mut self, store: &mut SessionStore, msg: Message) {
        if let Err(e) = store.add_message(&msg) {
            warn!(error = %e, "failed to persist message");
        }
        self.completed.push(msg);
    }

    /// Start a new pending assistant message (the streaming turn).
    pub fn begin_pending(&mut self, msg: Message) {
        self.pending.push(msg);
    }

    /// Rewrite the text of the last pending message in place.
    pub fn update_last_pending(&mut self, text: &str) {
        if let Some(last) = self.pending.last_mut() {
            *last = Message {
                role: last.role,
                content: mogzi_model::MessageContent::Text(text.to_string()),
            };
        }
    }

    /// Move all pending messages to the completed list and persist them.
    pub fn finalize_streaming(&mut self, store: &mut SessionStore) {
        let drained: Vec<Message> = self.pending.drain(..).collect();
        for msg in drained {
            self.add_completed(store, msg);
        }
    }

    /// Drop everything, in memory and on disk.
    pub fn clear(&mut self, store: &mut SessionStore) {
        self.completed.clear();
        self.pending.clear();
        if let Err(e) = store.clear_history() {
            warn!(error = %e, "failed to clear persisted history");
        }
    }

    /// Seed the completed list from an already-persisted session (no fan-out).
    pub fn seed_completed(&mut self, messages: Vec<Message>) {
        self.completed = messages;
        self.pending.clear();
    }

    /// Transcript for rendering: completed followed by pending.
    pub fn get_for_display(&self) -> Vec<&Message> {
        self.completed.iter().chain(self.pending.iter()).collect()
    }

    /// Transcript for the next model request: completed followed by pending.
    pub fn get_for_ai(&self) -> Vec<Message> {
        self.completed
            .iter()
            .chain(self.pending.iter())
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.pending.is_empty()
    }

    pub fn completed_len(&self) -> usize {
        self.completed.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

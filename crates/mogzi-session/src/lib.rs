// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Durable conversation sessions.
//!
//! Each session lives in its own directory under `~/.mogzi/chats/<uuidv7>/`:
//! a pretty-printed `session.json` plus a content-addressed `attachments/`
//! directory.  The [`HistoryManager`] keeps the in-memory transcript and fans
//! completed messages out to the store.

mod history;
mod store;

pub use history::HistoryManager;
pub use store::{
    default_session_root, list_sessions, AttachmentReference, Session, SessionRecord,
    SessionStore, SessionSummary, UsageMetrics,
};

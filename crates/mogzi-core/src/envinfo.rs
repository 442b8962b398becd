// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use chrono::Utc;

use mogzi_config::{SessionMode, ToolApprovals};

/// Snapshot of the runtime environment appended to user messages for the
/// model's benefit.  Display always shows the unmodified input.
#[derive(Debug, Clone)]
pub struct EnvInfo {
    pub os: String,
    pub shell: String,
    pub username: String,
    pub hostname: String,
    pub working_dir: PathBuf,
    pub mode: SessionMode,
    pub approvals: ToolApprovals,
}

impl EnvInfo {
    /// Gather everything from the process environment.
    pub fn detect(working_dir: &Path, mode: SessionMode, approvals: ToolApprovals) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            shell: std::env::var("SHELL").unwrap_or_else(|_| "unknown".to_string()),
            username: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
            hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
            working_dir: working_dir.to_path_buf(),
            mode,
            approvals,
        }
    }
}

/// The preamble block appended to the submitted user text for AI consumption.
pub fn environment_preamble(env: &EnvInfo) -> String {
    format!(
        "[environment]\n\
         date: {}\n\
         os: {}\n\
         shell: {}\n\
         user: {}\n\
         host: {}\n\
         working_directory: {}\n\
         mode: {}\n\
         tool_approvals: {}",
        Utc::now().format("%Y-%m-%d"),
        env.os,
        env.shell,
        env.username,
        env.hostname,
        env.working_dir.display(),
        env.mode,
        env.approvals,
    )
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

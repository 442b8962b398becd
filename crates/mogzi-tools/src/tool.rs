// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use mogzi_config::ToolApprovals;

/// A single tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Opaque identifier returned by the model (forwarded verbatim)
    pub id: String,
    pub name: String,
    /// Parsed JSON arguments
    pub args: Value,
}

/// Everything a tool needs from its environment, passed explicitly.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// All path arguments are resolved against (and confined to) this root.
    pub working_dir: PathBuf,
    pub approvals: ToolApprovals,
    /// Timeout for a single shell command.
    pub shell_timeout_secs: u64,
    /// Default line/character cap for file reads.
    pub read_limit: usize,
}

impl ToolContext {
    pub fn new(working_dir: PathBuf, approvals: ToolApprovals) -> Self {
        Self {
            working_dir,
            approvals,
            shell_timeout_secs: 120,
            read_limit: 5000,
        }
    }
}

/// Failure kinds a tool can report.  Rendered into the `<error>` element of
/// the tool-response document; never fatal to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    PathOutsideRoot,
    FileNotFound,
    PermissionDenied,
    InvalidArguments,
    InvalidPatchFormat,
    PatchConflict,
    ExecutionFailed,
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolErrorKind::PathOutsideRoot => "PathOutsideRoot",
            ToolErrorKind::FileNotFound => "FileNotFound",
            ToolErrorKind::PermissionDenied => "PermissionDenied",
            ToolErrorKind::InvalidArguments => "InvalidArguments",
            ToolErrorKind::InvalidPatchFormat => "InvalidPatchFormat",
            ToolErrorKind::PatchConflict => "PatchConflict",
            ToolErrorKind::ExecutionFailed => "ExecutionFailed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArguments, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::FileNotFound, message)
    }
}

/// The success half of a tool outcome; the registry renders it (or a
/// [`ToolError`]) into the tool-response XML.
#[derive(Debug, Clone, Default)]
pub struct ToolSuccess {
    /// Human-readable summary placed in `<notes>`.
    pub notes: Option<String>,
    pub absolute_path: Option<PathBuf>,
    pub sha256_checksum: Option<String>,
    /// Checksum of the file before an edit, for edit-type tools.
    pub original_checksum: Option<String>,
    /// File content echoed back in `<content_on_disk>`.
    pub content_on_disk: Option<String>,
}

impl ToolSuccess {
    pub fn with_notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Default::default()
        }
    }
}

/// Trait every built-in tool implements.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for parameters, forwarded to the model provider.
    fn parameters_schema(&self) -> Value;
    /// `true` when the tool never mutates the filesystem.  Mutation tools
    /// are refused outright under readonly approvals; the shell tool opts in
    /// here and enforces its own whitelist policy instead.
    fn read_only(&self) -> bool;
    /// Execute the tool.  Failures are returned, never thrown past here.
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext)
        -> Result<ToolSuccess, ToolError>;
}

/// Tool names whose results warrant a pre-edit snapshot and a display diff.
pub fn is_edit_tool(name: &str) -> bool {
    matches!(name, "replace" | "edit_file" | "editfile" | "edit")
        || matches!(name, "apply_code_patch")
}

/// Tool names whose written content is shown after execution.
pub fn is_write_tool(name: &str) -> bool {
    matches!(name, "write_file" | "writefile" | "write")
}

// ─── Argument helpers ────────────────────────────────────────────────────────

pub(crate) fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::invalid_args(format!("missing required parameter '{key}'")))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

pub(crate) fn optional_u64(args: &Value, key: &str) -> Option<u64> {
    args.get(key).and_then(|v| v.as_u64())
}

pub(crate) fn optional_bool(args: &Value, key: &str) -> Option<bool> {
    args.get(key).and_then(|v| v.as_bool())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

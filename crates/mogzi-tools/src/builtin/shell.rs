// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;

use mogzi_config::ToolApprovals;

use crate::tool::{
    optional_str, require_str, Tool, ToolCall, ToolContext, ToolError, ToolErrorKind, ToolSuccess,
};
use crate::workdir::resolve_in_workdir;

/// Hard byte ceiling for combined stdout + stderr returned to the model.
const OUTPUT_LIMIT_BYTES: usize = 20_000;

/// Lines preserved from the head and tail of oversized output.  Errors and
/// summaries appear at the end of build/test output, so the tail matters as
/// much as the head.
const HEAD_LINES: usize = 100;
const TAIL_LINES: usize = 100;

/// Runs a shell command through the platform shell.
///
/// Commands execute non-interactively: stdin is /dev/null and on Unix the
/// child gets its own session (`setsid`), so cancellation kills the whole
/// process group and no child can reach the controlling terminal.
///
/// Whitelist policy: under `all` approvals the command root (first token) is
/// whitelisted on first use; under `readonly` approvals only already
/// whitelisted roots may run.
pub struct RunShellCommandTool {
    whitelist: Mutex<HashSet<String>>,
}

impl RunShellCommandTool {
    pub fn new() -> Self {
        Self {
            whitelist: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for RunShellCommandTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for RunShellCommandTool {
    fn name(&self) -> &str {
        "run_shell_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output. Output is capped at \
         ~20 KB, preserving the first and last 100 lines. Commands run \
         non-interactively without a TTY; avoid commands that prompt for \
         input. Prefer the dedicated file tools over cat/sed/grep."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "description": {
                    "type": "string",
                    "description": "One-line description of what the command does"
                },
                "directory": {
                    "type": "string",
                    "description": "Working directory for the command (default: the session working directory)"
                }
            },
            "required": ["command"]
        })
    }

    // The shell enforces its own whitelist policy under readonly approvals,
    // so it must stay reachable there.
    fn read_only(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<ToolSuccess, ToolError> {
        let command = require_str(&call.args, "command")?;
        let description = optional_str(&call.args, "description");
        let directory = match optional_str(&call.args, "directory") {
            Some(d) => resolve_in_workdir(&ctx.working_dir, d)?,
            None => ctx.working_dir.clone(),
        };

        let root = command
            .split_whitespace()
            .next()
            .ok_or_else(|| ToolError::invalid_args("empty command"))?
            .to_string();

        {
            let mut whitelist = self.whitelist.lock().unwrap();
            match ctx.approvals {
                ToolApprovals::All => {
                    whitelist.insert(root.clone());
                }
                ToolApprovals::Readonly => {
                    if !whitelist.contains(&root) {
                        return Err(ToolError::new(
                            ToolErrorKind::PermissionDenied,
                            format!(
                                "command '{root}' is not whitelisted under readonly approvals"
                            ),
                        ));
                    }
                }
            }
        }

        debug!(cmd = %command, dir = %directory.display(), "run_shell_command tool");

        let (shell, flag) = platform_shell();
        let mut cmd = Command::new(shell);
        cmd.arg(flag).arg(command);
        cmd.current_dir(&directory);
        cmd.stdin(Stdio::null());
        // When cancellation drops this future, tokio kills the child before
        // releasing the handle; with setsid the signal reaches the whole
        // process group and no orphan keeps running.
        cmd.kill_on_drop(true);
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let timeout = std::time::Duration::from_secs(ctx.shell_timeout_secs);
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::new(
                    ToolErrorKind::ExecutionFailed,
                    format!("spawn error: {e}"),
                ))
            }
            Err(_) => {
                return Err(ToolError::new(
                    ToolErrorKind::ExecutionFailed,
                    format!("timeout after {}s", ctx.shell_timeout_secs),
                ))
            }
        };

        let stdout = strip_ansi(&output.stdout);
        let stderr = strip_ansi(&output.stderr);
        let mut content = String::new();
        if !stdout.is_empty() {
            content.push_str(&head_tail_truncate(&stdout));
        }
        if !stderr.is_empty() {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str("[stderr]\n");
            content.push_str(&head_tail_truncate(&stderr));
        }

        let code = output.status.code().unwrap_or(-1);
        let label = description.map(|d| format!("{d}: ")).unwrap_or_default();
        match code {
            0 => Ok(ToolSuccess {
                notes: Some(format!("{label}exit 0")),
                absolute_path: None,
                sha256_checksum: None,
                original_checksum: None,
                content_on_disk: Some(content),
            }),
            // Exit code 1 is the Unix convention for "no matches" (grep) and
            // "condition false" (test); not a hard failure.
            1 => Ok(ToolSuccess {
                notes: Some(format!("{label}exit 1")),
                absolute_path: None,
                sha256_checksum: None,
                original_checksum: None,
                content_on_disk: Some(content),
            }),
            _ => Err(ToolError::new(
                ToolErrorKind::ExecutionFailed,
                format!("[exit {code}]\n{content}"),
            )),
        }
    }
}

fn platform_shell() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("cmd.exe", "/c")
    } else if cfg!(target_os = "macos") {
        ("/bin/zsh", "-c")
    } else {
        ("/bin/bash", "-c")
    }
}

fn strip_ansi(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&strip_ansi_escapes::strip(bytes)).into_owned()
}

/// Truncate `s` to fit within `OUTPUT_LIMIT_BYTES`, keeping the first and
/// last lines with an omission marker in the middle.
fn head_tail_truncate(s: &str) -> String {
    if s.len() <= OUTPUT_LIMIT_BYTES {
        return s.to_string();
    }

    let lines: Vec<&str> = s.lines().collect();
    let total = lines.len();

    if total <= HEAD_LINES + TAIL_LINES {
        // Few but very long lines: fall back to byte-level head + tail.
        let head = &s[..OUTPUT_LIMIT_BYTES / 2];
        let tail = &s[s.len() - OUTPUT_LIMIT_BYTES / 2..];
        let omitted = s.len() - head.len() - tail.len();
        return format!("{head}\n...[{omitted} bytes omitted]...\n{tail}");
    }

    let head = lines[..HEAD_LINES].join("\n");
    let tail = lines[total - TAIL_LINES..].join("\n");
    let omitted_lines = total - HEAD_LINES - TAIL_LINES;
    let omitted_bytes = s.len().saturating_sub(head.len() + tail.len());
    format!("{head}\n...[{omitted_lines} lines / ~{omitted_bytes} bytes omitted]...\n{tail}")
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

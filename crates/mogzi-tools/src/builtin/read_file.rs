// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::tool::{
    optional_u64, require_str, Tool, ToolCall, ToolContext, ToolError, ToolErrorKind, ToolSuccess,
};
use crate::workdir::resolve_in_workdir;

pub struct ReadTextFileTool;

#[async_trait]
impl Tool for ReadTextFileTool {
    fn name(&self) -> &str {
        "read_text_file"
    }

    fn description(&self) -> &str {
        "Read a text file from the working directory. With both 'offset' and \
         'limit' set, returns up to 'limit' lines starting at line 'offset'; \
         otherwise returns up to 'limit' characters from the start of the file. \
         The path must be absolute."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "absolute_path": {
                    "type": "string",
                    "description": "Absolute path to the file to read"
                },
                "offset": {
                    "type": "integer",
                    "description": "0-based line to start reading from (requires limit)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum lines (with offset) or characters to return"
                }
            },
            "required": ["absolute_path"]
        })
    }

    fn read_only(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<ToolSuccess, ToolError> {
        let raw_path = require_str(&call.args, "absolute_path")?;
        if !std::path::Path::new(raw_path).is_absolute() {
            return Err(ToolError::invalid_args(format!(
                "'absolute_path' must be absolute, got '{raw_path}'"
            )));
        }
        let path = resolve_in_workdir(&ctx.working_dir, raw_path)?;
        let offset = optional_u64(&call.args, "offset").map(|v| v as usize);
        let limit = optional_u64(&call.args, "limit")
            .map(|v| v as usize)
            .unwrap_or(ctx.read_limit);

        debug!(path = %path.display(), "read_text_file tool");

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::not_found(format!("no such file: {}", path.display()))
            } else {
                ToolError::new(ToolErrorKind::ExecutionFailed, format!("read error: {e}"))
            }
        })?;

        let (returned, notes) = match offset {
            Some(start) => {
                let lines: Vec<&str> = content.lines().collect();
                let end = (start + limit).min(lines.len());
                let window = if start < lines.len() {
                    lines[start..end].join("\n")
                } else {
                    String::new()
                };
                let notes = format!(
                    "read lines {}..{} of {} from {}",
                    start,
                    end,
                    lines.len(),
                    path.display()
                );
                (window, notes)
            }
            None => {
                let truncated: String = content.chars().take(limit).collect();
                let notes = if truncated.len() < content.len() {
                    format!(
                        "read first {} of {} characters from {}",
                        truncated.chars().count(),
                        content.chars().count(),
                        path.display()
                    )
                } else {
                    format!("read {}", path.display())
                };
                (truncated, notes)
            }
        };

        let checksum = hex::encode(Sha256::digest(returned.as_bytes()));
        Ok(ToolSuccess {
            notes: Some(notes),
            absolute_path: Some(path),
            sha256_checksum: Some(checksum),
            original_checksum: None,
            content_on_disk: Some(returned),
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

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

pub struct ReplaceTool;

#[async_trait]
impl Tool for ReplaceTool {
    fn name(&self) -> &str {
        "replace"
    }

    fn description(&self) -> &str {
        "Replace occurrences of 'old_string' with 'new_string' in a file. \
         The number of occurrences found must equal 'expected_occurrences' \
         (default 1) exactly, otherwise nothing is changed. Include enough \
         surrounding context in 'old_string' to make the match unique."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to edit"
                },
                "old_string": {
                    "type": "string",
                    "description": "Exact text to replace"
                },
                "new_string": {
                    "type": "string",
                    "description": "Replacement text"
                },
                "expected_occurrences": {
                    "type": "integer",
                    "description": "How many occurrences must exist (default 1)"
                }
            },
            "required": ["path", "old_string", "new_string"]
        })
    }

    fn read_only(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
    ) -> Result<ToolSuccess, ToolError> {
        let raw_path = require_str(&call.args, "path")?;
        let old_string = require_str(&call.args, "old_string")?;
        let new_string = require_str(&call.args, "new_string")?;
        let expected = optional_u64(&call.args, "expected_occurrences").unwrap_or(1) as usize;
        let path = resolve_in_workdir(&ctx.working_dir, raw_path)?;

        if old_string.is_empty() {
            return Err(ToolError::invalid_args("'old_string' must not be empty"));
        }

        debug!(path = %path.display(), expected, "replace tool");

        let original = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::not_found(format!("no such file: {}", path.display()))
            } else {
                ToolError::new(ToolErrorKind::ExecutionFailed, format!("read error: {e}"))
            }
        })?;

        let found = original.matches(old_string).count();
        if found != expected {
            return Err(ToolError::invalid_args(format!(
                "expected exactly {expected} occurrence(s) of 'old_string' in {}, found {found}; \
                 no changes were made",
                path.display()
            )));
        }

        let modified = original.replace(old_string, new_string);
        tokio::fs::write(&path, &modified).await.map_err(|e| {
            ToolError::new(ToolErrorKind::ExecutionFailed, format!("write error: {e}"))
        })?;

        Ok(ToolSuccess {
            notes: Some(format!(
                "replaced {found} occurrence(s) in {}",
                path.display()
            )),
            absolute_path: Some(path),
            sha256_checksum: Some(hex::encode(Sha256::digest(modified.as_bytes()))),
            original_checksum: Some(hex::encode(Sha256::digest(original.as_bytes()))),
            content_on_disk: Some(modified),
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use mogzi_config::ToolApprovals;

    fn setup(content: &str) -> (tempfile::TempDir, ToolContext, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, content).unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf(), ToolApprovals::All);
        (dir, ctx, path.display().to_string())
    }

    fn call(args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "e1".into(),
            name: "replace".into(),
            args,
        }
    }

    #[tokio::test]
    async fn single_occurrence_is_replaced() {
        let (_d, ctx, path) = setup("alpha beta gamma\n");
        let out = ReplaceTool
            .execute(
                &call(json!({"path": path, "old_string": "beta", "new_string": "BETA"})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(out.content_on_disk.as_deref(), Some("alpha BETA gamma\n"));
        assert_ne!(out.sha256_checksum, out.original_checksum);
    }

    #[tokio::test]
    async fn occurrence_mismatch_makes_no_change() {
        let (_d, ctx, path) = setup("dup dup dup\n");
        let err = ReplaceTool
            .execute(
                &call(json!({"path": path.clone(), "old_string": "dup", "new_string": "x"})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidArguments);
        assert!(err.message.contains("found 3"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "dup dup dup\n");
    }

    #[tokio::test]
    async fn explicit_expected_occurrences_replaces_all() {
        let (_d, ctx, path) = setup("dup dup dup\n");
        let out = ReplaceTool
            .execute(
                &call(json!({
                    "path": path,
                    "old_string": "dup",
                    "new_string": "x",
                    "expected_occurrences": 3
                })),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(out.content_on_disk.as_deref(), Some("x x x\n"));
        assert!(out.notes.unwrap().contains("replaced 3"));
    }

    #[tokio::test]
    async fn zero_occurrences_is_an_error() {
        let (_d, ctx, path) = setup("nothing here\n");
        let err = ReplaceTool
            .execute(
                &call(json!({"path": path, "old_string": "absent", "new_string": "x"})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.message.contains("found 0"));
    }

    #[tokio::test]
    async fn empty_old_string_is_invalid() {
        let (_d, ctx, path) = setup("abc");
        let err = ReplaceTool
            .execute(
                &call(json!({"path": path, "old_string": "", "new_string": "x"})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidArguments);
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::tool::{
    require_str, Tool, ToolCall, ToolContext, ToolError, ToolErrorKind, ToolSuccess,
};
use crate::workdir::resolve_in_workdir;

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write a file, overwriting any existing content. Parent directories \
         are created automatically. The written bytes are read back and their \
         checksum verified before the call reports success. \
         ALWAYS prefer editing existing files with replace."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file, absolute or relative to the working directory"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write"
                }
            },
            "required": ["path", "content"]
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
        let content = require_str(&call.args, "content")?;
        let path = resolve_in_workdir(&ctx.working_dir, raw_path)?;

        debug!(path = %path.display(), bytes = content.len(), "write_file tool");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ToolError::new(
                        ToolErrorKind::ExecutionFailed,
                        format!("cannot create {}: {e}", parent.display()),
                    )
                })?;
            }
        }

        tokio::fs::write(&path, content).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ToolError::new(ToolErrorKind::PermissionDenied, format!("write error: {e}"))
            } else {
                ToolError::new(ToolErrorKind::ExecutionFailed, format!("write error: {e}"))
            }
        })?;

        // Read back and verify: the on-disk checksum must equal the checksum
        // of what we were asked to write.
        let expected = hex::encode(Sha256::digest(content.as_bytes()));
        let on_disk = tokio::fs::read(&path).await.map_err(|e| {
            ToolError::new(
                ToolErrorKind::ExecutionFailed,
                format!("read-back error: {e}"),
            )
        })?;
        let actual = hex::encode(Sha256::digest(&on_disk));
        if actual != expected {
            return Err(ToolError::new(
                ToolErrorKind::ExecutionFailed,
                format!(
                    "post-write verification failed for {}: checksum {actual} != {expected}",
                    path.display()
                ),
            ));
        }

        Ok(ToolSuccess {
            notes: Some(format!("wrote {} bytes to {}", content.len(), path.display())),
            absolute_path: Some(path),
            sha256_checksum: Some(actual),
            original_checksum: None,
            content_on_disk: Some(content.to_string()),
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use mogzi_config::ToolApprovals;

    fn ctx() -> (tempfile::TempDir, ToolContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf(), ToolApprovals::All);
        (dir, ctx)
    }

    fn call(args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "w1".into(),
            name: "write_file".into(),
            args,
        }
    }

    #[tokio::test]
    async fn write_creates_file_with_verified_checksum() {
        let (dir, ctx) = ctx();
        let out = WriteFileTool
            .execute(
                &call(json!({"path": "out.txt", "content": "hello write"})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "hello write"
        );
        assert_eq!(out.sha256_checksum.unwrap().len(), 64);
        assert!(out.notes.unwrap().contains("11 bytes"));
    }

    #[tokio::test]
    async fn write_creates_parent_dirs() {
        let (dir, ctx) = ctx();
        WriteFileTool
            .execute(
                &call(json!({"path": "a/b/c.txt", "content": "nested"})),
                &ctx,
            )
            .await
            .unwrap();
        assert!(dir.path().join("a/b/c.txt").is_file());
    }

    #[tokio::test]
    async fn missing_content_is_invalid() {
        let (_d, ctx) = ctx();
        let err = WriteFileTool
            .execute(&call(json!({"path": "x.txt"})), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn escape_outside_workdir_makes_no_mutation() {
        let (_d, ctx) = ctx();
        let err = WriteFileTool
            .execute(
                &call(json!({"path": "../escape.txt", "content": "nope"})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::PathOutsideRoot);
        assert!(!ctx.working_dir.parent().unwrap().join("escape.txt").exists());
    }
}

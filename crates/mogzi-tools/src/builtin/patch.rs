// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use mogzi_diff::{apply_patch, generate_diff_with_context, PatchResult, UnifiedDiff};

use crate::tool::{
    optional_bool, optional_u64, require_str, Tool, ToolCall, ToolContext, ToolError,
    ToolErrorKind, ToolSuccess,
};
use crate::workdir::resolve_in_workdir;

async fn read_original(path: &std::path::Path) -> Result<String, ToolError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::not_found(format!("no such file: {}", path.display()))
        } else {
            ToolError::new(ToolErrorKind::ExecutionFailed, format!("read error: {e}"))
        }
    })
}

fn parse_patch(text: &str) -> Result<UnifiedDiff, ToolError> {
    UnifiedDiff::parse(text)
        .map_err(|e| ToolError::new(ToolErrorKind::InvalidPatchFormat, e.to_string()))
}

fn conflict_error(result: &PatchResult) -> ToolError {
    let detail = result
        .conflicting_hunk
        .map(|c| {
            format!(
                "hunk {} (original line {})",
                c.hunk_index + 1,
                c.original_start
            )
        })
        .unwrap_or_else(|| "unknown hunk".to_string());
    ToolError::new(
        ToolErrorKind::PatchConflict,
        format!(
            "{}: {detail}",
            result.error.as_deref().unwrap_or("patch conflict")
        ),
    )
}

fn apply_summary(result: &PatchResult) -> String {
    let mut summary = format!(
        "{} hunk(s), +{}/-{} line(s)",
        result.applied_hunks, result.total_lines_added, result.total_lines_removed
    );
    if let Some(strategy) = result.fuzzy_matching_strategy {
        summary.push_str(&format!(", fuzzy: {strategy}"));
    }
    summary
}

// ─── apply_code_patch ────────────────────────────────────────────────────────

pub struct ApplyCodePatchTool;

#[async_trait]
impl Tool for ApplyCodePatchTool {
    fn name(&self) -> &str {
        "apply_code_patch"
    }

    fn description(&self) -> &str {
        "Apply a unified diff to a file. When exact context matching fails \
         and use_fuzzy_matching is enabled (the default), whitespace-tolerant \
         and best-similarity placement are tried before giving up."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to patch"
                },
                "patch": {
                    "type": "string",
                    "description": "Unified diff text with ---/+++ headers and @@ hunks"
                },
                "use_fuzzy_matching": {
                    "type": "boolean",
                    "description": "Allow fallback placement strategies (default true)"
                }
            },
            "required": ["path", "patch"]
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
        let patch_text = require_str(&call.args, "patch")?;
        let fuzzy = optional_bool(&call.args, "use_fuzzy_matching").unwrap_or(true);
        let path = resolve_in_workdir(&ctx.working_dir, raw_path)?;

        debug!(path = %path.display(), fuzzy, "apply_code_patch tool");

        let patch = parse_patch(patch_text)?;
        let original = read_original(&path).await?;
        let result = apply_patch(&original, &patch, fuzzy);
        if !result.success {
            return Err(conflict_error(&result));
        }
        let modified = result
            .modified_content
            .clone()
            .unwrap_or_else(|| original.clone());

        tokio::fs::write(&path, &modified).await.map_err(|e| {
            ToolError::new(ToolErrorKind::ExecutionFailed, format!("write error: {e}"))
        })?;

        Ok(ToolSuccess {
            notes: Some(format!("applied {} to {}", apply_summary(&result), path.display())),
            absolute_path: Some(path),
            sha256_checksum: Some(hex::encode(Sha256::digest(modified.as_bytes()))),
            original_checksum: Some(hex::encode(Sha256::digest(original.as_bytes()))),
            content_on_disk: Some(modified),
        })
    }
}

// ─── generate_code_patch ─────────────────────────────────────────────────────

pub struct GenerateCodePatchTool;

#[async_trait]
impl Tool for GenerateCodePatchTool {
    fn name(&self) -> &str {
        "generate_code_patch"
    }

    fn description(&self) -> &str {
        "Compute the unified diff between a file's current content and \
         'modified_content' without changing the file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to diff against"
                },
                "modified_content": {
                    "type": "string",
                    "description": "The proposed new content"
                },
                "context_lines": {
                    "type": "integer",
                    "description": "Context lines per hunk (default 3)"
                }
            },
            "required": ["path", "modified_content"]
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
        let raw_path = require_str(&call.args, "path")?;
        let modified = require_str(&call.args, "modified_content")?;
        let context = optional_u64(&call.args, "context_lines").unwrap_or(3) as usize;
        let path = resolve_in_workdir(&ctx.working_dir, raw_path)?;

        debug!(path = %path.display(), context, "generate_code_patch tool");

        // A missing file diffs against empty, producing a pure-addition patch.
        let original = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(ToolError::new(
                    ToolErrorKind::ExecutionFailed,
                    format!("read error: {e}"),
                ))
            }
        };

        let name = path.display().to_string();
        let diff = generate_diff_with_context(&original, modified, &name, &name, context);
        let notes = if diff.is_empty() {
            format!("no changes between {name} and the proposed content")
        } else {
            format!("{} hunk(s) against {name}", diff.hunks.len())
        };

        Ok(ToolSuccess {
            notes: Some(notes),
            absolute_path: Some(path),
            sha256_checksum: None,
            original_checksum: Some(hex::encode(Sha256::digest(original.as_bytes()))),
            content_on_disk: Some(diff.format()),
        })
    }
}

// ─── preview_patch_application ───────────────────────────────────────────────

pub struct PreviewPatchApplicationTool;

#[async_trait]
impl Tool for PreviewPatchApplicationTool {
    fn name(&self) -> &str {
        "preview_patch_application"
    }

    fn description(&self) -> &str {
        "Dry-run a unified diff against a file: reports whether it applies \
         and returns the would-be content without writing anything."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to test against"
                },
                "patch": {
                    "type": "string",
                    "description": "Unified diff text to dry-run"
                }
            },
            "required": ["path", "patch"]
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
        let raw_path = require_str(&call.args, "path")?;
        let patch_text = require_str(&call.args, "patch")?;
        let path = resolve_in_workdir(&ctx.working_dir, raw_path)?;

        debug!(path = %path.display(), "preview_patch_application tool");

        let patch = parse_patch(patch_text)?;
        let original = read_original(&path).await?;
        let result = apply_patch(&original, &patch, true);
        if !result.success {
            return Err(conflict_error(&result));
        }

        Ok(ToolSuccess {
            notes: Some(format!(
                "patch applies cleanly: {} (no file was modified)",
                apply_summary(&result)
            )),
            absolute_path: Some(path),
            sha256_checksum: None,
            original_checksum: Some(hex::encode(Sha256::digest(original.as_bytes()))),
            content_on_disk: result.modified_content,
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use mogzi_config::ToolApprovals;

    const PATCH: &str = "--- a\n+++ b\n@@ -1,3 +1,3 @@\n one\n-two\n+TWO\n three\n";

    fn setup(content: &str) -> (tempfile::TempDir, ToolContext, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, content).unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf(), ToolApprovals::All);
        (dir, ctx, path.display().to_string())
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "pc1".into(),
            name: name.into(),
            args,
        }
    }

    #[tokio::test]
    async fn apply_writes_patched_file() {
        let (_d, ctx, path) = setup("one\ntwo\nthree\n");
        let out = ApplyCodePatchTool
            .execute(
                &call("apply_code_patch", json!({"path": path.clone(), "patch": PATCH})),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "one\nTWO\nthree\n"
        );
        assert!(out.notes.unwrap().contains("+1/-1"));
        assert_ne!(out.sha256_checksum, out.original_checksum);
    }

    #[tokio::test]
    async fn apply_conflict_leaves_file_untouched() {
        let (_d, ctx, path) = setup("unrelated\ncontent\nentirely\n");
        let err = ApplyCodePatchTool
            .execute(
                &call("apply_code_patch", json!({"path": path.clone(), "patch": PATCH})),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::PatchConflict);
        assert!(err.message.contains("hunk 1"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "unrelated\ncontent\nentirely\n"
        );
    }

    #[tokio::test]
    async fn apply_rejects_malformed_patch() {
        let (_d, ctx, path) = setup("x\n");
        let err = ApplyCodePatchTool
            .execute(
                &call(
                    "apply_code_patch",
                    json!({"path": path, "patch": "not a diff"}),
                ),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidPatchFormat);
    }

    #[tokio::test]
    async fn fuzzy_can_be_disabled() {
        let (_d, ctx, path) = setup("one\n  two\nthree\n");
        let err = ApplyCodePatchTool
            .execute(
                &call(
                    "apply_code_patch",
                    json!({"path": path, "patch": PATCH, "use_fuzzy_matching": false}),
                ),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::PatchConflict);
    }

    #[tokio::test]
    async fn generate_produces_parseable_diff() {
        let (_d, ctx, path) = setup("one\ntwo\nthree\n");
        let out = GenerateCodePatchTool
            .execute(
                &call(
                    "generate_code_patch",
                    json!({"path": path, "modified_content": "one\nTWO\nthree\n"}),
                ),
                &ctx,
            )
            .await
            .unwrap();
        let diff = UnifiedDiff::parse(&out.content_on_disk.unwrap()).unwrap();
        assert_eq!(diff.hunks.len(), 1);
    }

    #[tokio::test]
    async fn generate_for_missing_file_diffs_against_empty() {
        let (dir, ctx, _p) = setup("x\n");
        let missing = dir.path().join("new.txt").display().to_string();
        let out = GenerateCodePatchTool
            .execute(
                &call(
                    "generate_code_patch",
                    json!({"path": missing, "modified_content": "fresh\n"}),
                ),
                &ctx,
            )
            .await
            .unwrap();
        let diff = UnifiedDiff::parse(&out.content_on_disk.unwrap()).unwrap();
        assert_eq!(diff.hunks[0].original_length, 0);
    }

    #[tokio::test]
    async fn preview_does_not_modify_the_file() {
        let (_d, ctx, path) = setup("one\ntwo\nthree\n");
        let out = PreviewPatchApplicationTool
            .execute(
                &call(
                    "preview_patch_application",
                    json!({"path": path.clone(), "patch": PATCH}),
                ),
                &ctx,
            )
            .await
            .unwrap();
        assert!(out.notes.unwrap().contains("applies cleanly"));
        assert_eq!(
            out.content_on_disk.as_deref(),
            Some("one\nTWO\nthree\n")
        );
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "one\ntwo\nthree\n"
        );
    }
}

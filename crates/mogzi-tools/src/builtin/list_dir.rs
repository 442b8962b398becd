// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use crate::tool::{
    optional_bool, optional_str, require_str, Tool, ToolCall, ToolContext, ToolError,
    ToolErrorKind, ToolSuccess,
};
use crate::workdir::resolve_in_workdir;

/// Entries hidden from every listing regardless of arguments.
const BUILTIN_IGNORES: &[&str] = &[
    ".git",
    "node_modules",
    "bin",
    "obj",
    ".vs",
    ".vscode",
    ".DS_Store",
    "Thumbs.db",
    "*.tmp",
    "*.log",
];

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the entries of a directory, directories first, each directory \
         suffixed with '/'. 'ignore' takes comma-separated glob patterns. \
         Entries matching the built-in ignore set (VCS metadata, build output, \
         editor state) are always hidden; .gitignore entries at the working \
         directory root are honoured unless respect_git_ignore is false."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list"
                },
                "ignore": {
                    "type": "string",
                    "description": "Comma-separated glob patterns to hide"
                },
                "respect_git_ignore": {
                    "type": "boolean",
                    "description": "Apply .gitignore entries from the working directory root (default true)"
                }
            },
            "required": ["path"]
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
        let path = resolve_in_workdir(&ctx.working_dir, raw_path)?;
        let respect_git_ignore = optional_bool(&call.args, "respect_git_ignore").unwrap_or(true);

        debug!(path = %path.display(), "list_directory tool");

        let mut filters: Vec<Regex> = BUILTIN_IGNORES
            .iter()
            .filter_map(|p| glob_to_regex(p))
            .collect();
        if let Some(ignore) = optional_str(&call.args, "ignore") {
            filters.extend(
                ignore
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .filter_map(glob_to_regex),
            );
        }
        if respect_git_ignore {
            let gitignore = ctx.working_dir.join(".gitignore");
            if let Ok(text) = tokio::fs::read_to_string(&gitignore).await {
                filters.extend(
                    text.lines()
                        .map(str::trim)
                        .map(|l| l.trim_end_matches('/'))
                        .filter(|l| !l.is_empty() && !l.starts_with('#'))
                        .filter_map(glob_to_regex),
                );
            }
        }

        let mut read_dir = tokio::fs::read_dir(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::not_found(format!("no such directory: {}", path.display()))
            } else {
                ToolError::new(ToolErrorKind::ExecutionFailed, format!("read error: {e}"))
            }
        })?;

        let mut entries: Vec<(bool, String)> = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| {
            ToolError::new(ToolErrorKind::ExecutionFailed, format!("read error: {e}"))
        })? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if filters.iter().any(|re| re.is_match(&name)) {
                continue;
            }
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            entries.push((is_dir, name));
        }

        // Directories first, then case-insensitive name order.
        entries.sort_by(|(a_dir, a), (b_dir, b)| {
            b_dir
                .cmp(a_dir)
                .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        });

        let listing = entries
            .iter()
            .map(|(is_dir, name)| {
                if *is_dir {
                    format!("{name}/")
                } else {
                    name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolSuccess {
            notes: Some(format!(
                "listed {} entries in {}",
                entries.len(),
                path.display()
            )),
            absolute_path: Some(path),
            sha256_checksum: None,
            original_checksum: None,
            content_on_disk: Some(listing),
        })
    }
}

/// Convert a simple shell glob pattern to a [`Regex`].
/// Only `*` (match anything) and `?` (match one char) are supported.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => {
                for esc in regex::escape(&c.to_string()).chars() {
                    re.push(esc);
                }
            }
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use mogzi_config::ToolApprovals;

    fn setup() -> (tempfile::TempDir, ToolContext) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::create_dir(dir.path().join("node_modules")).unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        std::fs::write(dir.path().join("build.log"), "").unwrap();
        std::fs::write(dir.path().join("aaa.txt"), "").unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf(), ToolApprovals::All);
        (dir, ctx)
    }

    fn call(args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "l1".into(),
            name: "list_directory".into(),
            args,
        }
    }

    async fn listing(ctx: &ToolContext, args: serde_json::Value) -> String {
        ListDirectoryTool
            .execute(&call(args), ctx)
            .await
            .unwrap()
            .content_on_disk
            .unwrap()
    }

    #[tokio::test]
    async fn directories_come_first_then_case_insensitive_names() {
        let (_d, ctx) = setup();
        let out = listing(&ctx, json!({"path": "."})).await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["src/", "aaa.txt", "Cargo.toml"]);
    }

    #[tokio::test]
    async fn builtin_ignores_hide_node_modules_and_logs() {
        let (_d, ctx) = setup();
        let out = listing(&ctx, json!({"path": "."})).await;
        assert!(!out.contains("node_modules"));
        assert!(!out.contains("build.log"));
    }

    #[tokio::test]
    async fn ignore_patterns_hide_matching_entries() {
        let (_d, ctx) = setup();
        let out = listing(&ctx, json!({"path": ".", "ignore": "*.toml,aaa*"})).await;
        assert!(!out.contains("Cargo.toml"));
        assert!(!out.contains("aaa.txt"));
        assert!(out.contains("src/"));
    }

    #[tokio::test]
    async fn gitignore_lines_are_honoured() {
        let (dir, ctx) = setup();
        std::fs::write(dir.path().join(".gitignore"), "aaa.txt\n# comment\n").unwrap();
        let out = listing(&ctx, json!({"path": "."})).await;
        assert!(!out.contains("aaa.txt"));

        let out = listing(&ctx, json!({"path": ".", "respect_git_ignore": false})).await;
        assert!(out.contains("aaa.txt"));
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let (_d, ctx) = setup();
        let err = ListDirectoryTool
            .execute(&call(json!({"path": "missing"})), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::FileNotFound);
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use regex::RegexBuilder;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;
use walkdir::WalkDir;

use crate::tool::{
    optional_str, require_str, Tool, ToolCall, ToolContext, ToolError, ToolErrorKind, ToolSuccess,
};
use crate::workdir::resolve_in_workdir;

/// Directories the in-process scanner never descends into.
const SKIP_DIRS: &[&str] = &[".git", "node_modules", "bower_components", ".svn", ".hg"];

pub struct SearchFileContentTool;

#[async_trait]
impl Tool for SearchFileContentTool {
    fn name(&self) -> &str {
        "search_file_content"
    }

    fn description(&self) -> &str {
        "Search file contents with a case-insensitive regular expression. \
         'path' narrows the search to a subdirectory; 'include' is a glob on \
         file names (e.g. \"*.rs\"). Uses git grep inside a repository, the \
         system grep otherwise, and an internal scanner as a last resort. \
         Output groups matches per file as 'File: <path>' / 'L<n>: <line>'."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Case-insensitive regular expression"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search (default: working directory)"
                },
                "include": {
                    "type": "string",
                    "description": "Glob restricting which file names are searched"
                }
            },
            "required": ["pattern"]
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
        let pattern = require_str(&call.args, "pattern")?;
        let include = optional_str(&call.args, "include");
        let search_root = match optional_str(&call.args, "path") {
            Some(p) => resolve_in_workdir(&ctx.working_dir, p)?,
            None => ctx.working_dir.clone(),
        };

        // Validate the pattern up front so all tiers agree on what is legal.
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ToolError::invalid_args(format!("invalid regex: {e}")))?;

        debug!(pattern, root = %search_root.display(), "search_file_content tool");

        let matches = if ctx.working_dir.join(".git").exists() {
            match git_grep(&search_root, pattern, include).await {
                Some(m) => m,
                None => fallback_tiers(&search_root, pattern, include, &regex).await,
            }
        } else {
            fallback_tiers(&search_root, pattern, include, &regex).await
        };

        let (output, file_count, match_count) = group_matches(&matches, &search_root);
        let notes = if match_count == 0 {
            format!("no matches for /{pattern}/")
        } else {
            format!("{match_count} match(es) in {file_count} file(s) for /{pattern}/")
        };

        Ok(ToolSuccess {
            notes: Some(notes),
            absolute_path: Some(search_root),
            sha256_checksum: None,
            original_checksum: None,
            content_on_disk: Some(output),
        })
    }
}

async fn fallback_tiers(
    root: &Path,
    pattern: &str,
    include: Option<&str>,
    regex: &regex::Regex,
) -> Vec<(PathBuf, usize, String)> {
    match system_grep(root, pattern, include).await {
        Some(m) => m,
        None => scan_in_process(root, include, regex),
    }
}

/// Tier 1: `git grep` inside a repository.  Returns `None` when the command
/// is unavailable or exits with an unexpected status.
async fn git_grep(
    root: &Path,
    pattern: &str,
    include: Option<&str>,
) -> Option<Vec<(PathBuf, usize, String)>> {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(root)
        .args(["grep", "--no-color", "-n", "-i", "-E"])
        .arg(pattern);
    if let Some(glob) = include {
        cmd.arg("--").arg(glob);
    }
    cmd.stdin(Stdio::null());
    let output = cmd.output().await.ok()?;
    match output.status.code() {
        Some(0) => Some(parse_grep_lines(&output.stdout, root)),
        Some(1) => Some(Vec::new()),
        _ => None,
    }
}

/// Tier 2: the system grep.
async fn system_grep(
    root: &Path,
    pattern: &str,
    include: Option<&str>,
) -> Option<Vec<(PathBuf, usize, String)>> {
    let mut cmd = Command::new("grep");
    cmd.args(["-r", "-n", "-i", "-E"]);
    for skip in SKIP_DIRS {
        cmd.arg(format!("--exclude-dir={skip}"));
    }
    if let Some(glob) = include {
        cmd.arg(format!("--include={glob}"));
    }
    cmd.arg(pattern).arg(".");
    cmd.current_dir(root);
    cmd.stdin(Stdio::null());
    let output = cmd.output().await.ok()?;
    match output.status.code() {
        Some(0) => Some(parse_grep_lines(&output.stdout, root)),
        Some(1) => Some(Vec::new()),
        _ => None,
    }
}

/// Tier 3: recursive in-process scan.
fn scan_in_process(
    root: &Path,
    include: Option<&str>,
    regex: &regex::Regex,
) -> Vec<(PathBuf, usize, String)> {
    let include_re = include.and_then(glob_to_regex);
    let mut matches = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        !(e.file_type().is_dir()
            && SKIP_DIRS.contains(&e.file_name().to_string_lossy().as_ref()))
    });
    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(re) = &include_re {
            if !re.is_match(&entry.file_name().to_string_lossy()) {
                continue;
            }
        }
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue; // binary or unreadable
        };
        for (lineno, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                matches.push((entry.path().to_path_buf(), lineno + 1, line.to_string()));
            }
        }
    }
    matches
}

/// Parse `path:lineno:content` grep output into match tuples.
fn parse_grep_lines(stdout: &[u8], root: &Path) -> Vec<(PathBuf, usize, String)> {
    let text = String::from_utf8_lossy(stdout);
    let mut matches = Vec::new();
    for line in text.lines() {
        let mut parts = line.splitn(3, ':');
        let (Some(path), Some(lineno), Some(content)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let Ok(lineno) = lineno.parse::<usize>() else {
            continue;
        };
        let path = Path::new(path);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path.strip_prefix("./").unwrap_or(path))
        };
        matches.push((absolute, lineno, content.to_string()));
    }
    matches
}

/// Group matches per file, relative to the search root, in path order.
fn group_matches(
    matches: &[(PathBuf, usize, String)],
    root: &Path,
) -> (String, usize, usize) {
    let mut by_file: BTreeMap<String, Vec<(usize, &str)>> = BTreeMap::new();
    for (path, lineno, line) in matches {
        let display = path
            .strip_prefix(root)
            .unwrap_or(path)
            .display()
            .to_string();
        by_file
            .entry(display)
            .or_default()
            .push((*lineno, line.as_str()));
    }

    let mut out = String::new();
    for (file, lines) in &by_file {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("File: {file}\n"));
        for (lineno, line) in lines {
            out.push_str(&format!("L{lineno}: {line}\n"));
        }
    }
    (out, by_file.len(), matches.len())
}

fn glob_to_regex(pattern: &str) -> Option<regex::Regex> {
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
    regex::Regex::new(&re).ok()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Errors produced while parsing or applying unified-diff text.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The text is not a unified diff.  Carries the offending line so the
    /// caller can show a useful diagnostic.
    #[error("invalid unified diff format at: {line:?}")]
    InvalidFormat { line: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffLineKind {
    Context,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    /// Line content without its trailing newline.
    pub content: String,
    /// 1-based line number in the original file (None for Added lines).
    pub original_line_number: Option<usize>,
    /// 1-based line number in the modified file (None for Removed lines).
    pub modified_line_number: Option<usize>,
}

impl DiffLine {
    pub fn context(content: impl Into<String>) -> Self {
        Self {
            kind: DiffLineKind::Context,
            content: content.into(),
            original_line_number: None,
            modified_line_number: None,
        }
    }

    pub fn added(content: impl Into<String>) -> Self {
        Self {
            kind: DiffLineKind::Added,
            content: content.into(),
            original_line_number: None,
            modified_line_number: None,
        }
    }

    pub fn removed(content: impl Into<String>) -> Self {
        Self {
            kind: DiffLineKind::Removed,
            content: content.into(),
            original_line_number: None,
            modified_line_number: None,
        }
    }
}

/// One contiguous group of changes with surrounding context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// 1-based start line in the original file (0 for insertions into an
    /// empty file, following the `@@ -0,0 +1,N @@` convention).
    pub original_start: usize,
    pub original_length: usize,
    pub modified_start: usize,
    pub modified_length: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// The lines that must exist in the original file, in order.
    pub fn pattern_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| matches!(l.kind, DiffLineKind::Context | DiffLineKind::Removed))
            .map(|l| l.content.as_str())
            .collect()
    }

    /// The lines that replace the pattern in the modified file, in order.
    pub fn replacement_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| matches!(l.kind, DiffLineKind::Context | DiffLineKind::Added))
            .map(|l| l.content.as_str())
            .collect()
    }

    pub fn added_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.kind == DiffLineKind::Added)
            .count()
    }

    pub fn removed_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.kind == DiffLineKind::Removed)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedDiff {
    pub original_file: String,
    pub modified_file: String,
    pub hunks: Vec<DiffHunk>,
}

impl UnifiedDiff {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Serialize to conventional unified-diff text.
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("--- {}\n", self.original_file));
        out.push_str(&format!("+++ {}\n", self.modified_file));
        for hunk in &self.hunks {
            out.push_str(&format!(
                "@@ -{},{} +{},{} @@\n",
                hunk.original_start,
                hunk.original_length,
                hunk.modified_start,
                hunk.modified_length
            ));
            for line in &hunk.lines {
                let prefix = match line.kind {
                    DiffLineKind::Context => ' ',
                    DiffLineKind::Added => '+',
                    DiffLineKind::Removed => '-',
                };
                out.push(prefix);
                out.push_str(&line.content);
                out.push('\n');
            }
        }
        out
    }

    /// Parse unified-diff text.
    ///
    /// Tolerates `\r\n`, `\r`, and `\n` separators.  `---`/`+++` headers are
    /// required; hunk headers follow `@@ -s[,l] +s[,l] @@` with length 1 when
    /// omitted.  Every other line is classified by its first character.
    pub fn parse(text: &str) -> Result<Self, PatchError> {
        let hunk_re = Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap();
        let lines = split_universal(text);

        let mut original_file: Option<String> = None;
        let mut modified_file: Option<String> = None;
        let mut hunks: Vec<DiffHunk> = Vec::new();
        let mut current: Option<DiffHunk> = None;

        for line in &lines {
            if let Some(rest) = line.strip_prefix("--- ") {
                if original_file.is_none() {
                    original_file = Some(rest.trim().to_string());
                    continue;
                }
            }
            if let Some(rest) = line.strip_prefix("+++ ") {
                if modified_file.is_none() {
                    modified_file = Some(rest.trim().to_string());
                    continue;
                }
            }
            if let Some(caps) = hunk_re.captures(line) {
                if let Some(h) = current.take() {
                    hunks.push(h);
                }
                let num = |i: usize, default: usize| -> usize {
                    caps.get(i)
                        .map(|m| m.as_str().parse().unwrap_or(default))
                        .unwrap_or(default)
                };
                current = Some(DiffHunk {
                    original_start: num(1, 0),
                    original_length: num(2, 1),
                    modified_start: num(3, 0),
                    modified_length: num(4, 1),
                    lines: Vec::new(),
                });
                continue;
            }
            if line.starts_with("\\ ") {
                // "No newline at end of file" marker
                continue;
            }
            if let Some(ref mut h) = current {
                if let Some(rest) = line.strip_prefix('+') {
                    h.lines.push(DiffLine::added(rest));
                } else if let Some(rest) = line.strip_prefix('-') {
                    h.lines.push(DiffLine::removed(rest));
                } else if let Some(rest) = line.strip_prefix(' ') {
                    h.lines.push(DiffLine::context(rest));
                } else if line.is_empty() {
                    // A blank diff line with no prefix = empty context line
                    h.lines.push(DiffLine::context(""));
                } else {
                    return Err(PatchError::InvalidFormat {
                        line: line.to_string(),
                    });
                }
            }
        }
        if let Some(h) = current.take() {
            hunks.push(h);
        }

        let (original_file, modified_file) = match (original_file, modified_file) {
            (Some(o), Some(m)) => (o, m),
            _ => {
                return Err(PatchError::InvalidFormat {
                    line: "missing ---/+++ file headers".to_string(),
                })
            }
        };

        Ok(Self {
            original_file,
            modified_file,
            hunks,
        })
    }
}

/// Split on `\r\n`, `\r`, or `\n`, dropping a single trailing empty segment
/// produced by a terminating newline.
pub(crate) fn split_universal(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\n' => lines.push(std::mem::take(&mut buf)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut buf));
            }
            _ => buf.push(c),
        }
    }
    if !buf.is_empty() {
        lines.push(buf);
    }
    lines
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

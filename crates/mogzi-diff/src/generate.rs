// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use similar::{ChangeTag, TextDiff};

use crate::model::{DiffHunk, DiffLine, DiffLineKind, UnifiedDiff};

/// Number of unchanged lines kept around each change group.
const CONTEXT_LINES: usize = 3;

/// Compute a line-granular unified diff between two strings.
///
/// Equal inputs produce an empty hunk list.  Adjacent changes whose context
/// windows touch are coalesced into a single hunk by the grouping.  An empty
/// `original` produces one hunk starting at line 0 containing only additions.
pub fn generate_diff(
    original: &str,
    modified: &str,
    original_file: &str,
    modified_file: &str,
) -> UnifiedDiff {
    generate_diff_with_context(original, modified, original_file, modified_file, CONTEXT_LINES)
}

/// [`generate_diff`] with an explicit number of context lines per hunk.
pub fn generate_diff_with_context(
    original: &str,
    modified: &str,
    original_file: &str,
    modified_file: &str,
    context_lines: usize,
) -> UnifiedDiff {
    let mut hunks = Vec::new();

    if original != modified {
        let diff = TextDiff::from_lines(original, modified);
        for group in diff.grouped_ops(context_lines) {
            let Some(first) = group.first() else { continue };
            let last = group.last().unwrap();
            let old_range = first.old_range().start..last.old_range().end;
            let new_range = first.new_range().start..last.new_range().end;

            let mut lines = Vec::new();
            for op in &group {
                for change in diff.iter_changes(op) {
                    let content = strip_newline(change.value());
                    let (kind, orig_no, mod_no) = match change.tag() {
                        ChangeTag::Equal => (
                            DiffLineKind::Context,
                            change.old_index().map(|i| i + 1),
                            change.new_index().map(|i| i + 1),
                        ),
                        ChangeTag::Delete => (
                            DiffLineKind::Removed,
                            change.old_index().map(|i| i + 1),
                            None,
                        ),
                        ChangeTag::Insert => (
                            DiffLineKind::Added,
                            None,
                            change.new_index().map(|i| i + 1),
                        ),
                    };
                    lines.push(DiffLine {
                        kind,
                        content,
                        original_line_number: orig_no,
                        modified_line_number: mod_no,
                    });
                }
            }

            // Recompute lengths from the lines so the accounting invariant
            // holds even if the op ranges disagree with the emitted lines.
            let original_length = lines
                .iter()
                .filter(|l| l.kind != DiffLineKind::Added)
                .count();
            let modified_length = lines
                .iter()
                .filter(|l| l.kind != DiffLineKind::Removed)
                .count();

            hunks.push(DiffHunk {
                original_start: unified_start(old_range.start, original_length),
                original_length,
                modified_start: unified_start(new_range.start, modified_length),
                modified_length,
                lines,
            });
        }
    }

    UnifiedDiff {
        original_file: original_file.to_string(),
        modified_file: modified_file.to_string(),
        hunks,
    }
}

/// Unified-diff convention: a zero-length side starts at the line *before*
/// the change (so an insertion into an empty file reads `@@ -0,0 +1,N @@`).
fn unified_start(zero_based: usize, length: usize) -> usize {
    if length == 0 {
        zero_based
    } else {
        zero_based + 1
    }
}

fn strip_newline(value: &str) -> String {
    value
        .strip_suffix('\n')
        .map(|v| v.strip_suffix('\r').unwrap_or(v))
        .unwrap_or(value)
        .to_string()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use similar::TextDiff;

use crate::model::{split_universal, DiffHunk, DiffLineKind, UnifiedDiff};

/// Minimum similarity ratio (0–1) for a sliding-window match to be accepted.
const FUZZY_THRESHOLD: f32 = 0.85;

/// Which fallback strategy placed a hunk when the exact match failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzyStrategy {
    /// Per-line comparison ignoring all whitespace, at the hunk's declared
    /// position.
    WhitespaceInsensitive,
    /// Best-similarity window scan across the whole file.
    SlidingWindow,
    /// Window scan with runs of whitespace collapsed to a single space.
    CollapsedWhitespace,
}

impl std::fmt::Display for FuzzyStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuzzyStrategy::WhitespaceInsensitive => write!(f, "whitespace-insensitive"),
            FuzzyStrategy::SlidingWindow => write!(f, "sliding-window"),
            FuzzyStrategy::CollapsedWhitespace => write!(f, "collapsed-whitespace"),
        }
    }
}

/// Coordinates of the hunk that could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictingHunk {
    /// 0-based index into `patch.hunks`.
    pub hunk_index: usize,
    /// The hunk's declared 1-based original start line.
    pub original_start: usize,
}

#[derive(Debug, Clone)]
pub struct PatchResult {
    pub success: bool,
    pub modified_content: Option<String>,
    /// Number of hunks actually spliced in (already-applied hunks excluded).
    pub applied_hunks: usize,
    pub total_lines_added: usize,
    pub total_lines_removed: usize,
    pub applied_with_fuzzy: bool,
    pub fuzzy_matching_strategy: Option<FuzzyStrategy>,
    pub error: Option<String>,
    pub conflicting_hunk: Option<ConflictingHunk>,
}

impl PatchResult {
    fn failure(
        error: String,
        hunk_index: usize,
        original_start: usize,
        partial: PartialCounts,
    ) -> Self {
        Self {
            success: false,
            modified_content: None,
            applied_hunks: partial.applied_hunks,
            total_lines_added: partial.added,
            total_lines_removed: partial.removed,
            applied_with_fuzzy: partial.used_fuzzy,
            fuzzy_matching_strategy: partial.strategy,
            error: Some(error),
            conflicting_hunk: Some(ConflictingHunk {
                hunk_index,
                original_start,
            }),
        }
    }
}

#[derive(Default, Clone, Copy)]
struct PartialCounts {
    applied_hunks: usize,
    added: usize,
    removed: usize,
    used_fuzzy: bool,
    strategy: Option<FuzzyStrategy>,
}

/// Apply `patch` to `original_content`.
///
/// Hunks apply strictly in order with an accumulated line offset; exact
/// placement is tried first, then (when `fuzzy` is set) the fallback
/// strategies in fixed order.  A hunk whose replacement already sits at its
/// target position is skipped, which makes a successful exact apply
/// idempotent.  The first hunk that no strategy can place aborts the apply
/// with `success = false` and no partial output.
pub fn apply_patch(original_content: &str, patch: &UnifiedDiff, fuzzy: bool) -> PatchResult {
    let ending = dominant_ending(original_content);
    let had_trailing_newline = original_content.is_empty()
        || original_content.ends_with('\n')
        || original_content.ends_with('\r');

    let mut lines = split_universal(original_content);
    let mut counts = PartialCounts::default();
    let mut offset: i64 = 0;

    for (idx, hunk) in patch.hunks.iter().enumerate() {
        let pattern = hunk.pattern_lines();
        let expected = expected_position(hunk, offset, lines.len());

        // Pure insertion — nothing to locate.
        if pattern.is_empty() {
            let replacement: Vec<String> = hunk
                .replacement_lines()
                .iter()
                .map(|s| s.to_string())
                .collect();
            let delta = replacement.len() as i64;
            lines.splice(expected..expected, replacement);
            counts.applied_hunks += 1;
            counts.added += hunk.added_count();
            offset += delta;
            continue;
        }

        if pattern.len() > lines.len() {
            return PatchResult::failure(
                format!(
                    "hunk {} needs {} lines but the file has {}",
                    idx + 1,
                    pattern.len(),
                    lines.len()
                ),
                idx,
                hunk.original_start,
                counts,
            );
        }

        // Exact placement at the declared position.
        if window_matches(&lines, expected, &pattern, str::eq) {
            splice_hunk(&mut lines, hunk, expected, 0);
            counts.applied_hunks += 1;
            counts.added += hunk.added_count();
            counts.removed += hunk.removed_count();
            offset += hunk.added_count() as i64 - hunk.removed_count() as i64;
            continue;
        }

        // Already applied: the replacement sits at the target position.
        let replacement = hunk.replacement_lines();
        if !replacement.is_empty() && window_matches(&lines, expected, &replacement, str::eq) {
            offset += hunk.added_count() as i64 - hunk.removed_count() as i64;
            continue;
        }

        if !fuzzy {
            return PatchResult::failure(
                format!(
                    "hunk {} does not match at line {}",
                    idx + 1,
                    hunk.original_start
                ),
                idx,
                hunk.original_start,
                counts,
            );
        }

        // Fallback strategies in fixed order; first winner places the hunk.
        let placed = place_whitespace_insensitive(&lines, expected, &pattern)
            .map(|pos| (pos, FuzzyStrategy::WhitespaceInsensitive))
            .or_else(|| {
                place_sliding_window(&lines, expected, &pattern)
                    .map(|pos| (pos, FuzzyStrategy::SlidingWindow))
            })
            .or_else(|| {
                place_collapsed_whitespace(&lines, expected, &pattern)
                    .map(|pos| (pos, FuzzyStrategy::CollapsedWhitespace))
            });

        match placed {
            Some((pos, strategy)) => {
                // Re-indent inserted lines when the file drifted from the
                // indentation the patch was written against.
                let delta = common_indent(&lines[pos..pos + pattern.len()]) as i64
                    - common_indent_refs(&pattern) as i64;
                splice_hunk(&mut lines, hunk, pos, delta);
                counts.applied_hunks += 1;
                counts.added += hunk.added_count();
                counts.removed += hunk.removed_count();
                counts.used_fuzzy = true;
                counts.strategy.get_or_insert(strategy);
                offset += hunk.added_count() as i64 - hunk.removed_count() as i64;
            }
            None => {
                return PatchResult::failure(
                    format!(
                        "hunk {} could not be placed (no strategy matched near line {})",
                        idx + 1,
                        hunk.original_start
                    ),
                    idx,
                    hunk.original_start,
                    counts,
                );
            }
        }
    }

    let mut content = lines.join(ending);
    if had_trailing_newline && !lines.is_empty() {
        content.push_str(ending);
    }

    PatchResult {
        success: true,
        modified_content: Some(content),
        applied_hunks: counts.applied_hunks,
        total_lines_added: counts.added,
        total_lines_removed: counts.removed,
        applied_with_fuzzy: counts.used_fuzzy,
        fuzzy_matching_strategy: counts.strategy,
        error: None,
        conflicting_hunk: None,
    }
}

/// 0-based splice position for a hunk after accounting for prior hunks.
///
/// A zero-length original side (`@@ -N,0 …`) means "insert after line N",
/// so the splice point is N itself rather than N-1.
fn expected_position(hunk: &DiffHunk, offset: i64, len: usize) -> usize {
    let pattern_len: usize = hunk
        .lines
        .iter()
        .filter(|l| l.kind != DiffLineKind::Added)
        .count();
    let declared = if pattern_len == 0 {
        hunk.original_start
    } else if hunk.original_start > 0 {
        hunk.original_start - 1
    } else {
        0
    };
    let pos = declared as i64 + offset;
    pos.clamp(0, len as i64) as usize
}

fn window_matches(
    lines: &[String],
    pos: usize,
    pattern: &[&str],
    eq: impl Fn(&str, &str) -> bool,
) -> bool {
    if pos + pattern.len() > lines.len() {
        return false;
    }
    pattern
        .iter()
        .enumerate()
        .all(|(i, p)| eq(lines[pos + i].as_str(), p))
}

/// Splice `hunk` in at `pos`.  Context lines keep the file's actual content
/// (preserving real indentation when a fuzzy strategy placed the hunk);
/// Added lines come from the patch, shifted by `indent_delta` spaces.
fn splice_hunk(lines: &mut Vec<String>, hunk: &DiffHunk, pos: usize, indent_delta: i64) {
    let mut new_section: Vec<String> = Vec::new();
    let mut cursor = pos;
    for line in &hunk.lines {
        match line.kind {
            DiffLineKind::Context => {
                new_section.push(lines[cursor].clone());
                cursor += 1;
            }
            DiffLineKind::Removed => {
                cursor += 1;
            }
            DiffLineKind::Added => {
                new_section.push(adjust_indent(&line.content, indent_delta));
            }
        }
    }
    lines.splice(pos..cursor, new_section);
}

/// Minimum leading-space count across non-empty lines.
fn common_indent(lines: &[String]) -> usize {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0)
}

fn common_indent_refs(lines: &[&str]) -> usize {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0)
}

/// Adjust leading spaces on `line` by `delta` (positive = add, negative = remove).
fn adjust_indent(line: &str, delta: i64) -> String {
    if delta == 0 || line.trim().is_empty() {
        return line.to_string();
    }
    if delta > 0 {
        format!("{}{line}", " ".repeat(delta as usize))
    } else {
        let remove = (-delta) as usize;
        if line.len() >= remove && line[..remove].bytes().all(|b| b == b' ') {
            line[remove..].to_string()
        } else {
            line.trim_start_matches(' ').to_string()
        }
    }
}

// ─── Fallback strategies ─────────────────────────────────────────────────────

fn place_whitespace_insensitive(lines: &[String], pos: usize, pattern: &[&str]) -> Option<usize> {
    let no_ws = |s: &str| s.split_whitespace().collect::<String>();
    window_matches(lines, pos, pattern, |a, b| no_ws(a) == no_ws(b)).then_some(pos)
}

fn place_sliding_window(lines: &[String], expected: usize, pattern: &[&str]) -> Option<usize> {
    let n = pattern.len();
    if lines.len() < n {
        return None;
    }
    let joined_pattern = pattern.join("\n");
    let mut hits: Vec<(f32, usize)> = Vec::new();
    for i in 0..=(lines.len() - n) {
        let window = lines[i..i + n].join("\n");
        let ratio = TextDiff::from_chars(joined_pattern.as_str(), window.as_str()).ratio();
        if ratio >= FUZZY_THRESHOLD {
            hits.push((ratio, i));
        }
    }
    pick_best(&hits, expected)
}

fn place_collapsed_whitespace(lines: &[String], expected: usize, pattern: &[&str]) -> Option<usize> {
    let n = pattern.len();
    if lines.len() < n {
        return None;
    }
    let collapse = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
    let norm_pattern: Vec<String> = pattern.iter().map(|s| collapse(s)).collect();
    let mut hits: Vec<(f32, usize)> = Vec::new();
    for i in 0..=(lines.len() - n) {
        let matches = norm_pattern
            .iter()
            .enumerate()
            .all(|(k, p)| collapse(&lines[i + k]) == *p);
        if matches {
            hits.push((1.0, i));
        }
    }
    pick_best(&hits, expected)
}

/// Highest ratio wins; equal-ratio ties resolve to the position closest to
/// the declared hunk location.
fn pick_best(hits: &[(f32, usize)], expected: usize) -> Option<usize> {
    let best_ratio = hits.iter().map(|(r, _)| *r).fold(f32::MIN, f32::max);
    hits.iter()
        .filter(|(r, _)| (r - best_ratio).abs() < 1e-6)
        .map(|(_, p)| *p)
        .min_by_key(|&p| (p as i64 - expected as i64).unsigned_abs())
}

fn dominant_ending(content: &str) -> &'static str {
    let total = content.matches('\n').count();
    let crlf = content.matches("\r\n").count();
    if crlf > total - crlf {
        "\r\n"
    } else {
        "\n"
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::generate_diff;
    use crate::model::UnifiedDiff;

    fn patch_of(original: &str, modified: &str) -> UnifiedDiff {
        let d = generate_diff(original, modified, "a", "b");
        // Round-trip through text so tests exercise the parser too.
        UnifiedDiff::parse(&d.format()).unwrap()
    }

    #[test]
    fn exact_apply_round_trips() {
        let a = "one\ntwo\nthree\nfour\nfive\n";
        let b = "one\ntwo\nTHREE\nfour\nfive\n";
        let r = apply_patch(a, &patch_of(a, b), false);
        assert!(r.success, "{:?}", r.error);
        assert_eq!(r.modified_content.as_deref(), Some(b));
        assert!(!r.applied_with_fuzzy);
        assert_eq!(r.total_lines_added, 1);
        assert_eq!(r.total_lines_removed, 1);
    }

    #[test]
    fn multi_hunk_apply_round_trips() {
        let mut a = String::new();
        for i in 1..=30 {
            a.push_str(&format!("line{i}\n"));
        }
        let b = a.replace("line3\n", "LINE3\n").replace("line27\n", "LINE27\nline27b\n");
        let r = apply_patch(&a, &patch_of(&a, &b), false);
        assert!(r.success, "{:?}", r.error);
        assert_eq!(r.modified_content.as_deref(), Some(b.as_str()));
        assert_eq!(r.applied_hunks, 2);
    }

    #[test]
    fn empty_original_round_trips() {
        let b = "alpha\nbeta\n";
        let r = apply_patch("", &patch_of("", b), false);
        assert!(r.success, "{:?}", r.error);
        assert_eq!(r.modified_content.as_deref(), Some(b));
        assert_eq!(r.total_lines_added, 2);
    }

    #[test]
    fn reapplying_same_patch_yields_no_further_changes() {
        let a = "one\ntwo\nthree\n";
        let b = "one\nTWO\nthree\n";
        let patch = patch_of(a, b);
        let first = apply_patch(a, &patch, false);
        let applied = first.modified_content.unwrap();
        let second = apply_patch(&applied, &patch, false);
        assert!(second.success, "{:?}", second.error);
        assert_eq!(second.modified_content.as_deref(), Some(applied.as_str()));
        assert_eq!(second.applied_hunks, 0);
        assert_eq!(second.total_lines_added, 0);
    }

    #[test]
    fn whitespace_drift_needs_fuzzy() {
        // The file drifted to double-spaced indentation; the patch was
        // written against the single-spaced version.
        let file = "fn demo() {\n    if (x)  {\n        go();\n    }\n}\n";
        let patch_text = "--- a\n+++ b\n@@ -2,1 +2,1 @@\n-if (x) {\n+if (y) {\n";
        let patch = UnifiedDiff::parse(patch_text).unwrap();

        let strict = apply_patch(file, &patch, false);
        assert!(!strict.success);
        assert_eq!(strict.conflicting_hunk.unwrap().hunk_index, 0);

        let fuzzy = apply_patch(file, &patch, true);
        assert!(fuzzy.success, "{:?}", fuzzy.error);
        assert!(fuzzy.applied_with_fuzzy);
        assert_eq!(
            fuzzy.fuzzy_matching_strategy,
            Some(FuzzyStrategy::WhitespaceInsensitive)
        );
        // The inserted line picks up the file's real indentation.
        assert!(fuzzy.modified_content.unwrap().contains("    if (y) {"));
    }

    #[test]
    fn adjust_indent_shifts_added_lines() {
        assert_eq!(adjust_indent("x", 2), "  x");
        assert_eq!(adjust_indent("    x", -2), "  x");
        assert_eq!(adjust_indent("", 4), "", "blank lines stay blank");
        // Removing more spaces than exist falls back to a full trim.
        assert_eq!(adjust_indent(" x", -4), "x");
    }

    #[test]
    fn sliding_window_finds_drifted_location() {
        let file = "prefix\nprefix2\nalpha\nbeta\ngamma\nsuffix\n";
        // Patch claims the block is at line 1, but it actually sits at line 3.
        let patch_text = "--- a\n+++ b\n@@ -1,3 +1,3 @@\n alpha\n-beta\n+BETA\n gamma\n";
        let patch = UnifiedDiff::parse(patch_text).unwrap();
        let r = apply_patch(file, &patch, true);
        assert!(r.success, "{:?}", r.error);
        assert!(r.applied_with_fuzzy);
        assert!(r.modified_content.unwrap().contains("BETA"));
    }

    #[test]
    fn conflict_reports_failing_hunk() {
        let file = "completely\ndifferent\ncontent\n";
        let patch_text = "--- a\n+++ b\n@@ -1,2 +1,2 @@\n nothing like this\n-exists here\n+at all\n";
        let patch = UnifiedDiff::parse(patch_text).unwrap();
        let r = apply_patch(file, &patch, true);
        assert!(!r.success);
        assert!(r.modified_content.is_none());
        let conflict = r.conflicting_hunk.unwrap();
        assert_eq!(conflict.hunk_index, 0);
        assert_eq!(conflict.original_start, 1);
        assert!(r.error.unwrap().contains("hunk 1"));
    }

    #[test]
    fn crlf_content_keeps_crlf_on_output() {
        let a = "one\r\ntwo\r\nthree\r\n";
        let b = "one\r\nTWO\r\nthree\r\n";
        let patch_text = "--- a\n+++ b\n@@ -1,3 +1,3 @@\n one\n-two\n+TWO\n three\n";
        let patch = UnifiedDiff::parse(patch_text).unwrap();
        let r = apply_patch(a, &patch, false);
        assert!(r.success, "{:?}", r.error);
        assert_eq!(r.modified_content.as_deref(), Some(b));
    }

    #[test]
    fn collapsed_whitespace_strategy_is_last_resort() {
        // Internal double spaces defeat trim()-based matching at the declared
        // position AND the window similarity stays below 0.85, but collapsing
        // whitespace runs matches.
        let file = "aaaaaaaaaaaaaaaaaaaa\nx    =    compute( a,    b )\nzzzzzzzzzzzzzzzzzzzz\n";
        let patch_text = "--- a\n+++ b\n@@ -4,1 +4,1 @@\n-x = compute( a, b )\n+x = compute(a, b)\n";
        let patch = UnifiedDiff::parse(patch_text).unwrap();
        let r = apply_patch(file, &patch, true);
        assert!(r.success, "{:?}", r.error);
        assert!(r.applied_with_fuzzy);
        assert_eq!(
            r.fuzzy_matching_strategy,
            Some(FuzzyStrategy::CollapsedWhitespace)
        );
        assert!(r.modified_content.unwrap().contains("x = compute(a, b)"));
    }

    #[test]
    fn fuzzy_context_lines_keep_file_indentation() {
        let file = "    start\n    middle\n    end\n";
        let patch_text = "--- a\n+++ b\n@@ -1,3 +1,3 @@\n start\n-middle\n+CHANGED\n end\n";
        let patch = UnifiedDiff::parse(patch_text).unwrap();
        let r = apply_patch(file, &patch, true);
        assert!(r.success, "{:?}", r.error);
        let out = r.modified_content.unwrap();
        assert!(out.contains("    start\n"), "context indent lost: {out:?}");
        assert!(out.contains("    end\n"));
    }

    #[test]
    fn pure_insertion_hunk_inserts_at_declared_line() {
        let file = "a\nb\nc\n";
        let patch_text = "--- a\n+++ b\n@@ -1,0 +2,1 @@\n+inserted\n";
        let patch = UnifiedDiff::parse(patch_text).unwrap();
        let r = apply_patch(file, &patch, false);
        assert!(r.success, "{:?}", r.error);
        assert_eq!(r.modified_content.as_deref(), Some("a\ninserted\nb\nc\n"));
    }
}

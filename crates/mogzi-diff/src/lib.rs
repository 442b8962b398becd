// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Unified-diff model, generator, parser, and the fuzzy patch applicator.
//!
//! The model types mirror the conventional unified-diff text format exactly:
//! what `format` writes, `parse` reads back, and `generate_diff` produces
//! hunks whose line accounting always satisfies
//! `original_length == |Context| + |Removed|` and
//! `modified_length == |Context| + |Added|`.

mod apply;
mod generate;
mod model;

pub use apply::{apply_patch, ConflictingHunk, FuzzyStrategy, PatchResult};
pub use generate::{generate_diff, generate_diff_with_context};
pub use model::{DiffHunk, DiffLine, DiffLineKind, PatchError, UnifiedDiff};

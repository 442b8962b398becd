// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod edit;
mod grep;
mod list_dir;
mod patch;
mod read_file;
mod read_pdf;
mod shell;
mod write_file;

pub use edit::ReplaceTool;
pub use grep::SearchFileContentTool;
pub use list_dir::ListDirectoryTool;
pub use patch::{ApplyCodePatchTool, GenerateCodePatchTool, PreviewPatchApplicationTool};
pub use read_file::ReadTextFileTool;
pub use read_pdf::ReadPdfFileTool;
pub use shell::RunShellCommandTool;
pub use write_file::WriteFileTool;

use crate::ToolRegistry;

/// Register the complete built-in tool suite.
pub fn register_builtin(registry: &mut ToolRegistry) {
    registry.register(ReadTextFileTool);
    registry.register(ReadPdfFileTool);
    registry.register(WriteFileTool);
    registry.register(ReplaceTool);
    registry.register(ListDirectoryTool);
    registry.register(SearchFileContentTool);
    registry.register(RunShellCommandTool::new());
    registry.register(ApplyCodePatchTool);
    registry.register(GenerateCodePatchTool);
    registry.register(PreviewPatchApplicationTool);
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

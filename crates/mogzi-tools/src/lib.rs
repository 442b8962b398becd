// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! The local tool suite and its wire format.
//!
//! Every tool resolves paths against an injected working directory, never
//! throws past its boundary, and has its outcome rendered into a single
//! `<tool_response>` XML document by the registry.

pub mod builtin;
mod registry;
mod response;
mod tool;
mod workdir;

pub use registry::{RegisteredSchema, ToolRegistry};
pub use response::{contains_tool_response, display_diff, ToolResponse, ToolResponseInfo, ToolStatus};
pub use tool::{
    is_edit_tool, is_write_tool, Tool, ToolCall, ToolContext, ToolError, ToolErrorKind,
    ToolSuccess,
};
pub use workdir::resolve_in_workdir;

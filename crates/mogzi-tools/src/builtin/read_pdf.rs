// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::tool::{
    require_str, Tool, ToolCall, ToolContext, ToolError, ToolErrorKind, ToolSuccess,
};
use crate::workdir::resolve_in_workdir;

pub struct ReadPdfFileTool;

#[async_trait]
impl Tool for ReadPdfFileTool {
    fn name(&self) -> &str {
        "read_pdf_file"
    }

    fn description(&self) -> &str {
        "Extract the text of a PDF file, one '--- Page N ---' section per \
         page. The path must be absolute."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "absolute_path": {
                    "type": "string",
                    "description": "Absolute path to the PDF file"
                }
            },
            "required": ["absolute_path"]
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
        let raw_path = require_str(&call.args, "absolute_path")?;
        if !std::path::Path::new(raw_path).is_absolute() {
            return Err(ToolError::invalid_args(format!(
                "'absolute_path' must be absolute, got '{raw_path}'"
            )));
        }
        let path = resolve_in_workdir(&ctx.working_dir, raw_path)?;

        debug!(path = %path.display(), "read_pdf_file tool");

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::not_found(format!("no such file: {}", path.display()))
            } else {
                ToolError::new(ToolErrorKind::ExecutionFailed, format!("read error: {e}"))
            }
        })?;

        if !bytes.starts_with(b"%PDF-") {
            return Err(ToolError::invalid_args(format!(
                "{} is not a PDF file (missing %PDF- header)",
                path.display()
            )));
        }

        // Parsing is CPU-bound; keep it off the event loop.
        let extraction = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| {
            ToolError::new(ToolErrorKind::ExecutionFailed, format!("task error: {e}"))
        })?;

        let (text, page_count) = match extraction {
            Ok(pages) => {
                let count = pages.len();
                let text = pages
                    .iter()
                    .enumerate()
                    .map(|(i, page)| format!("--- Page {} ---\n{}", i + 1, page.trim_end()))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                (text, count)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "pdf text extraction failed");
                (
                    format!("[unable to extract text from {}: {e}]", path.display()),
                    0,
                )
            }
        };

        let checksum = hex::encode(Sha256::digest(text.as_bytes()));
        Ok(ToolSuccess {
            notes: Some(format!(
                "extracted {page_count} page(s) from {}",
                path.display()
            )),
            absolute_path: Some(path),
            sha256_checksum: Some(checksum),
            original_checksum: None,
            content_on_disk: Some(text),
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

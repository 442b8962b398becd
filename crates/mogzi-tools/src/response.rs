// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The tool-response wire format.
//!
//! Every tool outcome — success or failure — is rendered into one XML
//! document:
//!
//! ```xml
//! <tool_response tool_name="write_file">
//!   <notes>wrote 42 bytes</notes>
//!   <result status="SUCCESS" absolute_path="/w/a.txt" sha256_checksum="…" />
//!   <content_on_disk>…</content_on_disk>
//! </tool_response>
//! ```
//!
//! The same document is parsed back out of streamed model text by
//! [`ToolResponseInfo::parse`].

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use mogzi_diff::{generate_diff, UnifiedDiff};

use crate::tool::{ToolError, ToolSuccess};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolStatus {
    #[default]
    Success,
    Failed,
}

impl ToolStatus {
    fn as_wire(&self) -> &'static str {
        match self {
            ToolStatus::Success => "SUCCESS",
            ToolStatus::Failed => "FAILED",
        }
    }
}

/// A tool outcome ready for serialization.
#[derive(Debug, Clone, Default)]
pub struct ToolResponse {
    pub tool_name: String,
    pub status: ToolStatus,
    pub notes: Option<String>,
    pub absolute_path: Option<String>,
    pub sha256_checksum: Option<String>,
    pub original_checksum: Option<String>,
    pub content_on_disk: Option<String>,
    pub error: Option<String>,
}

impl ToolResponse {
    pub fn from_success(tool_name: &str, ok: ToolSuccess) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            status: ToolStatus::Success,
            notes: ok.notes,
            absolute_path: ok.absolute_path.map(|p| p.display().to_string()),
            sha256_checksum: ok.sha256_checksum,
            original_checksum: ok.original_checksum,
            content_on_disk: ok.content_on_disk,
            error: None,
        }
    }

    pub fn from_error(tool_name: &str, err: &ToolError) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            status: ToolStatus::Failed,
            error: Some(err.to_string()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ToolStatus::Failed
    }

    /// Serialize to the wire document.  All interpolated text is XML-escaped.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "<tool_response tool_name=\"{}\">\n",
            escape(&self.tool_name)
        ));
        if let Some(notes) = &self.notes {
            out.push_str(&format!("  <notes>{}</notes>\n", escape(notes)));
        }
        out.push_str(&format!("  <result status=\"{}\"", self.status.as_wire()));
        if let Some(p) = &self.absolute_path {
            out.push_str(&format!(" absolute_path=\"{}\"", escape(p)));
        }
        if let Some(c) = &self.sha256_checksum {
            out.push_str(&format!(" sha256_checksum=\"{}\"", escape(c)));
        }
        if let Some(c) = &self.original_checksum {
            out.push_str(&format!(" original_checksum=\"{}\"", escape(c)));
        }
        out.push_str(" />\n");
        if let Some(content) = &self.content_on_disk {
            out.push_str(&format!(
                "  <content_on_disk>{}</content_on_disk>\n",
                escape(content)
            ));
        }
        if let Some(error) = &self.error {
            out.push_str(&format!("  <error>{}</error>\n", escape(error)));
        }
        out.push_str("</tool_response>");
        out
    }
}

/// What the display layer extracts back out of a tool-response document.
#[derive(Debug, Clone, Default)]
pub struct ToolResponseInfo {
    pub tool_name: String,
    pub status: ToolStatus,
    pub description: Option<String>,
    /// The `<notes>` text.
    pub summary: Option<String>,
    pub error_message: Option<String>,
    pub file_path: Option<String>,
    /// The `<content_on_disk>` text.
    pub new_content: Option<String>,
    pub raw_response: String,
}

impl ToolResponseInfo {
    /// Extract and parse the first `<tool_response>…</tool_response>`
    /// document found in `text`.  Status defaults to Success when the result
    /// element is missing; any `<error>` element forces Failed.
    pub fn parse(text: &str) -> Option<Self> {
        let start = text.find("<tool_response")?;
        let end_tag = "</tool_response>";
        let end = text[start..].find(end_tag)? + start + end_tag.len();
        let doc = &text[start..end];

        let mut info = ToolResponseInfo {
            raw_response: doc.to_string(),
            ..Default::default()
        };

        let mut reader = Reader::from_str(doc);
        let mut current: Option<&'static str> = None;
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"tool_response" => {
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_value().ok()?;
                            match attr.key.as_ref() {
                                b"tool_name" => info.tool_name = value.into_owned(),
                                b"description" => info.description = Some(value.into_owned()),
                                _ => {}
                            }
                        }
                    }
                    b"result" => {
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_value().ok()?;
                            match attr.key.as_ref() {
                                b"status" => {
                                    info.status = if value == "FAILED" {
                                        ToolStatus::Failed
                                    } else {
                                        ToolStatus::Success
                                    };
                                }
                                b"absolute_path" => info.file_path = Some(value.into_owned()),
                                _ => {}
                            }
                        }
                    }
                    b"notes" => current = Some("notes"),
                    b"content_on_disk" => current = Some("content"),
                    b"error" => current = Some("error"),
                    _ => {}
                },
                Ok(Event::Text(t)) => {
                    if let Some(slot) = current {
                        let text = t.unescape().ok()?.into_owned();
                        match slot {
                            "notes" => info.summary = Some(text),
                            "content" => info.new_content = Some(text),
                            "error" => info.error_message = Some(text),
                            _ => {}
                        }
                    }
                }
                Ok(Event::End(_)) => current = None,
                Ok(Event::Eof) => break,
                Err(_) => return None,
                _ => {}
            }
        }

        if info.error_message.is_some() {
            info.status = ToolStatus::Failed;
        }
        Some(info)
    }
}

/// True when streamed text carries tool-response markup.
pub fn contains_tool_response(text: &str) -> bool {
    text.contains("<tool_response") || text.contains("</tool_response>")
}

/// Build the display diff for a file-modification tool.
///
/// - both sides known and different → a real diff
/// - no original but new content → a diff against the empty file
/// - anything else → nothing to show
pub fn display_diff(
    original: Option<&str>,
    new: Option<&str>,
    file_path: &str,
) -> Option<UnifiedDiff> {
    match (original, new) {
        (Some(a), Some(b)) if a != b => Some(generate_diff(a, b, file_path, file_path)),
        (None, Some(b)) => Some(generate_diff("", b, file_path, file_path)),
        _ => None,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

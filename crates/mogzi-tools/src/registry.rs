// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use mogzi_config::ToolApprovals;

use crate::response::ToolResponse;
use crate::tool::{Tool, ToolCall, ToolContext, ToolError, ToolErrorKind};

/// A tool schema forwarded to the model provider.
#[derive(Debug, Clone)]
pub struct RegisteredSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Central registry holding all available tools.
///
/// This is the single boundary where tool outcomes become tool-response XML:
/// `execute` never returns an error, only a document with SUCCESS or FAILED
/// status.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Produce schemas for all registered tools, name-sorted for stable
    /// request payloads.
    pub fn schemas(&self) -> Vec<RegisteredSchema> {
        let mut schemas: Vec<RegisteredSchema> = self
            .tools
            .values()
            .map(|t| RegisteredSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Execute a call and render the outcome as a tool-response document.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResponse {
        let Some(tool) = self.tools.get(&call.name) else {
            let err = ToolError::invalid_args(format!("unknown tool: {}", call.name));
            return ToolResponse::from_error(&call.name, &err);
        };

        if ctx.approvals == ToolApprovals::Readonly && !tool.read_only() {
            let err = ToolError::new(
                ToolErrorKind::PermissionDenied,
                format!(
                    "tool '{}' mutates the filesystem and is unavailable under readonly approvals",
                    call.name
                ),
            );
            return ToolResponse::from_error(&call.name, &err);
        }

        debug!(tool = %call.name, call_id = %call.id, "executing tool");
        match tool.execute(call, ctx).await {
            Ok(ok) => ToolResponse::from_success(&call.name, ok),
            Err(err) => ToolResponse::from_error(&call.name, &err),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::tool::ToolSuccess;

    struct EchoTool {
        name: &'static str,
        mutating: bool,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        fn read_only(&self) -> bool {
            !self.mutating
        }
        async fn execute(
            &self,
            call: &ToolCall,
            _ctx: &ToolContext,
        ) -> Result<ToolSuccess, ToolError> {
            Ok(ToolSuccess::with_notes(format!("echo:{}", call.args)))
        }
    }

    fn ctx(approvals: ToolApprovals) -> ToolContext {
        ToolContext::new(std::env::temp_dir(), approvals)
    }

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: "1".into(),
            name: name.into(),
            args: json!({}),
        }
    }

    #[tokio::test]
    async fn execute_known_tool_renders_success_document() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool {
            name: "echo",
            mutating: false,
        });
        let response = reg.execute(&call("echo"), &ctx(ToolApprovals::All)).await;
        assert!(!response.is_error());
        assert!(response.to_xml().contains("tool_name=\"echo\""));
    }

    #[tokio::test]
    async fn unknown_tool_renders_failed_document() {
        let reg = ToolRegistry::new();
        let response = reg.execute(&call("missing"), &ctx(ToolApprovals::All)).await;
        assert!(response.is_error());
        assert!(response.to_xml().contains("unknown tool"));
    }

    #[tokio::test]
    async fn readonly_blocks_mutating_tools() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool {
            name: "writer",
            mutating: true,
        });
        let response = reg
            .execute(&call("writer"), &ctx(ToolApprovals::Readonly))
            .await;
        assert!(response.is_error());
        assert!(response.error.unwrap().contains("PermissionDenied"));
    }

    #[tokio::test]
    async fn readonly_allows_read_only_tools() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool {
            name: "reader",
            mutating: false,
        });
        let response = reg
            .execute(&call("reader"), &ctx(ToolApprovals::Readonly))
            .await;
        assert!(!response.is_error());
    }

    #[test]
    fn schemas_are_name_sorted() {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool {
            name: "zeta",
            mutating: false,
        });
        reg.register(EchoTool {
            name: "alpha",
            mutating: false,
        });
        let schemas = reg.schemas();
        assert_eq!(schemas[0].name, "alpha");
        assert_eq!(schemas[1].name, "zeta");
    }
}

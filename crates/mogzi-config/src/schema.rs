// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Startup-fatal configuration problems.
///
/// Tool-level failures are never represented here — they surface as FAILED
/// tool responses.  This error only covers the profile/provider selection
/// that happens once, before the terminal loop starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown profile '{0}' (no such entry under `profiles:`)")]
    UnknownProfile(String),
    #[error("profile '{0}' has an empty provider")]
    EmptyProvider(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model used when no `--profile` is given and no `default_profile` is set.
    #[serde(default)]
    pub model: ModelConfig,
    /// Named profiles selectable with `--profile <name>`.
    ///
    /// ```yaml
    /// profiles:
    ///   work:
    ///     provider: anthropic
    ///     name: claude-opus-4-5
    ///     api_key_env: WORK_ANTHROPIC_KEY
    /// ```
    #[serde(default)]
    pub profiles: HashMap<String, ModelConfig>,
    /// Profile selected when `--profile` is absent.
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub tui: TuiConfig,
}

impl Config {
    /// Resolve the effective model configuration for an optional profile name.
    ///
    /// Precedence: explicit `name` → `default_profile` → top-level `model`.
    pub fn resolve_profile(&self, name: Option<&str>) -> Result<(String, ModelConfig), ConfigError> {
        let wanted = name.or(self.default_profile.as_deref());
        let (label, model) = match wanted {
            Some(p) => {
                let m = self
                    .profiles
                    .get(p)
                    .ok_or_else(|| ConfigError::UnknownProfile(p.to_string()))?;
                (p.to_string(), m.clone())
            }
            None => ("default".to_string(), self.model.clone()),
        };
        if model.provider.trim().is_empty() {
            return Err(ConfigError::EmptyProvider(label));
        }
        Ok((label, model))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider identifier, e.g. "openai" | "anthropic" | "mock".
    pub provider: String,
    /// Model name forwarded to the provider API.
    pub name: String,
    /// Environment variable that holds the API key (read at runtime).
    pub api_key_env: Option<String>,
    /// Base URL override for proxies and local servers.
    pub base_url: Option<String>,
    /// Maximum tokens to request in a single completion.
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0–2.0).
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            name: "gpt-4o".into(),
            api_key_env: None,
            base_url: None,
            max_tokens: Some(4096),
            temperature: Some(0.2),
        }
    }
}

fn default_session_list_limit() -> Option<usize> {
    Some(20)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of sessions shown by `/session list` and `--status`.
    /// Absent → 20.  Zero → unlimited.
    #[serde(default = "default_session_list_limit")]
    pub list_limit: Option<usize>,
}

impl SessionConfig {
    /// The effective listing cap: `None` means unlimited.
    pub fn effective_list_limit(&self) -> Option<usize> {
        match self.list_limit {
            None => Some(20),
            Some(0) => None,
            Some(n) => Some(n),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            list_limit: default_session_list_limit(),
        }
    }
}

/// Which tools the user has pre-approved for autonomous execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ToolApprovals {
    /// Only read-only tools run; mutation tools and unwhitelisted shell
    /// commands are refused.
    Readonly,
    /// All tools run without prompting.
    All,
}

impl std::fmt::Display for ToolApprovals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolApprovals::Readonly => write!(f, "readonly"),
            ToolApprovals::All => write!(f, "all"),
        }
    }
}

/// Interactive chat loop vs. a single prompt-and-exit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Oneshot,
    Chat,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Oneshot => write!(f, "oneshot"),
            SessionMode::Chat => write!(f, "chat"),
        }
    }
}

fn default_tool_approvals() -> ToolApprovals {
    ToolApprovals::Readonly
}
fn default_shell_timeout_secs() -> u64 {
    120
}
fn default_read_limit() -> usize {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Default approval mode when `--tool-approvals` is absent.
    #[serde(default = "default_tool_approvals")]
    pub approvals: ToolApprovals,
    /// Timeout in seconds for a single shell command.
    #[serde(default = "default_shell_timeout_secs")]
    pub shell_timeout_secs: u64,
    /// Default line/character cap for `read_text_file`.
    #[serde(default = "default_read_limit")]
    pub read_limit: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            approvals: default_tool_approvals(),
            shell_timeout_secs: default_shell_timeout_secs(),
            read_limit: default_read_limit(),
        }
    }
}

fn default_refresh_ms() -> u64 {
    80
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuiConfig {
    /// Dynamic-footer refresh interval in milliseconds (80 ms ≈ 12 Hz).
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

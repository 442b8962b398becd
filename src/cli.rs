// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::Parser;
use std::path::PathBuf;

use mogzi_config::{SessionMode, ToolApprovals};

#[derive(Parser, Debug)]
#[command(
    name = "mogzi",
    about = "An interactive terminal assistant with local tools and durable sessions",
    version,
    long_about = None,
)]
pub struct Cli {
    /// Prompt to run in oneshot mode (ignored in chat mode)
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Load an existing session by id or case-insensitive name
    #[arg(long, value_name = "ID-OR-NAME")]
    pub session: Option<String>,

    /// Run a single prompt and exit, or start the interactive chat loop
    #[arg(long, value_enum, default_value = "chat")]
    pub mode: SessionMode,

    /// Named profile from the config file's `profiles:` table
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Which tools may run without prompting
    #[arg(long, value_enum)]
    pub tool_approvals: Option<ToolApprovals>,

    /// Path to config file (overrides auto-discovery)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Print profile, model, and session status, then exit
    #[arg(long)]
    pub status: bool,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Tracing filter directive for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_chat_mode_without_session() {
        let cli = Cli::parse_from(["mogzi"]);
        assert_eq!(cli.mode, SessionMode::Chat);
        assert!(cli.session.is_none());
        assert!(cli.tool_approvals.is_none());
        assert_eq!(cli.log_filter(), "info");
    }

    #[test]
    fn oneshot_with_prompt() {
        let cli = Cli::parse_from(["mogzi", "--mode", "oneshot", "list the files"]);
        assert_eq!(cli.mode, SessionMode::Oneshot);
        assert_eq!(cli.prompt.as_deref(), Some("list the files"));
    }

    #[test]
    fn session_and_profile_flags() {
        let cli = Cli::parse_from([
            "mogzi",
            "--session",
            "My Chat",
            "--profile",
            "work",
            "--tool-approvals",
            "readonly",
        ]);
        assert_eq!(cli.session.as_deref(), Some("My Chat"));
        assert_eq!(cli.profile.as_deref(), Some("work"));
        assert_eq!(cli.tool_approvals, Some(ToolApprovals::Readonly));
    }

    #[test]
    fn verbosity_raises_filter() {
        let cli = Cli::parse_from(["mogzi", "-vv"]);
        assert_eq!(cli.log_filter(), "trace");
    }
}

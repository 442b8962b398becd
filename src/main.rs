// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use mogzi_config::{Config, ModelConfig, SessionMode, ToolApprovals};
use mogzi_core::{AgentEvent, EnvInfo, Orchestrator};
use mogzi_model::{MockProvider, ModelProvider};
use mogzi_session::{default_session_root, list_sessions, SessionStore};
use mogzi_tools::{builtin::register_builtin, ToolContext, ToolRegistry};
use mogzi_tui::App;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("mogzi: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_filter())?;

    let config = mogzi_config::load(cli.config.as_deref())?;
    let (profile_label, model_config) = config.resolve_profile(cli.profile.as_deref())?;
    let approvals = cli.tool_approvals.unwrap_or(config.tools.approvals);
    let session_root = default_session_root();

    if cli.status {
        print_status(&config, &profile_label, &model_config, approvals, &session_root)?;
        return Ok(());
    }

    let provider = provider_for(&model_config)?;
    let store = match &cli.session {
        Some(id_or_name) => SessionStore::load(&session_root, id_or_name)
            .with_context(|| format!("loading session '{id_or_name}'"))?,
        None => SessionStore::create_new(&session_root)?,
    };

    let working_dir = std::env::current_dir().context("resolving working directory")?;
    let mut registry = ToolRegistry::new();
    register_builtin(&mut registry);

    let mut tool_ctx = ToolContext::new(working_dir.clone(), approvals);
    tool_ctx.shell_timeout_secs = config.tools.shell_timeout_secs;
    tool_ctx.read_limit = config.tools.read_limit;

    let env = EnvInfo::detect(&working_dir, cli.mode, approvals);
    let orchestrator = Orchestrator::new(provider, Arc::new(registry), tool_ctx, env, store);

    match cli.mode {
        SessionMode::Oneshot => {
            let prompt = cli
                .prompt
                .clone()
                .context("oneshot mode needs a prompt argument")?;
            run_oneshot(orchestrator, &prompt).await
        }
        SessionMode::Chat => {
            let app = App::new(
                std::io::stdout(),
                orchestrator,
                working_dir,
                session_root,
                config.session.effective_list_limit(),
                profile_label,
                model_config.name.clone(),
                approvals,
                config.tui.refresh_ms,
            );
            app.run().await
        }
    }
}

/// Resolve the model backend for the selected profile.
///
/// Network adapters live outside this binary; the built-in `mock` provider
/// covers offline use and tests.  Anything else is a configuration error,
/// fatal at startup.
fn provider_for(model: &ModelConfig) -> anyhow::Result<Arc<dyn ModelProvider>> {
    match model.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider)),
        other => anyhow::bail!(
            "provider '{other}' has no adapter in this build; \
             set `model.provider: mock` or select a profile that uses it"
        ),
    }
}

/// Run a single prompt through the same engine and print the final reply.
async fn run_oneshot(mut orchestrator: Orchestrator, prompt: &str) -> anyhow::Result<()> {
    let prompt = prompt.to_string();
    let (tx, mut rx) = mpsc::channel(256);
    let (_cancel_tx, cancel_rx) = oneshot::channel();
    let submit = tokio::spawn(async move {
        let result = orchestrator.submit(&prompt, tx, cancel_rx).await;
        (orchestrator, result)
    });

    let mut final_text = String::new();
    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::AssistantUpdate(text) => final_text = text,
            AgentEvent::ToolFinished { info, .. } => {
                if let Some(summary) = info.summary {
                    eprintln!("[{}] {summary}", info.tool_name);
                }
            }
            AgentEvent::Error(message) => eprintln!("{message}"),
            _ => {}
        }
    }
    let (_orchestrator, result) = submit.await?;
    result?;
    println!("{final_text}");
    Ok(())
}

fn print_status(
    config: &Config,
    profile_label: &str,
    model: &ModelConfig,
    approvals: ToolApprovals,
    session_root: &std::path::Path,
) -> anyhow::Result<()> {
    println!("profile:        {profile_label}");
    println!("provider:       {}", model.provider);
    println!("model:          {}", model.name);
    println!("tool approvals: {approvals}");
    println!("session root:   {}", session_root.display());
    let sessions = list_sessions(session_root, config.session.effective_list_limit())?;
    println!("sessions:       {}", sessions.len());
    for session in sessions {
        println!(
            "  {}  {}  ({} messages)",
            session.id, session.name, session.message_count
        );
    }
    Ok(())
}

/// Tracing goes to a log file so the terminal stays clean.
fn init_logging(filter: &str) -> anyhow::Result<()> {
    let log_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mogzi")
        .join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("mogzi.log"))?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

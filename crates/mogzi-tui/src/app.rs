// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The event loop.
//!
//! One logical loop multiplexes three flows: keyboard events from the
//! crossterm event stream, display events from the streaming orchestrator,
//! and the dynamic render task repainting the bottom area on a fixed
//! cadence.  All shared state lives behind one mutex and is only mutated
//! from the loop; the render task reads it.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use mogzi_config::ToolApprovals;
use mogzi_core::{AgentEvent, Orchestrator, WrittenTail};
use mogzi_diff::UnifiedDiff;
use mogzi_session::{list_sessions, SessionStore};
use mogzi_tools::ToolResponseInfo;

use crate::commands::{self, CommandOutcome};
use crate::components::{compose_dynamic, ViewModel};
use crate::input::{InputContext, InputState};
use crate::providers::{
    AutocompleteEngine, FilePathProvider, SelectionAction, SessionListProvider,
    SlashCommandProvider, UserSelectionProvider,
};
use crate::state::ChatState;
use crate::terminal::{shared, ScrollbackTerminal, SharedTerminal};

/// State shared between the event loop and the dynamic render task.
pub struct ViewState {
    pub input: InputContext,
    pub state: ChatState,
    pub has_history: bool,
    pub current_tool: Option<String>,
    pub ai_started: Option<Instant>,
    pub frame: usize,
    pub footer: String,
    pub selection_title: Option<String>,
}

impl ViewState {
    fn new() -> Self {
        Self {
            input: InputContext::new(),
            state: ChatState::Input,
            has_history: false,
            current_tool: None,
            ai_started: None,
            frame: 0,
            footer: String::new(),
            selection_title: None,
        }
    }
}

/// Build the frame provider handed to the dynamic render task.
pub fn view_provider(view: Arc<Mutex<ViewState>>) -> impl FnMut() -> Vec<String> + Send {
    move || {
        let mut vs = view.lock().unwrap();
        vs.frame = vs.frame.wrapping_add(1);
        let elapsed = vs.ai_started.map(|t| t.elapsed().as_secs()).unwrap_or(0);
        let model = ViewModel {
            state: vs.state,
            has_history: vs.has_history,
            input: &vs.input,
            current_tool: vs.current_tool.as_deref(),
            elapsed_secs: elapsed,
            frame: vs.frame,
            footer: &vs.footer,
            selection_title: vs.selection_title.as_deref(),
        };
        compose_dynamic(&model)
    }
}

pub struct App<W: Write + Send + 'static> {
    terminal: SharedTerminal<W>,
    view: Arc<Mutex<ViewState>>,
    engine: AutocompleteEngine,
    orchestrator: Option<Orchestrator>,
    selection: Option<Box<dyn UserSelectionProvider>>,
    cancel_tx: Option<oneshot::Sender<()>>,
    /// Latest streamed assistant text; becomes permanent on TurnComplete.
    stream_text: Option<String>,
    session_root: PathBuf,
    list_limit: Option<usize>,
    profile_label: String,
    model_label: String,
    approvals: ToolApprovals,
    refresh_ms: u64,
    shutdown: bool,
}

impl<W: Write + Send + 'static> App<W> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        out: W,
        orchestrator: Orchestrator,
        working_dir: PathBuf,
        session_root: PathBuf,
        list_limit: Option<usize>,
        profile_label: String,
        model_label: String,
        approvals: ToolApprovals,
        refresh_ms: u64,
    ) -> Self {
        let mut engine = AutocompleteEngine::new();
        engine.register(SlashCommandProvider);
        engine.register(FilePathProvider::new(working_dir));

        let view = Arc::new(Mutex::new(ViewState::new()));
        view.lock().unwrap().has_history = !orchestrator.history().is_empty();

        let mut app = Self {
            terminal: shared(ScrollbackTerminal::new(out)),
            view,
            engine,
            orchestrator: Some(orchestrator),
            selection: None,
            cancel_tx: None,
            stream_text: None,
            session_root,
            list_limit,
            profile_label,
            model_label,
            approvals,
            refresh_ms,
            shutdown: false,
        };
        app.update_footer();
        app
    }

    pub fn view(&self) -> Arc<Mutex<ViewState>> {
        self.view.clone()
    }

    pub fn terminal(&self) -> SharedTerminal<W> {
        self.terminal.clone()
    }

    pub fn orchestrator(&self) -> Option<&Orchestrator> {
        self.orchestrator.as_ref()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Run until Ctrl+C or `/exit`.
    pub async fn run(mut self) -> anyhow::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        self.terminal.lock().unwrap().initialize()?;

        let (stop_render, render_cancel) = watch::channel(false);
        let render_task = tokio::spawn(crate::terminal::start_dynamic_display(
            self.terminal.clone(),
            view_provider(self.view.clone()),
            render_cancel,
            self.refresh_ms,
        ));

        let mut keys = EventStream::new();
        let mut agent_rx: Option<mpsc::Receiver<AgentEvent>> = None;
        let mut submit_task: Option<JoinHandle<Orchestrator>> = None;

        while !self.shutdown {
            tokio::select! {
                maybe_key = keys.next() => {
                    match maybe_key {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            if let Some(text) = self.handle_key(key) {
                                let (task, rx) = self.start_submit(text);
                                submit_task = Some(task);
                                agent_rx = Some(rx);
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => warn!("terminal event error: {e}"),
                        None => break,
                    }
                }
                Some(event) = recv_agent(&mut agent_rx) => {
                    self.handle_agent_event(event);
                }
                result = join_submit(&mut submit_task), if submit_task.is_some() => {
                    submit_task = None;
                    // Drain any display events still in flight.
                    if let Some(mut rx) = agent_rx.take() {
                        while let Ok(event) = rx.try_recv() {
                            self.handle_agent_event(event);
                        }
                    }
                    match result {
                        Ok(orchestrator) => self.orchestrator = Some(orchestrator),
                        Err(e) => warn!("submit task failed: {e}"),
                    }
                    self.cancel_tx = None;
                    self.set_state(ChatState::Input);
                }
            }
        }

        let _ = stop_render.send(true);
        let _ = render_task.await;
        self.terminal.lock().unwrap().shutdown()?;
        crossterm::terminal::disable_raw_mode()?;
        Ok(())
    }

    // ── Keyboard ─────────────────────────────────────────────────────────────

    /// Handle one key press.  Returns the text of a submission that should
    /// go to the orchestrator.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<String> {
        // Global bindings first.
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                self.shutdown = true;
                return None;
            }
            (KeyModifiers::CONTROL, KeyCode::Char('l')) => {
                self.clear_all();
                return None;
            }
            _ => {}
        }

        let busy = self.view.lock().unwrap().state.is_busy();
        if busy {
            // Only Esc acts while the stream runs: it cancels the operation.
            if key.code == KeyCode::Esc {
                if let Some(cancel) = self.cancel_tx.take() {
                    let _ = cancel.send(());
                }
            }
            return None;
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('p')) => self.key_up(),
            (KeyModifiers::CONTROL, KeyCode::Char('n')) => self.key_down(),
            (_, KeyCode::Up) => self.key_up(),
            (_, KeyCode::Down) => self.key_down(),
            (_, KeyCode::Left) => self.edit(|input| input.move_left()),
            (_, KeyCode::Right) => self.edit(|input| input.move_right()),
            (_, KeyCode::Home) => self.edit(|input| input.move_home()),
            (_, KeyCode::End) => self.edit(|input| input.move_end()),
            (_, KeyCode::Backspace) => self.edit_and_refresh(|input| input.backspace()),
            (_, KeyCode::Delete) => self.edit_and_refresh(|input| input.delete()),
            (_, KeyCode::Tab) => {
                let mut vs = self.view.lock().unwrap();
                if vs.input.show_suggestions {
                    self.engine.accept(&mut vs.input);
                }
                None
            }
            (_, KeyCode::Esc) => {
                self.key_esc();
                None
            }
            (_, KeyCode::Enter) => self.key_enter(),
            (modifiers, KeyCode::Char(c)) if !modifiers.contains(KeyModifiers::CONTROL) => {
                self.edit_and_refresh(|input| input.insert_char(c))
            }
            _ => None,
        }
    }

    fn edit(&mut self, f: impl FnOnce(&mut InputContext)) -> Option<String> {
        let mut vs = self.view.lock().unwrap();
        f(&mut vs.input);
        None
    }

    fn edit_and_refresh(&mut self, f: impl FnOnce(&mut InputContext)) -> Option<String> {
        let mut vs = self.view.lock().unwrap();
        f(&mut vs.input);
        self.engine.refresh(&mut vs.input);
        None
    }

    fn key_up(&mut self) -> Option<String> {
        let mut vs = self.view.lock().unwrap();
        if vs.input.show_suggestions {
            vs.input.suggestion_prev();
        } else {
            vs.input.history_up();
        }
        None
    }

    fn key_down(&mut self) -> Option<String> {
        let mut vs = self.view.lock().unwrap();
        if vs.input.show_suggestions {
            vs.input.suggestion_next();
        } else {
            vs.input.history_down();
        }
        None
    }

    fn key_esc(&mut self) {
        let mut vs = self.view.lock().unwrap();
        match vs.input.state {
            InputState::Autocomplete => vs.input.dismiss_suggestions(),
            InputState::UserSelection => {
                vs.input.leave_user_selection();
                vs.selection_title = None;
                drop(vs);
                self.selection = None;
            }
            InputState::Normal => vs.input.clear(),
        }
    }

    fn key_enter(&mut self) -> Option<String> {
        let mut vs = self.view.lock().unwrap();
        match vs.input.state {
            InputState::UserSelection => {
                let picked = vs.input.selected_item().map(|i| i.value.clone());
                vs.input.leave_user_selection();
                vs.selection_title = None;
                drop(vs);
                if let (Some(value), Some(provider)) = (picked, self.selection.take()) {
                    match provider.on_selection(&value) {
                        SelectionAction::LoadSession(id) => self.load_session(&id),
                        SelectionAction::Dismiss => {}
                    }
                }
                None
            }
            InputState::Autocomplete if vs.input.show_suggestions => {
                self.engine.accept(&mut vs.input);
                None
            }
            _ => {
                let submission = vs.input.take_submission()?;
                drop(vs);
                self.dispatch(submission)
            }
        }
    }

    // ── Slash commands ───────────────────────────────────────────────────────

    /// Handle a submitted line locally; returns `Some(text)` when the input
    /// must go to the model instead.
    pub fn dispatch(&mut self, text: String) -> Option<String> {
        match commands::process(&text) {
            CommandOutcome::NotACommand => return Some(text),
            CommandOutcome::Help => {
                self.write_permanent(commands::help_lines());
            }
            CommandOutcome::Exit => {
                self.shutdown = true;
            }
            CommandOutcome::Clear => {
                self.clear_all();
            }
            CommandOutcome::Status => {
                let lines = self.status_lines();
                self.write_permanent(lines);
            }
            CommandOutcome::SessionList => {
                self.open_session_list();
            }
            CommandOutcome::SessionClear => {
                if let Some(orchestrator) = self.orchestrator.as_mut() {
                    orchestrator.clear_transcript();
                }
                self.view.lock().unwrap().has_history = false;
                self.write_permanent(vec!["Session history cleared.".to_string()]);
            }
            CommandOutcome::SessionRename(name) => {
                if let Some(orchestrator) = self.orchestrator.as_mut() {
                    if let Err(e) = orchestrator.store_mut().rename(&name) {
                        warn!("rename failed: {e}");
                        self.write_permanent(vec![format!("Rename failed: {e}")]);
                        return None;
                    }
                }
                self.update_footer();
                self.write_permanent(vec![format!("Session renamed to \"{name}\".")]);
            }
            CommandOutcome::Unknown(command) => {
                let message = format!("Unknown command: {command}");
                if let Some(orchestrator) = self.orchestrator.as_mut() {
                    orchestrator.add_assistant_note(&message);
                }
                self.write_permanent(vec![message]);
            }
        }
        None
    }

    fn open_session_list(&mut self) {
        let limit = self.list_limit;
        let sessions = match list_sessions(&self.session_root, limit) {
            Ok(sessions) => sessions,
            Err(e) => {
                self.write_permanent(vec![format!("Cannot list sessions: {e}")]);
                return;
            }
        };
        let entries: Vec<(String, String)> = sessions
            .iter()
            .map(|s| {
                (
                    s.id.to_string(),
                    format!("{} ({} messages)", s.name, s.message_count),
                )
            })
            .collect();
        let provider = SessionListProvider::new(entries);
        let mut vs = self.view.lock().unwrap();
        vs.selection_title = Some(provider.title().to_string());
        vs.input.enter_user_selection(provider.selections());
        drop(vs);
        self.selection = Some(Box::new(provider));
    }

    fn load_session(&mut self, id: &str) {
        let store = match SessionStore::load(&self.session_root, id) {
            Ok(store) => store,
            Err(e) => {
                self.write_permanent(vec![format!("Cannot load session: {e}")]);
                return;
            }
        };
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            orchestrator.replace_session(store);
            let name = orchestrator.store().session().name.clone();
            let transcript = render_transcript(orchestrator);
            {
                let mut terminal = self.terminal.lock().unwrap();
                let _ = terminal.reset();
            }
            self.view.lock().unwrap().has_history = !transcript.is_empty();
            self.write_permanent(vec![format!("Loaded session \"{name}\".")]);
            if !transcript.is_empty() {
                self.write_permanent(transcript);
            }
            self.update_footer();
        }
    }

    fn clear_all(&mut self) {
        if let Some(orchestrator) = self.orchestrator.as_mut() {
            orchestrator.clear_transcript();
        }
        {
            let mut terminal = self.terminal.lock().unwrap();
            let _ = terminal.reset();
        }
        let mut vs = self.view.lock().unwrap();
        vs.has_history = false;
        vs.input.clear();
    }

    // ── Orchestrator plumbing ────────────────────────────────────────────────

    fn start_submit(&mut self, text: String) -> (JoinHandle<Orchestrator>, mpsc::Receiver<AgentEvent>) {
        self.write_permanent(vec![format!("you> {text}")]);
        let (tx, rx) = mpsc::channel(256);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.cancel_tx = Some(cancel_tx);
        self.stream_text = None;
        self.set_state(ChatState::Thinking);
        self.view.lock().unwrap().has_history = true;

        let mut orchestrator = self
            .orchestrator
            .take()
            .expect("no submit may start while one is in flight");
        let task = tokio::spawn(async move {
            if let Err(e) = orchestrator.submit(&text, tx, cancel_rx).await {
                warn!("submit failed: {e}");
            }
            orchestrator
        });
        (task, rx)
    }

    /// Apply one orchestrator display event.
    pub fn handle_agent_event(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::AssistantUpdate(text) => {
                let lines: Vec<String> =
                    text.lines().map(|l| format!("mogzi> {l}")).collect();
                self.stream_text = Some(text);
                let mut terminal = self.terminal.lock().unwrap();
                let _ = terminal.write_static(&lines, true);
            }
            AgentEvent::Activity(activity) => {
                let mut vs = self.view.lock().unwrap();
                vs.state = vs.state.on_activity(activity);
            }
            AgentEvent::ToolStarted { label, .. } => {
                self.view.lock().unwrap().current_tool = Some(label);
            }
            AgentEvent::ToolFinished {
                info,
                display_diff,
                written_tail,
                ..
            } => {
                // Streamed text so far becomes permanent before the block.
                self.flush_stream_text();
                let block = tool_block(&info, &display_diff, &written_tail);
                self.write_permanent(block);
                self.view.lock().unwrap().current_tool = None;
            }
            AgentEvent::Usage { .. } => {
                self.update_footer();
            }
            AgentEvent::Cancelled { during_tool } => {
                self.flush_stream_text();
                let message = if during_tool {
                    "⚠ Tool execution cancelled."
                } else {
                    "⚠ Request cancelled."
                };
                self.write_permanent(vec![message.to_string()]);
                self.set_state(ChatState::Input);
            }
            AgentEvent::Error(message) => {
                self.flush_stream_text();
                self.write_permanent(vec![message]);
                self.set_state(ChatState::Input);
            }
            AgentEvent::TurnComplete => {
                self.flush_stream_text();
                self.set_state(ChatState::Input);
            }
        }
    }

    /// Turn the current updatable block into permanent scrollback.
    fn flush_stream_text(&mut self) {
        if let Some(text) = self.stream_text.take() {
            let lines: Vec<String> = text.lines().map(|l| format!("mogzi> {l}")).collect();
            self.write_permanent(lines);
        }
    }

    fn set_state(&mut self, state: ChatState) {
        let mut vs = self.view.lock().unwrap();
        match state {
            ChatState::Input => {
                vs.ai_started = None;
                vs.current_tool = None;
            }
            _ => {
                if vs.ai_started.is_none() {
                    vs.ai_started = Some(Instant::now());
                }
            }
        }
        vs.state = state;
    }

    fn write_permanent(&self, lines: Vec<String>) {
        let mut terminal = self.terminal.lock().unwrap();
        let _ = terminal.write_static(&lines, false);
    }

    fn update_footer(&mut self) {
        let (session_name, input_tokens, output_tokens) = match self.orchestrator.as_ref() {
            Some(orchestrator) => {
                let session = orchestrator.store().session();
                (
                    session.name.clone(),
                    session.usage_metrics.input_tokens,
                    session.usage_metrics.output_tokens,
                )
            }
            None => ("…".to_string(), 0, 0),
        };
        self.view.lock().unwrap().footer = format!(
            "{} · {} · approvals:{} · {} · tokens {}↑/{}↓",
            self.profile_label,
            self.model_label,
            self.approvals,
            session_name,
            input_tokens,
            output_tokens
        );
    }

    fn status_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Status:".to_string(),
            format!("  profile        {}", self.profile_label),
            format!("  model          {}", self.model_label),
            format!("  tool approvals {}", self.approvals),
        ];
        if let Some(orchestrator) = self.orchestrator.as_ref() {
            let session = orchestrator.store().session();
            lines.push(format!("  session        {} ({})", session.name, session.id));
            lines.push(format!(
                "  tokens         {} in / {} out",
                session.usage_metrics.input_tokens, session.usage_metrics.output_tokens
            ));
        }
        lines
    }
}

/// The loaded transcript rendered for the static log.
fn render_transcript(orchestrator: &Orchestrator) -> Vec<String> {
    orchestrator
        .store()
        .session()
        .history
        .iter()
        .filter_map(|record| match record.role {
            mogzi_model::Role::User => Some(format!("you> {}", record.content)),
            mogzi_model::Role::Assistant => Some(format!("mogzi> {}", record.content)),
            _ => None,
        })
        .collect()
}

/// The static display block for a finished tool (clean style; the diff is a
/// separate block below the summary).
fn tool_block(
    info: &ToolResponseInfo,
    diff: &Option<UnifiedDiff>,
    tail: &Option<WrittenTail>,
) -> Vec<String> {
    let mut lines = Vec::new();
    let marker = if info.status == mogzi_tools::ToolStatus::Failed {
        "✗"
    } else {
        "✓"
    };
    lines.push(format!("{marker} {}", info.tool_name));
    if let Some(summary) = &info.summary {
        lines.push(format!("  {summary}"));
    }
    if let Some(error) = &info.error_message {
        lines.push(format!("  error: {error}"));
    }
    if let Some(diff) = diff {
        lines.push(String::new());
        lines.extend(diff.format().lines().map(|l| format!("  {l}")));
    }
    if let Some(tail) = tail {
        lines.push(String::new());
        if let Some(banner) = &tail.banner {
            lines.push(format!("  ({banner})"));
        }
        lines.extend(tail.tail.lines().map(|l| format!("  {l}")));
    }
    lines
}

async fn recv_agent(rx: &mut Option<mpsc::Receiver<AgentEvent>>) -> Option<AgentEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn join_submit(
    task: &mut Option<JoinHandle<Orchestrator>>,
) -> Result<Orchestrator, tokio::task::JoinError> {
    task.as_mut().expect("guarded by select condition").await
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

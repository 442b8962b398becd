// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use mogzi_model::{
    CompletionRequest, FunctionCall, Message, MessageContent, ModelProvider, ResponseEvent, Role,
    ToolSchema,
};
use mogzi_session::{HistoryManager, SessionStore};
use mogzi_tools::{
    contains_tool_response, display_diff, is_edit_tool, is_write_tool, resolve_in_workdir,
    ToolCall, ToolContext, ToolRegistry, ToolResponseInfo,
};

use crate::envinfo::{environment_preamble, EnvInfo};
use crate::events::{AgentEvent, StreamActivity, WrittenTail};
use crate::prompts::system_prompt;

/// Upper bound on model → tool → model rounds for a single submit.
const MAX_TOOL_ROUNDS: u32 = 50;

/// Lines of written content shown after a write-type tool.
const WRITE_TAIL_LINES: usize = 50;

/// Maximum characters of the key argument shown in the tool progress label.
const ARG_SUMMARY_CHARS: usize = 25;

/// Drives one submit → finalize cycle: streams the model response, executes
/// tool calls locally, maintains the two function-call maps, and emits
/// display events.  All mutation happens on the caller's event loop.
pub struct Orchestrator {
    model: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    tool_ctx: ToolContext,
    env: EnvInfo,
    history: HistoryManager,
    store: SessionStore,
    /// call_id → tool name, for resolving function results.
    call_names: HashMap<String, String>,
    /// call_id → file content captured before an edit-type tool ran.
    pre_edit: HashMap<String, String>,
    current_tool_name: Option<String>,
    ai_operation_start: Option<Instant>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ModelProvider>,
        tools: Arc<ToolRegistry>,
        tool_ctx: ToolContext,
        env: EnvInfo,
        store: SessionStore,
    ) -> Self {
        Self {
            model,
            tools,
            tool_ctx,
            env,
            history: HistoryManager::new(),
            store,
            call_names: HashMap::new(),
            pre_edit: HashMap::new(),
            current_tool_name: None,
            ai_operation_start: None,
        }
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryManager {
        &mut self.history
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    /// Clear the in-memory transcript and the persisted history together.
    pub fn clear_transcript(&mut self) {
        let Self { history, store, .. } = self;
        history.clear(store);
    }

    /// Record a locally produced assistant message (slash-command output,
    /// diagnostics) in the transcript and on disk.
    pub fn add_assistant_note(&mut self, text: &str) {
        self.history
            .add_assistant(&mut self.store, Message::assistant(text));
    }

    /// Record a user message without submitting it to the model.
    pub fn add_user_message(&mut self, text: &str) {
        self.history.add_user(&mut self.store, Message::user(text));
    }

    /// Switch to another session: the store is replaced and the transcript
    /// re-seeded from its persisted records.
    pub fn replace_session(&mut self, store: SessionStore) {
        let messages = store
            .session()
            .history
            .iter()
            .map(|r| Message {
                role: r.role,
                content: MessageContent::Text(r.content.clone()),
            })
            .collect();
        self.store = store;
        self.history.seed_completed(messages);
    }

    pub fn current_tool_name(&self) -> Option<&str> {
        self.current_tool_name.as_deref()
    }

    /// Seconds since the active AI operation started.
    pub fn ai_elapsed_secs(&self) -> u64 {
        self.ai_operation_start
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Run one full submit cycle for a non-slash user input.
    ///
    /// The unmodified `user_text` goes into history and onto the screen; the
    /// request sent to the provider carries the environment preamble appended
    /// to the user message.  Cancellation is observed at every stream chunk
    /// and around every tool execution.
    pub async fn submit(
        &mut self,
        user_text: &str,
        tx: mpsc::Sender<AgentEvent>,
        mut cancel: oneshot::Receiver<()>,
    ) -> anyhow::Result<()> {
        self.ai_operation_start = Some(Instant::now());
        self.call_names.clear();
        self.pre_edit.clear();

        let user = Message::user(user_text);
        self.history.add_user(&mut self.store, user);

        let mut rounds = 0u32;
        loop {
            rounds += 1;
            if rounds > MAX_TOOL_ROUNDS {
                let note = format!("Reached the maximum of {MAX_TOOL_ROUNDS} tool rounds.");
                self.history
                    .add_assistant(&mut self.store, Message::assistant(&note));
                let _ = tx.send(AgentEvent::Error(note)).await;
                break;
            }

            let turn = match self.stream_one_turn(&tx, &mut cancel).await? {
                TurnOutcome::Cancelled => return Ok(()),
                TurnOutcome::Failed => break,
                TurnOutcome::Completed(turn) => turn,
            };

            // Commit the streamed assistant text before any tool blocks.
            self.history.finalize_streaming(&mut self.store);

            if turn.tool_calls.is_empty() {
                break;
            }

            for call in &turn.tool_calls {
                if self.run_tool_call(call, &tx, &mut cancel).await.is_none() {
                    // Cancelled mid-tool; history already updated.
                    return Ok(());
                }
            }
        }

        self.finish(&tx).await;
        Ok(())
    }

    async fn finish(&mut self, tx: &mpsc::Sender<AgentEvent>) {
        self.history.finalize_streaming(&mut self.store);
        self.current_tool_name = None;
        self.ai_operation_start = None;
        let _ = tx.send(AgentEvent::TurnComplete).await;
    }

    /// Stream a single model turn, accumulating text and tool calls.
    async fn stream_one_turn(
        &mut self,
        tx: &mpsc::Sender<AgentEvent>,
        cancel: &mut oneshot::Receiver<()>,
    ) -> anyhow::Result<TurnOutcome> {
        let req = self.build_request();
        let mut stream = match self.model.complete(req).await {
            Ok(s) => s,
            Err(e) => {
                self.surface_error(tx, &e.to_string()).await;
                return Ok(TurnOutcome::Failed);
            }
        };

        let mut full_text = String::new();
        let mut pending_calls: HashMap<u32, PendingToolCall> = HashMap::new();
        let mut activity = StreamActivity::Thinking;
        let _ = tx.send(AgentEvent::Activity(activity)).await;

        loop {
            // Every awaited chunk is a cancellation point.
            let event = tokio::select! {
                biased;
                _ = &mut *cancel => {
                    self.record_cancellation(tx, &full_text, false).await;
                    return Ok(TurnOutcome::Cancelled);
                }
                ev = stream.next() => ev,
            };
            let Some(event) = event else { break };

            match event {
                Ok(ResponseEvent::TextDelta(delta)) if !delta.is_empty() => {
                    if full_text.is_empty() {
                        self.history.begin_pending(Message::assistant(""));
                    }
                    full_text.push_str(&delta);
                    self.history.update_last_pending(&full_text);

                    let next_activity = if contains_tool_response(&full_text) {
                        StreamActivity::ToolExecution
                    } else {
                        StreamActivity::Thinking
                    };
                    if next_activity != activity {
                        activity = next_activity;
                        let _ = tx.send(AgentEvent::Activity(activity)).await;
                    }
                    let _ = tx.send(AgentEvent::AssistantUpdate(full_text.clone())).await;
                }
                Ok(ResponseEvent::TextDelta(_)) => {}
                Ok(ResponseEvent::ToolCall {
                    index,
                    id,
                    name,
                    arguments,
                }) => {
                    if activity != StreamActivity::ToolExecution {
                        activity = StreamActivity::ToolExecution;
                        let _ = tx.send(AgentEvent::Activity(activity)).await;
                    }
                    let slot = pending_calls.entry(index).or_default();
                    if !id.is_empty() {
                        slot.id = id;
                    }
                    if !name.is_empty() {
                        slot.name = name;
                    }
                    slot.args_buf.push_str(&arguments);
                }
                Ok(ResponseEvent::Usage {
                    input_tokens,
                    output_tokens,
                    cache_read_tokens,
                    cache_write_tokens,
                }) => {
                    self.store.record_usage(
                        input_tokens,
                        output_tokens,
                        cache_read_tokens,
                        cache_write_tokens,
                    );
                    let metrics = &self.store.session().usage_metrics;
                    let _ = tx
                        .send(AgentEvent::Usage {
                            input_tokens: metrics.input_tokens,
                            output_tokens: metrics.output_tokens,
                        })
                        .await;
                }
                Ok(ResponseEvent::Done) => break,
                Ok(ResponseEvent::Error(e)) => {
                    warn!("model stream warning: {e}");
                }
                Err(e) => {
                    self.surface_error(tx, &e.to_string()).await;
                    return Ok(TurnOutcome::Failed);
                }
            }
        }

        // Flush accumulated tool calls in parallel-index order.  Calls with
        // an empty name cannot be dispatched and are dropped.
        let mut sorted: Vec<(u32, PendingToolCall)> = pending_calls.into_iter().collect();
        sorted.sort_by_key(|(idx, _)| *idx);
        let mut tool_calls = Vec::new();
        for (i, (_, pending)) in sorted.into_iter().enumerate() {
            if pending.name.is_empty() {
                warn!(call_id = %pending.id, "dropping tool call with empty name");
                continue;
            }
            tool_calls.push(pending.finish(i));
        }

        Ok(TurnOutcome::Completed(Turn { tool_calls }))
    }

    /// Execute one tool call end to end.  Returns `None` when the user
    /// cancelled while the tool was running.
    async fn run_tool_call(
        &mut self,
        call: &ToolCall,
        tx: &mpsc::Sender<AgentEvent>,
        cancel: &mut oneshot::Receiver<()>,
    ) -> Option<()> {
        self.call_names.insert(call.id.clone(), call.name.clone());

        // Snapshot the file before edit-type tools run, so the display diff
        // can show what actually changed.
        if is_edit_tool(&call.name) {
            let content = self.read_call_target(&call.args).unwrap_or_default();
            self.pre_edit.insert(call.id.clone(), content);
        }

        let label = summarize_tool_call(&call.name, &call.args);
        self.current_tool_name = Some(label.clone());
        let _ = tx
            .send(AgentEvent::ToolStarted {
                call_id: call.id.clone(),
                label,
            })
            .await;

        // Record the assistant's tool request in the transcript.
        self.history.add_message(
            &mut self.store,
            Message {
                role: Role::Assistant,
                content: MessageContent::ToolCall {
                    tool_call_id: call.id.clone(),
                    function: FunctionCall {
                        name: call.name.clone(),
                        arguments: call.args.to_string(),
                    },
                },
            },
        );

        // Dropping the execution future on cancel kills shell process groups
        // (kill_on_drop + setsid inside the shell tool).
        let outcome = tokio::select! {
            biased;
            _ = &mut *cancel => None,
            response = self.tools.execute(call, &self.tool_ctx) => Some(response),
        };
        let Some(response) = outcome else {
            self.record_tool_cancellation(tx).await;
            return None;
        };

        let xml = response.to_xml();
        // Resolve the tool name through the call map, as a malformed document
        // may omit it.
        let tool_name = self
            .call_names
            .get(&call.id)
            .cloned()
            .unwrap_or_else(|| call.name.clone());
        let info = ToolResponseInfo::parse(&xml).unwrap_or_else(|| ToolResponseInfo {
            tool_name,
            raw_response: xml.clone(),
            ..Default::default()
        });

        let display = if is_edit_tool(&call.name) {
            let pre = self.pre_edit.get(&call.id).cloned().unwrap_or_default();
            let post = self.read_call_target(&call.args);
            let path = info
                .file_path
                .clone()
                .unwrap_or_else(|| "file".to_string());
            display_diff(Some(&pre), post.as_deref(), &path)
        } else {
            None
        };

        let written_tail = if is_write_tool(&call.name) {
            info.new_content
                .as_deref()
                .map(|c| WrittenTail::from_content(c, WRITE_TAIL_LINES))
        } else {
            None
        };

        self.history
            .add_message(&mut self.store, Message::tool_result(&call.id, &xml));

        debug!(tool = %call.name, failed = response.is_error(), "tool finished");
        let _ = tx
            .send(AgentEvent::ToolFinished {
                call_id: call.id.clone(),
                info,
                display_diff: display,
                written_tail,
            })
            .await;

        Some(())
    }

    /// Current content of the file a tool call targets, if any.
    fn read_call_target(&self, args: &serde_json::Value) -> Option<String> {
        let raw = args
            .get("path")
            .or_else(|| args.get("absolute_path"))
            .and_then(|v| v.as_str())?;
        let path = resolve_in_workdir(&self.tool_ctx.working_dir, raw).ok()?;
        std::fs::read_to_string(path).ok()
    }

    fn build_request(&self) -> CompletionRequest {
        let schemas: Vec<ToolSchema> = self
            .tools
            .schemas()
            .into_iter()
            .map(|s| ToolSchema {
                name: s.name,
                description: s.description,
                parameters: s.parameters,
            })
            .collect();

        let mut messages = vec![Message::system(system_prompt(None, &self.tools.names()))];
        messages.extend(self.history.get_for_ai());

        // The environment preamble reaches the model only; history and the
        // display keep the user's original text.
        if let Some(last_user) = messages.iter_mut().rev().find(|m| m.role == Role::User) {
            let original = last_user.display_text();
            *last_user = Message::user(format!(
                "{original}\n\n{}",
                environment_preamble(&self.env)
            ));
        }

        CompletionRequest {
            messages,
            tools: schemas,
            stream: true,
        }
    }

    async fn record_cancellation(
        &mut self,
        tx: &mpsc::Sender<AgentEvent>,
        partial_text: &str,
        during_tool: bool,
    ) {
        if !partial_text.is_empty() {
            self.history.update_last_pending(partial_text);
        }
        self.history.finalize_streaming(&mut self.store);
        let message = if during_tool {
            "⚠ Tool execution cancelled."
        } else {
            "⚠ Request cancelled."
        };
        self.history
            .add_assistant(&mut self.store, Message::assistant(message));
        self.current_tool_name = None;
        self.ai_operation_start = None;
        let _ = tx.send(AgentEvent::Cancelled { during_tool }).await;
    }

    async fn record_tool_cancellation(&mut self, tx: &mpsc::Sender<AgentEvent>) {
        self.record_cancellation(tx, "", true).await;
    }

    async fn surface_error(&mut self, tx: &mpsc::Sender<AgentEvent>, error: &str) {
        let message = format!("Error processing input: {error}");
        self.history.finalize_streaming(&mut self.store);
        self.history
            .add_assistant(&mut self.store, Message::assistant(&message));
        self.current_tool_name = None;
        self.ai_operation_start = None;
        let _ = tx.send(AgentEvent::Error(message)).await;
    }
}

enum TurnOutcome {
    Completed(Turn),
    Cancelled,
    Failed,
}

struct Turn {
    tool_calls: Vec<ToolCall>,
}

#[derive(Default)]
struct PendingToolCall {
    id: String,
    name: String,
    args_buf: String,
}

impl PendingToolCall {
    /// Always resolve to a JSON object; a malformed argument buffer becomes
    /// `{}` rather than poisoning the whole turn.
    fn finish(self, index: usize) -> ToolCall {
        let args = if self.args_buf.is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&self.args_buf).unwrap_or_else(|e| {
                warn!(
                    tool = %self.name,
                    error = %e,
                    "invalid tool-call arguments from model; substituting {{}}"
                );
                serde_json::Value::Object(Default::default())
            })
        };
        let id = if self.id.is_empty() {
            format!("call_synthetic_{index}")
        } else {
            self.id
        };
        ToolCall {
            id,
            name: self.name,
            args,
        }
    }
}

/// Progress label for a running tool: `"{tool} → {key argument}"`, where the
/// key argument is the most informative of command/path/pattern, truncated
/// to 25 characters.
pub fn summarize_tool_call(name: &str, args: &serde_json::Value) -> String {
    let key_arg = ["command", "absolute_path", "path", "pattern"]
        .iter()
        .find_map(|k| args.get(*k).and_then(|v| v.as_str()));
    match key_arg {
        Some(value) => {
            let summary: String = value.chars().take(ARG_SUMMARY_CHARS).collect();
            let summary = if value.chars().count() > ARG_SUMMARY_CHARS {
                format!("{summary}…")
            } else {
                summary
            };
            format!("{name} → {summary}")
        }
        None => name.to_string(),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use mogzi_config::{SessionMode, ToolApprovals};
    use mogzi_model::{ResponseEvent, ScriptedMockProvider};
    use mogzi_tools::builtin::register_builtin;

    fn harness(
        provider: ScriptedMockProvider,
    ) -> (tempfile::TempDir, Orchestrator, Arc<ScriptedMockProvider>) {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(provider);
        let mut registry = ToolRegistry::new();
        register_builtin(&mut registry);
        let store = SessionStore::create_new(&dir.path().join("chats")).unwrap();
        let workdir = dir.path().join("work");
        std::fs::create_dir_all(&workdir).unwrap();
        let env = EnvInfo::detect(&workdir, SessionMode::Chat, ToolApprovals::All);
        let orch = Orchestrator::new(
            provider.clone(),
            Arc::new(registry),
            ToolContext::new(workdir, ToolApprovals::All),
            env,
            store,
        );
        (dir, orch, provider)
    }

    async fn drain(mut rx: mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        events
    }

    fn open_cancel() -> (oneshot::Sender<()>, oneshot::Receiver<()>) {
        oneshot::channel()
    }

    #[tokio::test]
    async fn text_only_reply_streams_and_persists() {
        let (_d, mut orch, _p) = harness(ScriptedMockProvider::always_text("hello there"));
        let (tx, rx) = mpsc::channel(64);
        let (_keep, cancel) = open_cancel();
        orch.submit("hi", tx, cancel).await.unwrap();
        let events = drain(rx).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, AgentEvent::AssistantUpdate(t) if t == "hello there")));
        assert!(matches!(events.last(), Some(AgentEvent::TurnComplete)));

        let history = orch.store().session().history.clone();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hi");
        assert_eq!(history[1].content, "hello there");
    }

    #[tokio::test]
    async fn environment_preamble_reaches_model_but_not_history() {
        let (_d, mut orch, provider) = harness(ScriptedMockProvider::always_text("ok"));
        let (tx, rx) = mpsc::channel(64);
        let (_keep, cancel) = open_cancel();
        orch.submit("what is this machine?", tx, cancel).await.unwrap();
        drain(rx).await;

        let seen = provider.last_request.lock().unwrap();
        let messages = &seen.as_ref().unwrap().messages;
        let user_text = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .unwrap()
            .display_text();
        assert!(user_text.starts_with("what is this machine?"));
        assert!(user_text.contains("[environment]"));
        assert!(user_text.contains("working_directory:"));

        assert_eq!(orch.store().session().history[0].content, "what is this machine?");
    }

    #[tokio::test]
    async fn tool_call_executes_and_emits_display_events() {
        let (dir, mut orch, _p) = harness(ScriptedMockProvider::tool_then_text(
            "tc-1",
            "write_file",
            &json!({"path": "out.txt", "content": "written by tool"}).to_string(),
            "done",
        ));
        let (tx, rx) = mpsc::channel(64);
        let (_keep, cancel) = open_cancel();
        orch.submit("write a file", tx, cancel).await.unwrap();
        let events = drain(rx).await;

        assert_eq!(
            std::fs::read_to_string(dir.path().join("work/out.txt")).unwrap(),
            "written by tool"
        );
        assert!(events.iter().any(
            |e| matches!(e, AgentEvent::ToolStarted { label, .. } if label.starts_with("write_file → out.txt"))
        ));
        let finished = events.iter().find_map(|e| match e {
            AgentEvent::ToolFinished { info, written_tail, .. } => {
                Some((info.clone(), written_tail.clone()))
            }
            _ => None,
        });
        let (info, tail) = finished.expect("ToolFinished event");
        assert_eq!(info.tool_name, "write_file");
        assert_eq!(tail.unwrap().tail, "written by tool");

        // Transcript carries the tool response document.
        let history = &orch.store().session().history;
        assert!(history
            .iter()
            .any(|r| r.role == Role::Tool && r.content.contains("<tool_response")));
    }

    #[tokio::test]
    async fn edit_tool_produces_display_diff_from_pre_edit_snapshot() {
        let (dir, mut orch, _p) = harness(ScriptedMockProvider::tool_then_text(
            "tc-1",
            "replace",
            &json!({"path": "code.txt", "old_string": "old", "new_string": "new"}).to_string(),
            "edited",
        ));
        std::fs::write(dir.path().join("work/code.txt"), "keep\nold\nkeep\n").unwrap();
        let (tx, rx) = mpsc::channel(64);
        let (_keep, cancel) = open_cancel();
        orch.submit("edit it", tx, cancel).await.unwrap();
        let events = drain(rx).await;

        let diff = events
            .iter()
            .find_map(|e| match e {
                AgentEvent::ToolFinished { display_diff, .. } => display_diff.clone(),
                _ => None,
            })
            .expect("display diff");
        assert_eq!(diff.hunks.len(), 1);
        assert!(diff.hunks[0]
            .lines
            .iter()
            .any(|l| l.content == "new" && l.kind == mogzi_diff::DiffLineKind::Added));
    }

    #[tokio::test]
    async fn pre_resolved_cancellation_records_message() {
        let (_d, mut orch, _p) = harness(ScriptedMockProvider::always_text("never seen"));
        let (tx, rx) = mpsc::channel(64);
        let (cancel_tx, cancel_rx) = open_cancel();
        cancel_tx.send(()).unwrap();
        orch.submit("hi", tx, cancel_rx).await.unwrap();
        let events = drain(rx).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, AgentEvent::Cancelled { during_tool: false })));
        let history = &orch.store().session().history;
        assert!(history
            .iter()
            .any(|r| r.content == "⚠ Request cancelled."));
    }

    #[tokio::test]
    async fn stream_ending_without_done_still_completes_the_turn() {
        let provider = ScriptedMockProvider::new(vec![vec![ResponseEvent::TextDelta(
            "partial".into(),
        )]]);
        let (_d, mut orch, _p) = harness(provider);
        let (tx, rx) = mpsc::channel(64);
        let (_keep, cancel) = open_cancel();
        orch.submit("hi", tx, cancel).await.unwrap();
        let events = drain(rx).await;
        // Stream ended cleanly after partial text; the cycle completes.
        assert!(matches!(events.last(), Some(AgentEvent::TurnComplete)));
        assert_eq!(orch.store().session().history[1].content, "partial");
    }

    #[tokio::test]
    async fn usage_events_accumulate_into_session_metrics() {
        let (_d, mut orch, _p) = harness(ScriptedMockProvider::always_text("ok"));
        let (tx, rx) = mpsc::channel(64);
        let (_keep, cancel) = open_cancel();
        orch.submit("hi", tx, cancel).await.unwrap();
        drain(rx).await;
        let metrics = &orch.store().session().usage_metrics;
        assert_eq!(metrics.input_tokens, 5);
        assert_eq!(metrics.output_tokens, 5);
    }

    // ── Tool label summaries ──────────────────────────────────────────────────

    #[test]
    fn summary_picks_command_first() {
        let label = summarize_tool_call(
            "run_shell_command",
            &json!({"command": "cargo test", "directory": "x"}),
        );
        assert_eq!(label, "run_shell_command → cargo test");
    }

    #[test]
    fn summary_truncates_long_arguments() {
        let long = "a".repeat(40);
        let label = summarize_tool_call("read_text_file", &json!({"absolute_path": long}));
        assert_eq!(label, format!("read_text_file → {}…", "a".repeat(25)));
    }

    #[test]
    fn summary_without_key_argument_is_bare_name() {
        assert_eq!(summarize_tool_call("some_tool", &json!({})), "some_tool");
    }
}

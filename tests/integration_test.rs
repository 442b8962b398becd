// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
/// End-to-end scenarios over the session engine using the mock providers.
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{mpsc, oneshot};

use mogzi_config::{SessionMode, ToolApprovals};
use mogzi_core::{AgentEvent, EnvInfo, Orchestrator};
use mogzi_diff::{apply_patch, generate_diff, FuzzyStrategy, UnifiedDiff};
use mogzi_model::{ContentPart, Message, ResponseEvent, Role, ScriptedMockProvider};
use mogzi_session::SessionStore;
use mogzi_tools::{builtin::register_builtin, ToolContext, ToolRegistry};

fn orchestrator_with(
    provider: ScriptedMockProvider,
    root: &Path,
    workdir: &Path,
) -> Orchestrator {
    std::fs::create_dir_all(workdir).unwrap();
    let mut registry = ToolRegistry::new();
    register_builtin(&mut registry);
    let store = SessionStore::create_new(root).unwrap();
    let env = EnvInfo::detect(workdir, SessionMode::Chat, ToolApprovals::All);
    Orchestrator::new(
        Arc::new(provider),
        Arc::new(registry),
        ToolContext::new(workdir.to_path_buf(), ToolApprovals::All),
        env,
        store,
    )
}

async fn drain(mut rx: mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

// ── Scenario: new session on startup ─────────────────────────────────────────

#[test]
fn new_session_creates_directory_with_empty_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::create_new(dir.path()).unwrap();

    let session_dir = dir.path().join(store.id().to_string());
    assert!(session_dir.join("session.json").is_file());
    assert!(session_dir.join("attachments").is_dir());

    let text = std::fs::read_to_string(session_dir.join("session.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["history"], json!([]));
    assert!(value["name"].as_str().unwrap().starts_with("Chat "));
}

// ── Scenario: session rename keeps id, advances mtime ────────────────────────

#[test]
fn session_rename_persists_exact_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SessionStore::create_new(dir.path()).unwrap();
    let id = store.id();
    let before = store.session().last_modified_at;
    std::thread::sleep(std::time::Duration::from_millis(5));

    store.rename("My New Session Name").unwrap();

    let text =
        std::fs::read_to_string(dir.path().join(id.to_string()).join("session.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["name"], "My New Session Name");
    assert_eq!(value["id"], id.to_string());
    assert!(store.session().last_modified_at > before);
}

// ── Scenario: attachment dedup across three messages ─────────────────────────

#[test]
fn identical_attachments_share_hash_and_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SessionStore::create_new(dir.path()).unwrap();
    let bytes = b"Identical content for deduplication test".to_vec();

    for i in 0..3 {
        store
            .add_message(&Message::user_with_parts(vec![
                ContentPart::text(format!("msg {i}")),
                ContentPart::binary("dup.txt", "text/plain", bytes.clone()),
            ]))
            .unwrap();
    }

    let refs: Vec<_> = store
        .session()
        .history
        .iter()
        .flat_map(|record| record.attachments.iter())
        .collect();
    assert_eq!(refs.len(), 3);
    let hash = &refs[0].content_hash;
    assert_eq!(hash.len(), 16);
    assert!(refs.iter().all(|r| &r.content_hash == hash));
    assert!(refs
        .iter()
        .all(|r| r.stored_file_name == refs[0].stored_file_name));

    for reference in &refs {
        assert_eq!(std::fs::read(store.attachment_path(reference)).unwrap(), bytes);
    }
    let attachment_dir = dir
        .path()
        .join(store.id().to_string())
        .join("attachments");
    assert_eq!(std::fs::read_dir(attachment_dir).unwrap().count(), 1);
}

// ── Scenario: fuzzy patch with whitespace drift ──────────────────────────────

#[test]
fn whitespace_drift_applies_with_fuzzy_strategy() {
    let original = "fn demo() {\n    if (x)  {\n        go();\n    }\n}\n";
    let patch_text = "--- a\n+++ b\n@@ -2,1 +2,1 @@\n-if (x) {\n+if (y) {\n";
    let patch = UnifiedDiff::parse(patch_text).unwrap();

    let strict = apply_patch(original, &patch, false);
    assert!(!strict.success, "exact apply must fail on drifted whitespace");

    let fuzzy = apply_patch(original, &patch, true);
    assert!(fuzzy.success, "{:?}", fuzzy.error);
    assert!(fuzzy.applied_with_fuzzy);
    assert_eq!(
        fuzzy.fuzzy_matching_strategy,
        Some(FuzzyStrategy::WhitespaceInsensitive)
    );
    assert!(fuzzy.modified_content.unwrap().contains("if (y) {"));
}

// ── Property: patch round-trip ───────────────────────────────────────────────

#[test]
fn generate_format_parse_apply_round_trips() {
    let cases = [
        ("a\nb\nc\n", "a\nB\nc\n"),
        ("", "fresh\nfile\n"),
        ("one\ntwo\nthree\nfour\nfive\nsix\nseven\n", "one\ntwo\nTHREE\nfour\nfive\nsix\nSEVEN\nmore\n"),
        ("x\n", "x\n"),
    ];
    for (original, modified) in cases {
        let diff = generate_diff(original, modified, "a", "b");
        let reparsed = UnifiedDiff::parse(&diff.format()).unwrap();
        let result = apply_patch(original, &reparsed, false);
        assert!(result.success, "{original:?} → {modified:?}: {:?}", result.error);
        let output = result.modified_content.unwrap();
        assert_eq!(output, modified, "round trip failed for {original:?}");
        assert!(!result.applied_with_fuzzy);
    }
}

// ── Scenario: slash commands never reach the model ───────────────────────────

#[test]
fn session_clear_keeps_file_and_empties_history() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SessionStore::create_new(dir.path()).unwrap();
    store
        .add_message(&Message::user("test message for clearing"))
        .unwrap();
    assert_eq!(store.session().history.len(), 1);

    store.clear_history().unwrap();

    let path = dir
        .path()
        .join(store.id().to_string())
        .join("session.json");
    assert!(path.is_file());
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(value["history"], json!([]));
}

// ── Scenario: full tool loop through the orchestrator ────────────────────────

#[tokio::test]
async fn orchestrator_runs_tool_and_streams_final_text() {
    let dir = tempfile::tempdir().unwrap();
    let workdir = dir.path().join("work");
    let provider = ScriptedMockProvider::tool_then_text(
        "call-1",
        "write_file",
        &json!({"path": "hello.txt", "content": "made by the tool"}).to_string(),
        "I wrote the file.",
    );
    let mut orchestrator = orchestrator_with(provider, &dir.path().join("chats"), &workdir);

    let (tx, rx) = mpsc::channel(256);
    let (_cancel_tx, cancel_rx) = oneshot::channel();
    orchestrator
        .submit("please write hello.txt", tx, cancel_rx)
        .await
        .unwrap();
    let events = drain(rx).await;

    assert_eq!(
        std::fs::read_to_string(workdir.join("hello.txt")).unwrap(),
        "made by the tool"
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, AgentEvent::AssistantUpdate(t) if t == "I wrote the file.")));
    assert!(matches!(events.last(), Some(AgentEvent::TurnComplete)));

    // The transcript holds the tool response document and the final text.
    let history = &orchestrator.store().session().history;
    assert!(history
        .iter()
        .any(|r| r.role == Role::Tool && r.content.contains("write_file")));
    assert_eq!(history.last().unwrap().content, "I wrote the file.");
}

// ── Scenario: cancellation during a long shell command ───────────────────────

#[tokio::test]
async fn cancelling_during_shell_tool_records_message() {
    let dir = tempfile::tempdir().unwrap();
    let workdir = dir.path().join("work");
    let provider = ScriptedMockProvider::new(vec![vec![
        ResponseEvent::ToolCall {
            index: 0,
            id: "call-1".into(),
            name: "run_shell_command".into(),
            arguments: json!({"command": "sleep 30"}).to_string(),
        },
        ResponseEvent::Done,
    ]]);
    let mut orchestrator = orchestrator_with(provider, &dir.path().join("chats"), &workdir);

    let (tx, rx) = mpsc::channel(256);
    let (cancel_tx, cancel_rx) = oneshot::channel();

    let submit = tokio::spawn(async move {
        orchestrator.submit("run it", tx, cancel_rx).await.unwrap();
        orchestrator
    });
    // Give the tool time to start, then cancel.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let _ = cancel_tx.send(());

    let orchestrator = submit.await.unwrap();
    let events = drain(rx).await;

    assert!(events
        .iter()
        .any(|e| matches!(e, AgentEvent::Cancelled { during_tool: true })));
    assert!(orchestrator
        .store()
        .session()
        .history
        .iter()
        .any(|r| r.content == "⚠ Tool execution cancelled."));
}

// ── Scenario: corrupted session file recovery ────────────────────────────────

#[test]
fn corrupted_session_quarantined_and_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::create_new(dir.path()).unwrap();
    let id = store.id();
    let path = dir.path().join(id.to_string()).join("session.json");
    std::fs::write(&path, "{\"id\": broken").unwrap();

    let recovered = SessionStore::load(dir.path(), &id.to_string()).unwrap();
    assert_ne!(recovered.id(), id);
    assert!(dir
        .path()
        .join(id.to_string())
        .join("session.corrupted")
        .is_file());
}

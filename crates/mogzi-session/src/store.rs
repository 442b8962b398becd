// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use mogzi_model::{Message, Role};

/// Returns the directory where sessions are stored: `~/.mogzi/chats`.
pub fn default_session_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mogzi")
        .join("chats")
}

/// Reference to an attachment stored on disk next to the session file.
///
/// `stored_file_name` is derived from the reference's own metadata
/// (`{messageIndex}-{partIndex}-{contentHash}.{ext}`), except when an
/// attachment with identical bytes already exists — then the existing file
/// is shared and its name reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentReference {
    pub original_file_name: String,
    pub media_type: String,
    pub size_bytes: u64,
    /// First 16 hex chars of the lowercase SHA-256 of the file bytes.
    pub content_hash: String,
    pub stored_file_name: String,
    pub message_index: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetrics {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_write_tokens: Option<u64>,
}

impl UsageMetrics {
    pub fn accumulate(&mut self, input: u64, output: u64, cache_read: u64, cache_write: u64) {
        self.input_tokens += input;
        self.output_tokens += output;
        if cache_read > 0 {
            *self.cache_read_tokens.get_or_insert(0) += cache_read;
        }
        if cache_write > 0 {
            *self.cache_write_tokens.get_or_insert(0) += cache_write;
        }
    }
}

/// One persisted turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentReference>,
}

/// The on-disk session document (`session.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
    #[serde(default)]
    pub usage_metrics: UsageMetrics,
    #[serde(default)]
    pub history: Vec<SessionRecord>,
}

/// Listing entry for `/session list` and `--status`.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: Uuid,
    pub name: String,
    pub last_modified_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Owns a session directory: the JSON document and its attachment files.
///
/// The directory is treated as single-writer; there is no cross-process
/// locking.
pub struct SessionStore {
    root: PathBuf,
    session: Session,
}

impl SessionStore {
    /// Create a fresh session with a new UUIDv7 id and eager directories.
    pub fn create_new(root: &Path) -> anyhow::Result<Self> {
        let id = Uuid::now_v7();
        let id_str = id.simple().to_string();
        let suffix = &id_str[id_str.len() - 8..];
        let now = Utc::now();
        let session = Session {
            id,
            name: format!("Chat {suffix}"),
            created_at: now,
            last_modified_at: now,
            usage_metrics: UsageMetrics::default(),
            history: Vec::new(),
        };
        let store = Self {
            root: root.to_path_buf(),
            session,
        };
        fs::create_dir_all(store.attachments_dir())
            .with_context(|| format!("creating {}", store.attachments_dir().display()))?;
        store.save()?;
        debug!(id = %id, "created new session");
        Ok(store)
    }

    /// Load a session by UUID or by case-insensitive name.
    ///
    /// A corrupted `session.json` is quarantined as `session.corrupted` and a
    /// fresh session takes its place.  Name lookups resolve ties to the most
    /// recently modified session.
    pub fn load(root: &Path, id_or_name: &str) -> anyhow::Result<Self> {
        if let Ok(id) = Uuid::parse_str(id_or_name) {
            return Self::load_by_id(root, id);
        }

        let wanted = id_or_name.to_lowercase();
        let candidate = list_sessions(root, None)?
            .into_iter()
            .find(|s| s.name.to_lowercase() == wanted)
            .with_context(|| format!("no session named '{id_or_name}'"))?;
        Self::load_by_id(root, candidate.id)
    }

    fn load_by_id(root: &Path, id: Uuid) -> anyhow::Result<Self> {
        let dir = root.join(id.to_string());
        let path = dir.join("session.json");
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        match serde_json::from_str::<Session>(&text) {
            Ok(session) => {
                fs::create_dir_all(dir.join("attachments"))?;
                Ok(Self {
                    root: root.to_path_buf(),
                    session,
                })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "session file corrupted; quarantining");
                let quarantine = dir.join("session.corrupted");
                fs::rename(&path, &quarantine)
                    .with_context(|| format!("quarantining {}", path.display()))?;
                Self::create_new(root)
            }
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn id(&self) -> Uuid {
        self.session.id
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(self.session.id.to_string())
    }

    fn attachments_dir(&self) -> PathBuf {
        self.dir().join("attachments")
    }

    fn session_file(&self) -> PathBuf {
        self.dir().join("session.json")
    }

    /// Atomic write: serialize to `session.json.tmp`, then rename over the
    /// real file so readers never observe a half-written document.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = self.session_file();
        let tmp = path.with_extension("json.tmp");
        let mut json = serde_json::to_string_pretty(&self.session)?;
        json.push('\n');
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("renaming over {}", path.display()))?;
        Ok(())
    }

    /// Append a message, storing its binary parts into `attachments/`.
    ///
    /// Identical-content attachments share one file on disk: if a stored file
    /// with the same content hash already exists, its name is reused and no
    /// bytes are written.
    pub fn add_message(&mut self, msg: &Message) -> anyhow::Result<()> {
        let message_index = self.session.history.len();
        let mut attachments = Vec::new();

        for (part_index, (file_name, media_type, data)) in
            msg.binary_parts().into_iter().enumerate()
        {
            let content_hash = content_hash16(data);
            let ext = Path::new(file_name)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("bin");
            let stored_file_name = match self.find_stored_by_hash(&content_hash, ext)? {
                Some(existing) => existing,
                None => {
                    let name = format!("{message_index}-{part_index}-{content_hash}.{ext}");
                    let target = self.attachments_dir().join(&name);
                    if !target.exists() {
                        fs::write(&target, data)
                            .with_context(|| format!("writing {}", target.display()))?;
                    }
                    name
                }
            };
            attachments.push(AttachmentReference {
                original_file_name: file_name.to_string(),
                media_type: media_type.to_string(),
                size_bytes: data.len() as u64,
                content_hash,
                stored_file_name,
                message_index,
            });
        }

        self.session.history.push(SessionRecord {
            role: msg.role,
            content: msg.display_text(),
            attachments,
        });
        self.touch();
        self.save()
    }

    /// Rewrite the content of the last message (streaming updates the
    /// in-flight assistant turn in place).
    pub fn rewrite_last(&mut self, content: &str) -> anyhow::Result<()> {
        if let Some(last) = self.session.history.last_mut() {
            last.content = content.to_string();
            self.touch();
            self.save()?;
        }
        Ok(())
    }

    pub fn rename(&mut self, new_name: &str) -> anyhow::Result<()> {
        self.session.name = new_name.to_string();
        self.touch();
        self.save()
    }

    /// Empty the history (the session file and its id are kept).
    pub fn clear_history(&mut self) -> anyhow::Result<()> {
        self.session.history.clear();
        self.touch();
        self.save()
    }

    pub fn record_usage(&mut self, input: u64, output: u64, cache_read: u64, cache_write: u64) {
        self.session
            .usage_metrics
            .accumulate(input, output, cache_read, cache_write);
    }

    fn touch(&mut self) {
        self.session.last_modified_at = Utc::now();
    }

    /// Look for an existing attachment file whose name carries `hash` and
    /// `ext` (i.e. identical content already stored).
    fn find_stored_by_hash(&self, hash: &str, ext: &str) -> anyhow::Result<Option<String>> {
        let suffix = format!("-{hash}.{ext}");
        let dir = self.attachments_dir();
        if !dir.is_dir() {
            return Ok(None);
        }
        for entry in fs::read_dir(&dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(&suffix) {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// Absolute path of a stored attachment.
    pub fn attachment_path(&self, reference: &AttachmentReference) -> PathBuf {
        self.attachments_dir().join(&reference.stored_file_name)
    }
}

/// First 16 hex characters of the lowercase SHA-256 of `data`.
pub(crate) fn content_hash16(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(digest)[..16].to_string()
}

/// List sessions under `root`, most recently modified first, truncated to
/// `limit` when given.
pub fn list_sessions(root: &Path, limit: Option<usize>) -> anyhow::Result<Vec<SessionSummary>> {
    let mut summaries = Vec::new();
    if !root.is_dir() {
        return Ok(summaries);
    }
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let Ok(id) = Uuid::parse_str(&entry.file_name().to_string_lossy()) else {
            continue;
        };
        let path = entry.path().join("session.json");
        let Ok(text) = fs::read_to_string(&path) else {
            continue;
        };
        let Ok(session) = serde_json::from_str::<Session>(&text) else {
            // Unreadable sessions are skipped here; quarantine happens on load.
            continue;
        };
        summaries.push(SessionSummary {
            id,
            name: session.name,
            last_modified_at: session.last_modified_at,
            message_count: session.history.len(),
        });
    }
    summaries.sort_by(|a, b| b.last_modified_at.cmp(&a.last_modified_at));
    if let Some(n) = limit {
        summaries.truncate(n);
    }
    Ok(summaries)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mogzi_model::ContentPart;

    fn temp_root() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn create_new_writes_session_file() {
        let root = temp_root();
        let store = SessionStore::create_new(root.path()).unwrap();
        let path = store.session_file();
        assert!(path.is_file());
        let text = fs::read_to_string(&path).unwrap();
        let session: Session = serde_json::from_str(&text).unwrap();
        assert!(session.name.starts_with("Chat "));
        assert!(session.history.is_empty());
        // Pretty-printed, two-space indented, newline-terminated.
        assert!(text.contains("\n  \"name\""));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn session_ids_are_time_ordered() {
        let root = temp_root();
        let a = SessionStore::create_new(root.path()).unwrap();
        // Cross a millisecond boundary so the v7 timestamps differ.
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = SessionStore::create_new(root.path()).unwrap();
        // UUIDv7 sorts by creation time lexically.
        assert!(a.id().to_string() < b.id().to_string());
    }

    #[test]
    fn add_message_persists_history() {
        let root = temp_root();
        let mut store = SessionStore::create_new(root.path()).unwrap();
        store.add_message(&Message::user("hello")).unwrap();
        store.add_message(&Message::assistant("hi there")).unwrap();

        let reloaded = SessionStore::load(root.path(), &store.id().to_string()).unwrap();
        assert_eq!(reloaded.session().history.len(), 2);
        assert_eq!(reloaded.session().history[0].content, "hello");
        assert_eq!(reloaded.session().history[1].role, Role::Assistant);
    }

    #[test]
    fn attachments_are_written_and_deduplicated() {
        let root = temp_root();
        let mut store = SessionStore::create_new(root.path()).unwrap();
        let bytes = b"Identical content for deduplication test".to_vec();

        for i in 0..3 {
            let msg = Message::user_with_parts(vec![
                ContentPart::text(format!("message {i}")),
                ContentPart::binary("note.txt", "text/plain", bytes.clone()),
            ]);
            store.add_message(&msg).unwrap();
        }

        let refs: Vec<_> = store
            .session()
            .history
            .iter()
            .flat_map(|r| r.attachments.iter())
            .collect();
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(|r| r.content_hash == refs[0].content_hash));
        assert!(refs
            .iter()
            .all(|r| r.stored_file_name == refs[0].stored_file_name));

        // Exactly one file on disk, bytes verbatim.
        let files: Vec<_> = fs::read_dir(store.attachments_dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(fs::read(&files[0]).unwrap(), bytes);
    }

    #[test]
    fn stored_file_name_is_derived_from_metadata() {
        let root = temp_root();
        let mut store = SessionStore::create_new(root.path()).unwrap();
        let msg = Message::user_with_parts(vec![ContentPart::binary(
            "data.csv",
            "text/csv",
            b"a,b,c".to_vec(),
        )]);
        store.add_message(&msg).unwrap();
        let r = &store.session().history[0].attachments[0];
        assert_eq!(
            r.stored_file_name,
            format!("0-0-{}.csv", r.content_hash)
        );
        assert_eq!(r.content_hash.len(), 16);
        assert_eq!(r.message_index, 0);
        assert!(store.attachment_path(r).is_file());
    }

    #[test]
    fn load_by_name_is_case_insensitive() {
        let root = temp_root();
        let mut store = SessionStore::create_new(root.path()).unwrap();
        store.rename("My Session").unwrap();
        let loaded = SessionStore::load(root.path(), "my session").unwrap();
        assert_eq!(loaded.id(), store.id());
    }

    #[test]
    fn load_by_name_prefers_most_recent_on_tie() {
        let root = temp_root();
        let mut first = SessionStore::create_new(root.path()).unwrap();
        first.rename("dup").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let mut second = SessionStore::create_new(root.path()).unwrap();
        second.rename("DUP").unwrap();
        let loaded = SessionStore::load(root.path(), "dup").unwrap();
        assert_eq!(loaded.id(), second.id());
    }

    #[test]
    fn corrupted_session_is_quarantined() {
        let root = temp_root();
        let store = SessionStore::create_new(root.path()).unwrap();
        let id = store.id();
        fs::write(store.session_file(), "{not json").unwrap();

        let recovered = SessionStore::load(root.path(), &id.to_string()).unwrap();
        assert_ne!(recovered.id(), id, "a fresh session replaces the corrupt one");
        assert!(root
            .path()
            .join(id.to_string())
            .join("session.corrupted")
            .is_file());
    }

    #[test]
    fn rewrite_last_updates_streaming_message() {
        let root = temp_root();
        let mut store = SessionStore::create_new(root.path()).unwrap();
        store.add_message(&Message::user("q")).unwrap();
        store.add_message(&Message::assistant("partial")).unwrap();
        store.rewrite_last("partial answer, completed").unwrap();
        let reloaded = SessionStore::load(root.path(), &store.id().to_string()).unwrap();
        assert_eq!(
            reloaded.session().history[1].content,
            "partial answer, completed"
        );
    }

    #[test]
    fn rename_keeps_id_and_advances_mtime() {
        let root = temp_root();
        let mut store = SessionStore::create_new(root.path()).unwrap();
        let id = store.id();
        let before = store.session().last_modified_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.rename("My New Session Name").unwrap();
        assert_eq!(store.id(), id);
        assert_eq!(store.session().name, "My New Session Name");
        assert!(store.session().last_modified_at > before);
    }

    #[test]
    fn clear_history_empties_but_keeps_file() {
        let root = temp_root();
        let mut store = SessionStore::create_new(root.path()).unwrap();
        store
            .add_message(&Message::user("test message for clearing"))
            .unwrap();
        store.clear_history().unwrap();
        assert!(store.session_file().is_file());
        let reloaded = SessionStore::load(root.path(), &store.id().to_string()).unwrap();
        assert!(reloaded.session().history.is_empty());
    }

    #[test]
    fn list_sorts_by_mtime_desc_and_truncates() {
        let root = temp_root();
        let _a = SessionStore::create_new(root.path()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = SessionStore::create_new(root.path()).unwrap();
        let all = list_sessions(root.path(), None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, b.id());
        let one = list_sessions(root.path(), Some(1)).unwrap();
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn usage_metrics_accumulate_and_persist() {
        let root = temp_root();
        let mut store = SessionStore::create_new(root.path()).unwrap();
        store.record_usage(100, 50, 0, 0);
        store.record_usage(10, 5, 7, 3);
        store.save().unwrap();
        let reloaded = SessionStore::load(root.path(), &store.id().to_string()).unwrap();
        let m = &reloaded.session().usage_metrics;
        assert_eq!(m.input_tokens, 110);
        assert_eq!(m.output_tokens, 55);
        assert_eq!(m.cache_read_tokens, Some(7));
        assert_eq!(m.cache_write_tokens, Some(3));
    }

    #[test]
    fn content_hash_is_first_16_hex_of_sha256() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(content_hash16(b"abc"), "ba7816bf8f01cfea");
    }
}

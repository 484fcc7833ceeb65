//! The shared discovery store: lock, load, mutate, persist.
//!
//! The document on disk is the single source of truth. There is no in-process
//! cache and no background thread: every operation acquires the sibling file
//! lock, reads the whole document, works on it in memory, rewrites it in full
//! (mutating operations only), and releases the lock. Each operation also
//! appends one audit record to a sibling `*.events.jsonl`, the thin-waist
//! trail that lets agents reconstruct who touched shared state and when.

use crate::core::document::{AgentNamespace, Conflict, Decision, Discovery, StoreDocument};
use crate::core::error::ShoalError;
use crate::core::lock::{self, LockMode, LockPolicy};
use crate::core::summary::AgentSummary;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use ulid::Ulid;

/// One line of the sibling audit log.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuditEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub status: String,
}

/// Handle on a shared store document path.
///
/// Handles are cheap and stateless; any number of them, across any number of
/// processes, may point at the same path. The file lock arbitrates access.
pub struct DiscoveryStore {
    document_path: PathBuf,
    lock_path: PathBuf,
    audit_path: PathBuf,
    policy: LockPolicy,
}

impl DiscoveryStore {
    /// Opens the store at `path`, blocking indefinitely on lock contention.
    ///
    /// Parent directories are created as needed. If no document exists yet, a
    /// fresh empty one is written — without taking the lock, so two processes
    /// initializing the same brand-new path can race; the loser's empty
    /// document is simply replaced by an identical one. Opening an existing
    /// path never rewrites the document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ShoalError> {
        Self::open_with_policy(path, LockPolicy::Block)
    }

    pub fn open_with_policy(
        path: impl Into<PathBuf>,
        policy: LockPolicy,
    ) -> Result<Self, ShoalError> {
        let document_path: PathBuf = path.into();
        if document_path.file_name().is_none() {
            return Err(ShoalError::PathError(format!(
                "store path has no file name: {}",
                document_path.display()
            )));
        }
        if let Some(parent) = document_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let store = Self {
            lock_path: document_path.with_extension("lock"),
            audit_path: document_path.with_extension("events.jsonl"),
            document_path,
            policy,
        };

        if !store.document_path.exists() {
            store.write_document(&StoreDocument::empty(time::now_iso()))?;
        }
        Ok(store)
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    pub fn audit_path(&self) -> &Path {
        &self.audit_path
    }

    /// Records one discovery under the calling agent's namespace.
    ///
    /// For every *other* agent already holding the same key, one conflict
    /// record is appended (a key held by N other agents yields N records in
    /// this single call). The discovery is stored regardless; conflicts are
    /// informational. Returns `Ok(true)` iff the key was novel across all
    /// other agents at call time.
    pub fn record_discovery(&self, discovery: &Discovery) -> Result<bool, ShoalError> {
        if discovery.agent_id.is_empty() {
            return Err(ShoalError::ValidationError(
                "discovery agent_id must be non-empty".to_string(),
            ));
        }
        if discovery.key.is_empty() {
            return Err(ShoalError::ValidationError(
                "discovery key must be non-empty".to_string(),
            ));
        }

        self.with_exclusive(&discovery.agent_id, "store.record_discovery", |doc| {
            let now = time::now_iso();

            let mut new_conflicts = Vec::new();
            for (other_agent, namespace) in &doc.discoveries {
                if other_agent == &discovery.agent_id {
                    continue;
                }
                if let Some(existing) = namespace.get(&discovery.key) {
                    new_conflicts.push(Conflict {
                        key: discovery.key.clone(),
                        agents: [discovery.agent_id.clone(), other_agent.clone()],
                        values: [discovery.value.clone(), existing.value.clone()],
                        timestamp: now.clone(),
                    });
                }
            }
            let conflict_found = !new_conflicts.is_empty();
            doc.conflicts.extend(new_conflicts);

            doc.discoveries
                .entry(discovery.agent_id.clone())
                .or_default()
                .insert(discovery.key.clone(), discovery.clone());

            doc.metadata.total_discoveries = Some(doc.count_discoveries());
            doc.metadata.last_updated = Some(now);

            Ok(!conflict_found)
        })
    }

    /// Returns the entire document under a shared lock.
    pub fn get_shared_knowledge(&self) -> Result<StoreDocument, ShoalError> {
        self.with_shared("shoal", "store.get_shared_knowledge", |doc| Ok(doc.clone()))
    }

    /// Returns one agent's key→discovery namespace. An agent that has never
    /// published yields an empty map, not an error.
    pub fn get_agent_knowledge(&self, agent_id: &str) -> Result<AgentNamespace, ShoalError> {
        self.with_shared("shoal", "store.get_agent_knowledge", |doc| {
            Ok(doc.discoveries.get(agent_id).cloned().unwrap_or_default())
        })
    }

    /// Full conflict log in creation order; empty when none exist.
    pub fn get_conflicts(&self) -> Result<Vec<Conflict>, ShoalError> {
        self.with_shared("shoal", "store.get_conflicts", |doc| {
            Ok(doc.conflicts.clone())
        })
    }

    /// Sets or overwrites the decision for `key`. Decisions are independent
    /// of the conflict log and never retroactively resolve logged conflicts.
    pub fn record_decision(
        &self,
        key: &str,
        decision: serde_json::Value,
        decided_by: &str,
    ) -> Result<(), ShoalError> {
        if key.is_empty() {
            return Err(ShoalError::ValidationError(
                "decision key must be non-empty".to_string(),
            ));
        }
        self.with_exclusive(decided_by, "store.record_decision", |doc| {
            doc.decisions.insert(
                key.to_string(),
                Decision {
                    decision,
                    decided_by: decided_by.to_string(),
                    timestamp: time::now_iso(),
                },
            );
            Ok(())
        })
    }

    pub fn get_agent_summary(&self) -> Result<AgentSummary, ShoalError> {
        self.with_shared("shoal", "store.get_agent_summary", |doc| {
            Ok(AgentSummary::from_document(doc))
        })
    }

    /// Writes a snapshot of the live document to a fresh
    /// `checkpoint_<name>_<unix-secs>_<ulid>.json` beside it and returns the
    /// snapshot's path.
    ///
    /// The checkpoint name and time are stamped into the snapshot's metadata
    /// only; the live document is left byte-identical. The ULID suffix keeps
    /// two same-named checkpoints within one second from colliding.
    pub fn checkpoint(&self, name: &str) -> Result<PathBuf, ShoalError> {
        if name.is_empty() {
            return Err(ShoalError::ValidationError(
                "checkpoint name must be non-empty".to_string(),
            ));
        }
        self.with_shared("shoal", "store.checkpoint", |doc| {
            let mut snapshot = doc.clone();
            snapshot.metadata.checkpoint_name = Some(name.to_string());
            snapshot.metadata.checkpoint_time = Some(time::now_iso());

            let file_name = format!(
                "checkpoint_{}_{}_{}.json",
                name,
                time::now_epoch_secs(),
                Ulid::new()
            );
            let checkpoint_path = match self.document_path.parent() {
                Some(parent) => parent.join(file_name),
                None => PathBuf::from(file_name),
            };

            let file = File::create(&checkpoint_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &snapshot)?;
            writer.flush()?;

            Ok(checkpoint_path)
        })
    }

    /// Execute a mutation under the exclusive lock: load, apply, persist.
    fn with_exclusive<R>(
        &self,
        actor: &str,
        op: &str,
        f: impl FnOnce(&mut StoreDocument) -> Result<R, ShoalError>,
    ) -> Result<R, ShoalError> {
        let _guard = lock::acquire(&self.lock_path, LockMode::Exclusive, self.policy)?;
        let result = (|| {
            let mut doc = self.load_document()?;
            let out = f(&mut doc)?;
            self.write_document(&doc)?;
            Ok(out)
        })();
        self.log_event(actor, op, if result.is_ok() { "success" } else { "error" })?;
        result
    }

    /// Execute a read under the shared lock. The document is never rewritten.
    fn with_shared<R>(
        &self,
        actor: &str,
        op: &str,
        f: impl FnOnce(&StoreDocument) -> Result<R, ShoalError>,
    ) -> Result<R, ShoalError> {
        let _guard = lock::acquire(&self.lock_path, LockMode::Shared, self.policy)?;
        let result = self.load_document().and_then(|doc| f(&doc));
        self.log_event(actor, op, if result.is_ok() { "success" } else { "error" })?;
        result
    }

    fn load_document(&self) -> Result<StoreDocument, ShoalError> {
        let file = File::open(&self.document_path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Writes to a temporary sibling and renames into place, so a crash
    /// mid-write never leaves the live document truncated.
    fn write_document(&self, doc: &StoreDocument) -> Result<(), ShoalError> {
        let tmp_path = self.document_path.with_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, doc)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.document_path)?;
        Ok(())
    }

    fn log_event(&self, actor: &str, op: &str, status: &str) -> Result<(), ShoalError> {
        let ev = AuditEvent {
            ts: time::now_iso(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            status: status.to_string(),
        };
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_path)?;
        writeln!(f, "{}", serde_json::to_string(&ev)?)?;
        Ok(())
    }
}

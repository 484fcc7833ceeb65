//! On-disk data model for the shared store document.
//!
//! The document is the durable contract: field names and nesting must stay
//! stable so that independently built agent processes can read each other's
//! stores. Optional metadata fields are omitted when unset rather than
//! serialized as null.

use crate::core::time;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Schema version tag stamped into every fresh document.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Sentinel reported as `last_activity` for an agent with zero discoveries.
pub const NO_ACTIVITY: &str = "Never";

/// One keyed fact published by a single agent.
///
/// Within one agent's namespace a key maps to at most one current discovery
/// (last write wins). The same key may exist under several agents at once;
/// that is the conflict-detection case, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Discovery {
    pub agent_id: String,
    pub key: String,
    pub value: Value,
    pub timestamp: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_confidence() -> f64 {
    1.0
}

impl Discovery {
    /// Canonical constructor: stamps the creation timestamp and normalizes
    /// the optional fields (confidence 1.0, empty tag list — never null).
    pub fn new(agent_id: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Self {
            agent_id: agent_id.into(),
            key: key.into(),
            value,
            timestamp: time::now_iso(),
            confidence: default_confidence(),
            tags: Vec::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Auto-logged record that two agents hold the same key.
///
/// Append-only and informational: conflicts never block the write that
/// produced them, and the log is never deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    pub key: String,
    /// Agent ids in `[new, existing]` order: the writer that triggered the
    /// conflict comes first.
    pub agents: [String; 2],
    /// Competing values, same `[new, existing]` order as `agents`.
    pub values: [Value; 2],
    pub timestamp: String,
}

/// A manually recorded resolution for a key. At most one decision is retained
/// per key; a later decision overwrites an earlier one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub decision: Value,
    pub decided_by: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub created: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_discoveries: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_time: Option<String>,
}

/// One agent's key→discovery namespace.
pub type AgentNamespace = BTreeMap<String, Discovery>;

/// Root persisted structure, rewritten in full on every mutating operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreDocument {
    pub discoveries: BTreeMap<String, AgentNamespace>,
    pub conflicts: Vec<Conflict>,
    pub decisions: BTreeMap<String, Decision>,
    pub metadata: Metadata,
}

impl StoreDocument {
    /// Fresh document with empty collections and a stamped version tag.
    pub fn empty(created: String) -> Self {
        Self {
            discoveries: BTreeMap::new(),
            conflicts: Vec::new(),
            decisions: BTreeMap::new(),
            metadata: Metadata {
                created,
                version: DOCUMENT_VERSION.to_string(),
                last_updated: None,
                total_discoveries: None,
                checkpoint_name: None,
                checkpoint_time: None,
            },
        }
    }

    /// Sum of distinct keys across all agent namespaces.
    pub fn count_discoveries(&self) -> u64 {
        self.discoveries.values().map(|ns| ns.len() as u64).sum()
    }
}

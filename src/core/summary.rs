//! Summary statistics over a store document.

use crate::core::document::{StoreDocument, NO_ACTIVITY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentActivity {
    pub discovery_count: usize,
    /// Highest discovery timestamp for the agent, or `"Never"` when the
    /// agent has an empty namespace.
    pub last_activity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSummary {
    pub total_agents: usize,
    /// Running count from document metadata, not recomputed here.
    pub total_discoveries: u64,
    pub total_conflicts: usize,
    pub total_decisions: usize,
    pub agents: BTreeMap<String, AgentActivity>,
}

impl AgentSummary {
    pub fn from_document(doc: &StoreDocument) -> Self {
        let agents = doc
            .discoveries
            .iter()
            .map(|(agent_id, namespace)| {
                let last_activity = namespace
                    .values()
                    .map(|d| d.timestamp.as_str())
                    .max()
                    .unwrap_or(NO_ACTIVITY)
                    .to_string();
                (
                    agent_id.clone(),
                    AgentActivity {
                        discovery_count: namespace.len(),
                        last_activity,
                    },
                )
            })
            .collect();

        Self {
            total_agents: doc.discoveries.len(),
            total_discoveries: doc.metadata.total_discoveries.unwrap_or(0),
            total_conflicts: doc.conflicts.len(),
            total_decisions: doc.decisions.len(),
            agents,
        }
    }
}

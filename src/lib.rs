//! Shoal: a shared discovery store for concurrent agents
//!
//! **Shoal gives independent worker processes one file-backed place to share
//! what they learn.**
//!
//! Agents publish keyed discoveries into a single JSON document. Shoal detects
//! when two agents hold the same key, records arbitrated decisions, summarizes
//! agent activity, and snapshots the document on demand. The file is the
//! single source of truth; a sibling advisory file lock is the sole
//! concurrency primitive.
//!
//! # Core Principles
//!
//! - **File-resident**: no daemon, no server — the document on disk is the store
//! - **Lock-then-rewrite**: every operation is one lock → load → mutate → persist cycle
//! - **Conflicts are data**: colliding keys are logged and surfaced, never raised as errors
//! - **Audited**: every operation appends one line to a sibling `*.events.jsonl`
//!
//! # Examples
//!
//! ```bash
//! # Initialize a store
//! shoal --store ./shoal.json init
//!
//! # Publish a discovery
//! shoal record --agent backend --key endpoint --value '{"path":"/x"}'
//!
//! # Inspect conflicts and activity
//! shoal conflicts
//! shoal summary
//!
//! # Snapshot the document
//! shoal checkpoint --name before-merge
//! ```
//!
//! # Crate Structure
//!
//! - [`core::store`]: the store and its seven operations
//! - [`core::document`]: the persisted data model (discoveries, conflicts, decisions)
//! - [`core::lock`]: shared/exclusive advisory locking with a configurable wait policy

pub mod core;

mod cli;

use crate::cli::{Cli, Command};
use crate::core::document::Discovery;
use crate::core::error::ShoalError;
use crate::core::lock::LockPolicy;
use crate::core::output;
use crate::core::store::DiscoveryStore;
use crate::core::time;

use clap::Parser;
use colored::Colorize;
use serde_json::Value;

/// Parse a CLI-provided value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn open_store(cli: &Cli) -> Result<DiscoveryStore, ShoalError> {
    let policy = match cli.lock_timeout_ms {
        Some(ms) => LockPolicy::TimeoutMs(ms),
        None => LockPolicy::Block,
    };
    DiscoveryStore::open_with_policy(&cli.store, policy)
}

pub fn run() -> Result<(), ShoalError> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Init => {
            let store = open_store(&cli)?;
            println!(
                "{} store ready at {}",
                "▸".bright_cyan(),
                store.document_path().display()
            );
            Ok(())
        }
        Command::Record(args) => {
            let store = open_store(&cli)?;
            let discovery = Discovery::new(&args.agent, &args.key, parse_value(&args.value))
                .with_confidence(args.confidence)
                .with_tags(args.tags.clone());
            let novel = store.record_discovery(&discovery)?;
            if novel {
                println!(
                    "{} recorded {} for agent {}",
                    "✓".bright_green(),
                    args.key.bright_white().bold(),
                    args.agent.bright_cyan()
                );
            } else {
                println!(
                    "{} recorded {} for agent {} — key also held by another agent (conflict logged)",
                    "⚠".bright_yellow(),
                    args.key.bright_white().bold(),
                    args.agent.bright_cyan()
                );
            }
            Ok(())
        }
        Command::Knowledge(args) => {
            let store = open_store(&cli)?;
            match &args.agent {
                Some(agent) => {
                    let namespace = store.get_agent_knowledge(agent)?;
                    if args.format == "json" {
                        let envelope = time::command_envelope(
                            "knowledge",
                            "ok",
                            serde_json::json!({ "agent": agent, "discoveries": namespace }),
                        );
                        println!("{}", serde_json::to_string_pretty(&envelope)?);
                    } else {
                        println!("{} {}", "agent".bright_cyan().bold(), agent);
                        for (key, d) in &namespace {
                            println!(
                                "  {} = {} (confidence {:.2})",
                                key.bright_white(),
                                output::compact_value(&d.value, 72),
                                d.confidence
                            );
                        }
                        if namespace.is_empty() {
                            println!("  {}", "no discoveries".dimmed());
                        }
                    }
                }
                None => {
                    let doc = store.get_shared_knowledge()?;
                    if args.format == "json" {
                        let envelope = time::command_envelope(
                            "knowledge",
                            "ok",
                            serde_json::to_value(&doc)?,
                        );
                        println!("{}", serde_json::to_string_pretty(&envelope)?);
                    } else {
                        for (agent, namespace) in &doc.discoveries {
                            println!("{} {}", "agent".bright_cyan().bold(), agent);
                            for (key, d) in namespace {
                                println!(
                                    "  {} = {}",
                                    key.bright_white(),
                                    output::compact_value(&d.value, 72)
                                );
                            }
                        }
                        if doc.discoveries.is_empty() {
                            println!("{}", "no discoveries recorded".dimmed());
                        }
                    }
                }
            }
            Ok(())
        }
        Command::Conflicts(args) => {
            let store = open_store(&cli)?;
            let conflicts = store.get_conflicts()?;
            if args.format == "json" {
                let envelope = time::command_envelope(
                    "conflicts",
                    "ok",
                    serde_json::json!({ "conflicts": conflicts, "total": conflicts.len() }),
                );
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            } else if conflicts.is_empty() {
                println!("{}", "no conflicts recorded".dimmed());
            } else {
                for c in &conflicts {
                    println!(
                        "{} {} {} vs {} ({} vs {})",
                        "⚠".bright_yellow(),
                        c.key.bright_white().bold(),
                        c.agents[0].bright_cyan(),
                        c.agents[1].bright_cyan(),
                        output::compact_value(&c.values[0], 40),
                        output::compact_value(&c.values[1], 40)
                    );
                }
                println!("{} conflict(s)", conflicts.len());
            }
            Ok(())
        }
        Command::Decide(args) => {
            let store = open_store(&cli)?;
            store.record_decision(&args.key, parse_value(&args.decision), &args.by)?;
            println!(
                "{} decision recorded for {} by {}",
                "✓".bright_green(),
                args.key.bright_white().bold(),
                args.by.bright_cyan()
            );
            Ok(())
        }
        Command::Summary(args) => {
            let store = open_store(&cli)?;
            let summary = store.get_agent_summary()?;
            if args.format == "json" {
                let envelope =
                    time::command_envelope("summary", "ok", serde_json::to_value(&summary)?);
                println!("{}", serde_json::to_string_pretty(&envelope)?);
            } else {
                println!(
                    "{} agents={} discoveries={} conflicts={} decisions={}",
                    "▸".bright_cyan(),
                    summary.total_agents,
                    summary.total_discoveries,
                    summary.total_conflicts,
                    summary.total_decisions
                );
                for (agent, activity) in &summary.agents {
                    println!(
                        "  {} {} discoveries, last activity {}",
                        agent.bright_cyan(),
                        activity.discovery_count,
                        activity.last_activity
                    );
                }
            }
            Ok(())
        }
        Command::Checkpoint(args) => {
            let store = open_store(&cli)?;
            let path = store.checkpoint(&args.name)?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Demo => run_demo(&cli),
    }
}

/// Two-agent walkthrough: both publish the same key, the second one trips the
/// conflict log, and the closing summary shows the shared view.
fn run_demo(cli: &Cli) -> Result<(), ShoalError> {
    let store = open_store(cli)?;

    for agent in ["frontend_agent", "backend_agent"] {
        let discovery = Discovery::new(
            agent,
            "api_endpoint_pattern",
            serde_json::json!({
                "pattern": "/api/v1/{resource}/{id}",
                "methods": ["GET", "POST", "PUT", "DELETE"]
            }),
        )
        .with_confidence(0.95)
        .with_tags(vec![
            "api".to_string(),
            "rest".to_string(),
            "pattern".to_string(),
        ]);

        let novel = store.record_discovery(&discovery)?;
        if novel {
            println!(
                "[{}] {} recorded api_endpoint_pattern",
                agent.bright_cyan(),
                "✓".bright_green()
            );
        } else {
            println!(
                "[{}] {} potential conflict detected for key: api_endpoint_pattern",
                agent.bright_cyan(),
                "⚠".bright_yellow()
            );
        }

        // What the other agents already shared, filtered by tag.
        let doc = store.get_shared_knowledge()?;
        for (other_agent, namespace) in &doc.discoveries {
            if other_agent == agent {
                continue;
            }
            for (key, d) in namespace {
                if d.tags.iter().any(|t| t == "api") {
                    println!(
                        "[{}] found relevant API pattern from {}: {}",
                        agent.bright_cyan(),
                        other_agent.bright_cyan(),
                        key
                    );
                }
            }
        }
    }

    let summary = store.get_agent_summary()?;
    println!();
    println!("{}", "Agent Activity Summary:".bright_white().bold());
    println!("{}", serde_json::to_string_pretty(&summary)?);

    let conflicts = store.get_conflicts()?;
    if !conflicts.is_empty() {
        println!();
        println!("{}", "Detected Conflicts:".bright_yellow().bold());
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
    }
    Ok(())
}

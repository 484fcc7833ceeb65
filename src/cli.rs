//! CLI struct definitions for the shoal command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "shoal",
    version = env!("CARGO_PKG_VERSION"),
    about = "Shoal is a file-backed shared discovery store: independent agent processes publish keyed findings into one document, get conflicts detected across agents, record arbitrated decisions, and snapshot shared state on demand. 🐟"
)]
pub(crate) struct Cli {
    /// Path to the shared store document.
    #[clap(long, global = true, default_value = "./shoal.json")]
    pub store: PathBuf,
    /// Give up on lock acquisition after this many milliseconds (blocks
    /// indefinitely when omitted).
    #[clap(long, global = true)]
    pub lock_timeout_ms: Option<u64>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Initialize the store document if it does not exist
    Init,
    /// Record a discovery under an agent's namespace
    Record(RecordCli),
    /// Show shared knowledge, optionally filtered to one agent
    Knowledge(KnowledgeCli),
    /// List recorded cross-agent conflicts
    Conflicts(FormatCli),
    /// Record an arbitrated decision for a key
    Decide(DecideCli),
    /// Summarize agent activity across the store
    Summary(FormatCli),
    /// Write a checkpoint snapshot of the document
    Checkpoint(CheckpointCli),
    /// Run a two-agent walkthrough against the store
    Demo,
    /// Print version
    Version,
}

#[derive(clap::Args, Debug)]
pub(crate) struct RecordCli {
    /// Agent id owning the discovery
    #[clap(long)]
    pub agent: String,
    /// Discovery key (scoped per agent)
    #[clap(long)]
    pub key: String,
    /// Discovery value: parsed as JSON, or stored as a plain string if that fails
    #[clap(long)]
    pub value: String,
    /// Confidence score (conventionally 0-1)
    #[clap(long, default_value_t = 1.0)]
    pub confidence: f64,
    /// Tag for the discovery (repeatable)
    #[clap(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub(crate) struct KnowledgeCli {
    /// Only show this agent's namespace
    #[clap(long)]
    pub agent: Option<String>,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct FormatCli {
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct DecideCli {
    /// Key the decision applies to
    #[clap(long)]
    pub key: String,
    /// Decision payload: parsed as JSON, or stored as a plain string if that fails
    #[clap(long)]
    pub decision: String,
    /// Identifier of the deciding party
    #[clap(long)]
    pub by: String,
}

#[derive(clap::Args, Debug)]
pub(crate) struct CheckpointCli {
    /// Checkpoint name (part of the snapshot file name)
    #[clap(long)]
    pub name: String,
}

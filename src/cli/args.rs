//! CLI argument structs for all subcommands.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// `--global`/`--project`: flattened onto every operational command.
/// Both set at once is a bad-argument error (exit 2), resolved by the
/// caller, not by clap, since the conflict needs a custom exit code.
#[derive(Parser, Debug, Clone, Copy, Default)]
pub struct ScopeArgs {
    /// Operate on the global (`~/.graphiti`) scope
    #[arg(long)]
    pub global: bool,

    /// Operate on the current project's scope
    #[arg(long)]
    pub project: bool,
}

#[derive(Parser, Debug)]
#[command(name = "graphiti", version, about = "Knowledge graph for coding projects")]
pub struct Cli {
    /// Output format for command results
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add an episode directly to the knowledge graph
    Add(AddArgs),
    /// Search the knowledge graph
    Search(SearchArgs),
    /// List recent episodes
    List(ListArgs),
    /// Show a single episode by id
    Show(IdArgs),
    /// Delete an episode by id
    Delete(IdArgs),
    /// Summarize pending commits and conversation turns on demand
    Summarize(ScopeArgs),
    /// Prune stale episodes from the graph
    Compact(ScopeArgs),
    /// Report LLM reachability, queue depth, and index staleness
    Health,
    /// Show the current effective configuration
    Config,
    /// Capture a git commit batch or an AI-assistant conversation transcript
    Capture(CaptureArgs),
    /// Replay git history into the knowledge graph
    Index(IndexArgs),
    /// Manage git/Claude-settings hooks
    Hooks {
        #[command(subcommand)]
        command: HooksCommand,
    },
    /// Inspect or drive the background job queue
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },
    /// Run or install the MCP server
    Mcp {
        #[command(subcommand)]
        command: McpCommand,
    },
}

#[derive(Parser, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub content: String,
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Parser, Debug)]
pub struct SearchArgs {
    #[arg(long)]
    pub query: String,
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Parser, Debug)]
pub struct IdArgs {
    #[arg(long)]
    pub id: String,
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Parser, Debug)]
pub struct CaptureArgs {
    /// Only capture turns/commits not already recorded
    #[arg(long)]
    pub auto: bool,
    /// Conversation transcript path (omit to capture pending git commits instead)
    #[arg(long)]
    pub transcript_path: Option<String>,
    #[arg(long)]
    pub session_id: Option<String>,
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Parser, Debug)]
pub struct IndexArgs {
    /// Reset indexer state and replay the entire history
    #[arg(long)]
    pub full: bool,
    /// Only index commits since this ref or date
    #[arg(long)]
    pub since: Option<String>,
    /// Suppress progress output (used by the detached MCP re-index)
    #[arg(long)]
    pub quiet: bool,
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Subcommand, Debug)]
pub enum HooksCommand {
    /// Install managed git hooks and the Claude Stop-hook settings entry
    Install,
    /// Remove managed git hooks and the Claude Stop-hook settings entry
    Uninstall,
    /// Show install status for every managed hook
    Status,
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// Report job queue and LLM failed-request queue depth
    Status,
    /// Run pending jobs to completion
    Process,
    /// Replay the failed-request queue against the LLM transport
    Retry,
}

#[derive(Subcommand, Debug)]
pub enum McpCommand {
    /// Run the MCP server over stdio
    Serve,
    /// Install this binary as an MCP server entry in Claude settings
    Install,
}

//! CLI layer: argument parsing, command dispatch, and subcommand
//! implementations wiring the A-L components together, grounded on
//! `pustynsky-search-index`'s `cli/mod.rs` (`Cli`/`Commands`/`run()`/
//! `cmd_*` split). The exact flag names below are load-bearing: the MCP
//! dispatcher shells back into this binary and constructs these same
//! flags (`mcp/handlers.rs::dispatch_tool`).

pub mod args;

pub use args::*;

use clap::Parser;
use graphiti_core::capture::{self, EpisodeHandle};
use graphiti_core::error::{self, GraphitiError};
use graphiti_core::graph::{self, GraphStore};
use graphiti_core::hooks::{self, MANAGED_HOOK_TYPES};
use graphiti_core::indexer;
use graphiti_core::jobqueue::{self, JobStore, StopSignal};
use graphiti_core::llm::{self, FailedRequestQueue, Transport};
use graphiti_core::mcp;
use graphiti_core::models::{IndexState, JobPayload, LLMOperation};
use graphiti_core::scope::{self, Scope};
use graphiti_core::security;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Batch size for `process_pending_commits`. Not specified numerically by
/// the design; chosen conservatively so one LLM call covers a handful of
/// related commits without growing the prompt unbounded.
const CAPTURE_BATCH_SIZE: usize = 5;
const MAX_DIFF_LINES_PER_FILE: usize = 500;

enum CliError {
    BadArgs(String),
    Graphiti(GraphitiError),
}

impl From<GraphitiError> for CliError {
    fn from(e: GraphitiError) -> Self {
        CliError::Graphiti(e)
    }
}

/// What a command prints: a short human line for `--format text`, the same
/// data as structured JSON for `--format json`.
struct CmdOutput {
    text: String,
    json: Value,
}

impl CmdOutput {
    fn new(text: impl Into<String>, json: Value) -> Self {
        Self { text: text.into(), json }
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;
    match execute(cli.command, format) {
        Ok(output) => emit(format, &output),
        Err(CliError::BadArgs(msg)) => {
            eprintln!("Error: {msg}");
            std::process::exit(2);
        }
        Err(CliError::Graphiti(e)) => {
            eprintln!("Error: {e}");
            std::process::exit(error::exit_code(&e));
        }
    }
}

fn emit(format: OutputFormat, output: &CmdOutput) {
    match format {
        OutputFormat::Json => println!("{}", output.json),
        OutputFormat::Text => println!("{}", output.text),
    }
}

/// Resolve `--global`/`--project` into a concrete scope. Conflicting flags
/// are a bad-argument error (exit 2); the default (neither flag) prefers
/// project scope, falling back to global outside a repo.
fn resolve_scope(scope_args: ScopeArgs) -> Result<(Scope, Option<PathBuf>), CliError> {
    if scope_args.global && scope_args.project {
        return Err(CliError::BadArgs(
            "--global and --project are mutually exclusive".to_string(),
        ));
    }
    if scope_args.global {
        return Ok((Scope::Global, None));
    }
    Ok(scope::determine_scope(true, None))
}

fn current_exe() -> PathBuf {
    std::env::current_exe().unwrap_or_else(|_| PathBuf::from("graphiti"))
}

fn open_store(scope: Scope, project_root: Option<&Path>) -> Result<GraphStore, CliError> {
    Ok(GraphStore::open(&scope::graph_db_path(scope, project_root))?)
}

fn build_transport() -> Transport {
    let cfg = llm::config::get_or_init(&scope::llm_config_path()).clone();
    Transport::new(cfg, scope::llm_state_path())
}

fn load_allowlist(project_root: Option<&Path>) -> Result<graphiti_core::models::Allowlist, CliError> {
    match project_root {
        Some(root) => Ok(security::allowlist::load(&scope::allowlist_path(root))?),
        None => Ok(graphiti_core::models::Allowlist::default()),
    }
}

fn episode_to_json(e: &graph::Episode) -> Value {
    json!({
        "id": e.id,
        "name": e.name,
        "body": e.body,
        "reference_time": e.reference_time,
        "group_id": e.group_id,
    })
}

fn execute(command: Commands, _format: OutputFormat) -> Result<CmdOutput, CliError> {
    match command {
        Commands::Add(args) => cmd_add(args),
        Commands::Search(args) => cmd_search(args),
        Commands::List(args) => cmd_list(args),
        Commands::Show(args) => cmd_show(args),
        Commands::Delete(args) => cmd_delete(args),
        Commands::Summarize(scope_args) => cmd_summarize(scope_args),
        Commands::Compact(scope_args) => cmd_compact(scope_args),
        Commands::Health => cmd_health(),
        Commands::Config => cmd_config(),
        Commands::Capture(args) => cmd_capture(args),
        Commands::Index(args) => cmd_index(args),
        Commands::Hooks { command } => cmd_hooks(command),
        Commands::Queue { command } => cmd_queue(command),
        Commands::Mcp { command } => cmd_mcp(command),
    }
}

fn cmd_add(args: AddArgs) -> Result<CmdOutput, CliError> {
    let (scope, project_root) = resolve_scope(args.scope)?;
    let allowlist = load_allowlist(project_root.as_deref())?;
    let audit_path = scope::audit_log_path(scope, project_root.as_deref());

    let sanitized = security::sanitize(&args.content, None, &allowlist, Some(&audit_path))?;

    let now = now_unix();
    let episode = EpisodeHandle {
        name: format!("add_{now}"),
        body: sanitized.sanitized,
        reference_time: now,
        group_id: scope.as_str().to_string(),
    };
    let store = open_store(scope, project_root.as_deref())?;
    let id = store.add_episode(&episode)?;

    Ok(CmdOutput::new(format!("added episode {id}"), json!({"id": id})))
}

fn cmd_search(args: SearchArgs) -> Result<CmdOutput, CliError> {
    let (scope, project_root) = resolve_scope(args.scope)?;
    let store = open_store(scope, project_root.as_deref())?;
    let hits = store.search(&args.query, args.limit)?;
    let text = if hits.is_empty() {
        "no matching episodes".to_string()
    } else {
        hits.iter().map(|e| format!("{}: {}", e.id, e.name)).collect::<Vec<_>>().join("\n")
    };
    Ok(CmdOutput::new(text, json!(hits.iter().map(episode_to_json).collect::<Vec<_>>())))
}

fn cmd_list(args: ListArgs) -> Result<CmdOutput, CliError> {
    let (scope, project_root) = resolve_scope(args.scope)?;
    let store = open_store(scope, project_root.as_deref())?;
    let items = store.list(args.limit)?;
    let text = if items.is_empty() {
        "no episodes".to_string()
    } else {
        items.iter().map(|e| format!("{}: {}", e.id, e.name)).collect::<Vec<_>>().join("\n")
    };
    Ok(CmdOutput::new(text, json!(items.iter().map(episode_to_json).collect::<Vec<_>>())))
}

fn cmd_show(args: IdArgs) -> Result<CmdOutput, CliError> {
    let (scope, project_root) = resolve_scope(args.scope)?;
    let store = open_store(scope, project_root.as_deref())?;
    match store.show(&args.id)? {
        Some(episode) => Ok(CmdOutput::new(episode.body.clone(), episode_to_json(&episode))),
        None => Err(GraphitiError::Generic(format!("episode not found: {}", args.id)).into()),
    }
}

fn cmd_delete(args: IdArgs) -> Result<CmdOutput, CliError> {
    let (scope, project_root) = resolve_scope(args.scope)?;
    let store = open_store(scope, project_root.as_deref())?;
    if store.delete(&args.id)? {
        Ok(CmdOutput::new(format!("deleted {}", args.id), json!({"deleted": true, "id": args.id})))
    } else {
        Err(GraphitiError::Generic(format!("episode not found: {}", args.id)).into())
    }
}

fn cmd_summarize(scope_args: ScopeArgs) -> Result<CmdOutput, CliError> {
    let (scope, project_root) = resolve_scope(scope_args)?;
    let repo = project_root.clone().unwrap_or_else(|| PathBuf::from("."));
    let allowlist = load_allowlist(project_root.as_deref())?;
    let audit_path = scope::audit_log_path(scope, project_root.as_deref());
    let mut transport = build_transport();

    let (episodes, skipped) = capture::process_pending_commits(
        &mut transport,
        &scope::pending_commits_path(),
        &repo,
        CAPTURE_BATCH_SIZE,
        MAX_DIFF_LINES_PER_FILE,
        scope.as_str(),
        &allowlist,
        Some(&audit_path),
    )?;

    let store = open_store(scope, project_root.as_deref())?;
    for episode in &episodes {
        store.add_episode(episode)?;
    }

    Ok(CmdOutput::new(
        format!("summarized {} episode(s), skipped {skipped} commit(s)", episodes.len()),
        json!({"episodes": episodes.len(), "skipped": skipped}),
    ))
}

fn cmd_compact(scope_args: ScopeArgs) -> Result<CmdOutput, CliError> {
    let (scope, project_root) = resolve_scope(scope_args)?;
    let store = open_store(scope, project_root.as_deref())?;
    let removed = store.compact()?;
    Ok(CmdOutput::new(format!("removed {removed} duplicate episode(s)"), json!({"removed": removed})))
}

fn cmd_health() -> Result<CmdOutput, CliError> {
    let cfg = llm::config::get_or_init(&scope::llm_config_path()).clone();
    let cloud_configured = cfg.cloud_api_key().is_some();

    let job_store_path = scope::job_queue_dir().join("jobs.db");
    let pending_jobs = if job_store_path.exists() {
        JobStore::open(&job_store_path)?.pending_count()?
    } else {
        0
    };

    let failed_queue = FailedRequestQueue::new(
        llm::queue::queue_path_for(&scope::llm_queue_dir(), "local"),
        cfg.queue.max_size,
        cfg.queue.item_ttl_hours,
    );
    let failed_len = failed_queue.len()?;

    let index_stale = match scope::find_project_root(None) {
        Some(root) => {
            let state_path = scope::index_state_path(&root);
            !state_path.exists()
        }
        None => false,
    };

    let payload = json!({
        "cloud_api_key_configured": cloud_configured,
        "local_endpoint": cfg.local.endpoint,
        "pending_jobs": pending_jobs,
        "failed_llm_requests": failed_len,
        "index_likely_stale": index_stale,
    });
    Ok(CmdOutput::new(
        format!(
            "cloud_key={cloud_configured} pending_jobs={pending_jobs} failed_llm_requests={failed_len} index_stale={index_stale}"
        ),
        payload,
    ))
}

fn cmd_config() -> Result<CmdOutput, CliError> {
    let cfg = llm::config::get_or_init(&scope::llm_config_path()).clone();
    let json = serde_json::to_value(&cfg)?;
    let text = toml::to_string_pretty(&cfg).unwrap_or_default();
    Ok(CmdOutput::new(text, json))
}

fn cmd_capture(args: CaptureArgs) -> Result<CmdOutput, CliError> {
    if let Some(transcript_path) = &args.transcript_path {
        let Some(session_id) = &args.session_id else {
            return Err(CliError::BadArgs("--session-id is required with --transcript-path".to_string()));
        };

        let rendered = capture::conversation::capture(
            Path::new(transcript_path),
            session_id,
            args.auto,
            &scope::capture_metadata_path(),
        )?;

        let Some(rendered) = rendered else {
            return Ok(CmdOutput::new("no new turns to capture".to_string(), json!({"captured": false})));
        };

        let allowlist = load_allowlist(None)?;
        let audit_path = scope::audit_log_path(Scope::Global, None);
        let mut transport = build_transport();
        let episode = capture::summarize_and_store(
            &mut transport,
            &[rendered],
            "conversation-capture",
            Scope::Global.as_str(),
            &allowlist,
            Some(&audit_path),
        )?;

        if let Some(episode) = episode {
            let store = open_store(Scope::Global, None)?;
            let id = store.add_episode(&episode)?;
            return Ok(CmdOutput::new(format!("captured conversation as {id}"), json!({"captured": true, "id": id})));
        }
        Ok(CmdOutput::new("no new turns to capture".to_string(), json!({"captured": false})))
    } else {
        cmd_summarize(args.scope)
    }
}

fn load_index_state(path: &Path) -> Result<IndexState, GraphitiError> {
    if !path.exists() {
        return Ok(IndexState::default());
    }
    let data = std::fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(IndexState::default());
    }
    Ok(serde_json::from_str(&data)?)
}

fn save_index_state(path: &Path, state: &IndexState) -> Result<(), GraphitiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    graphiti_core::mdm::utils::write_atomic(path, serde_json::to_vec_pretty(state)?.as_slice())
}

fn cmd_index(args: IndexArgs) -> Result<CmdOutput, CliError> {
    let (_scope, project_root) = resolve_scope(args.scope)?;
    let repo = project_root
        .or_else(|| scope::find_project_root(None))
        .ok_or_else(|| CliError::BadArgs("not inside a git repository".to_string()))?;

    let state_path = scope::index_state_path(&repo);
    let mut state = load_index_state(&state_path)?;
    let mut transport = build_transport();

    let outcome = indexer::run_index(&mut transport, &repo, &mut state, args.since.as_deref(), args.full)?;
    save_index_state(&state_path, &state)?;

    if let Some(reason) = &outcome.skipped_reason {
        return Ok(CmdOutput::new(format!("skipped: {reason}"), json!({"skipped_reason": reason})));
    }

    Ok(CmdOutput::new(
        format!("indexed {} commit(s), skipped {}", outcome.indexed_commits, outcome.skipped_commits),
        json!({"indexed_commits": outcome.indexed_commits, "skipped_commits": outcome.skipped_commits}),
    ))
}

fn cmd_hooks(command: HooksCommand) -> Result<CmdOutput, CliError> {
    let repo = scope::find_project_root(None)
        .ok_or_else(|| CliError::BadArgs("not inside a git repository".to_string()))?;

    match command {
        HooksCommand::Install => {
            let mut installed = Vec::new();
            for hook_type in MANAGED_HOOK_TYPES {
                if hooks::installer::install(&repo, hook_type)? {
                    installed.push(hook_type.to_string());
                }
            }
            if hooks::claude_settings::install(&repo)? {
                installed.push("claude-stop-hook".to_string());
            }
            Ok(CmdOutput::new(
                format!("installed: {}", installed.join(", ")),
                json!({"installed": installed}),
            ))
        }
        HooksCommand::Uninstall => {
            let mut removed = Vec::new();
            for hook_type in MANAGED_HOOK_TYPES {
                if hooks::installer::uninstall(&repo, hook_type)? {
                    removed.push(hook_type.to_string());
                }
            }
            if hooks::claude_settings::uninstall(&repo)? {
                removed.push("claude-stop-hook".to_string());
            }
            Ok(CmdOutput::new(
                format!("removed: {}", removed.join(", ")),
                json!({"removed": removed}),
            ))
        }
        HooksCommand::Status => {
            let mut status = serde_json::Map::new();
            for hook_type in MANAGED_HOOK_TYPES {
                status.insert((*hook_type).to_string(), json!(hooks::installer::is_installed(&repo, hook_type)));
            }
            status.insert("claude-stop-hook".to_string(), json!(hooks::claude_settings::is_installed(&repo)));
            let text = status.iter().map(|(k, v)| format!("{k}: {v}")).collect::<Vec<_>>().join("\n");
            Ok(CmdOutput::new(text, Value::Object(status)))
        }
    }
}

fn dispatch_job_payload(transport: &mut Transport, payload: &JobPayload) -> Result<(), GraphitiError> {
    match payload {
        JobPayload::CaptureGitCommits { pending_file } => {
            let repo = scope::find_project_root(None).unwrap_or_else(|| PathBuf::from("."));
            let allowlist = load_allowlist(Some(&repo)).map_err(|e| match e {
                CliError::Graphiti(e) => e,
                CliError::BadArgs(m) => GraphitiError::Generic(m),
            })?;
            let audit_path = scope::audit_log_path(Scope::Project, Some(&repo));
            let (episodes, _skipped) = capture::process_pending_commits(
                transport,
                Path::new(pending_file),
                &repo,
                CAPTURE_BATCH_SIZE,
                MAX_DIFF_LINES_PER_FILE,
                Scope::Project.as_str(),
                &allowlist,
                Some(&audit_path),
            )?;
            let store = GraphStore::open(&scope::graph_db_path(Scope::Project, Some(&repo)))?;
            for episode in &episodes {
                store.add_episode(episode)?;
            }
            Ok(())
        }
        JobPayload::CaptureConversation { transcript_path, session_id } => {
            let rendered = capture::conversation::capture(
                Path::new(transcript_path),
                session_id,
                true,
                &scope::capture_metadata_path(),
            )?;
            let Some(rendered) = rendered else { return Ok(()) };
            let allowlist = graphiti_core::models::Allowlist::default();
            let audit_path = scope::audit_log_path(Scope::Global, None);
            let episode = capture::summarize_and_store(
                transport,
                &[rendered],
                "conversation-capture",
                Scope::Global.as_str(),
                &allowlist,
                Some(&audit_path),
            )?;
            if let Some(episode) = episode {
                let store = GraphStore::open(&scope::graph_db_path(Scope::Global, None))?;
                store.add_episode(&episode)?;
            }
            Ok(())
        }
        JobPayload::IndexRepository { project_root, full } => {
            let repo = PathBuf::from(project_root);
            let state_path = scope::index_state_path(&repo);
            let mut state = load_index_state(&state_path)?;
            indexer::run_index(transport, &repo, &mut state, None, *full)?;
            save_index_state(&state_path, &state)
        }
        JobPayload::CliReplay { .. } => {
            jobqueue::dispatch_job(payload, &current_exe()).map_err(GraphitiError::Generic)
        }
    }
}

fn cmd_queue(command: QueueCommand) -> Result<CmdOutput, CliError> {
    match command {
        QueueCommand::Status => {
            let job_store_path = scope::job_queue_dir().join("jobs.db");
            let (pending, dead) = if job_store_path.exists() {
                let store = JobStore::open(&job_store_path)?;
                (store.pending_count()?, store.dead_letter_jobs()?.len())
            } else {
                (0, 0)
            };
            Ok(CmdOutput::new(
                format!("pending={pending} dead_letter={dead}"),
                json!({"pending": pending, "dead_letter": dead}),
            ))
        }
        QueueCommand::Process => {
            let mut store = JobStore::open(&scope::job_queue_dir().join("jobs.db"))?;
            let stop = StopSignal::new();
            let transport = std::sync::Mutex::new(build_transport());
            let mut total_ack = 0usize;
            let mut total_dead = 0usize;

            loop {
                let batch = store.get_batch(jobqueue::worker::DEFAULT_POOL_SIZE)?;
                if batch.is_empty() {
                    break;
                }
                let results = jobqueue::run_batch(
                    batch,
                    jobqueue::worker::DEFAULT_MAX_RETRIES,
                    jobqueue::worker::DEFAULT_POOL_SIZE,
                    &stop,
                    |payload| {
                        let mut guard = transport.lock().unwrap();
                        dispatch_job_payload(&mut guard, payload).map_err(|e| e.to_string())
                    },
                );
                for (id, outcome) in results {
                    let ok = outcome.is_ok();
                    jobqueue::worker::apply_outcome(
                        &mut store,
                        &id,
                        outcome,
                        jobqueue::worker::DEFAULT_MAX_RETRIES,
                        &stop,
                    )?;
                    if ok {
                        total_ack += 1;
                    } else if store.dead_letter_jobs()?.iter().any(|d| d.id == id) {
                        total_dead += 1;
                    }
                }
            }

            Ok(CmdOutput::new(
                format!("processed {total_ack} job(s), {total_dead} dead-lettered"),
                json!({"acked": total_ack, "dead_lettered": total_dead}),
            ))
        }
        QueueCommand::Retry => {
            let cfg = llm::config::get_or_init(&scope::llm_config_path()).clone();
            let queue = FailedRequestQueue::new(
                llm::queue::queue_path_for(&scope::llm_queue_dir(), "local"),
                cfg.queue.max_size,
                cfg.queue.item_ttl_hours,
            );
            let mut transport = build_transport();
            let (processed, failed, expired) = queue.drain(|op, params| {
                let model = params.get("model").and_then(Value::as_str);
                match op {
                    LLMOperation::Chat | LLMOperation::Generate | LLMOperation::Embed => transport
                        .dispatch(op, model, params.clone())
                        .map(|_| ())
                        .map_err(|e| e.to_string()),
                }
            })?;
            Ok(CmdOutput::new(
                format!("processed={processed} failed={failed} expired={expired}"),
                json!({"processed": processed, "failed": failed, "expired": expired}),
            ))
        }
    }
}

fn cmd_mcp(command: McpCommand) -> Result<CmdOutput, CliError> {
    match command {
        McpCommand::Serve => {
            let repo = scope::find_project_root(None).unwrap_or_else(|| PathBuf::from("."));
            mcp::run_server(current_exe(), repo);
            Ok(CmdOutput::new("mcp server stopped".to_string(), json!({})))
        }
        McpCommand::Install => {
            let installed = mcp::install::install(&current_exe(), false)?;
            Ok(CmdOutput::new(
                if installed { "registered graphiti MCP server" } else { "already registered" }.to_string(),
                json!({"installed": installed}),
            ))
        }
    }
}

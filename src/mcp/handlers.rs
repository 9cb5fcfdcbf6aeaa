//! Tool/resource definitions and dispatch. Every tool (save `capture`,
//! which is fire-and-forget) shells out to the `graphiti` CLI itself with
//! `--format json` and returns its stdout verbatim as tool-call text.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};

use super::process::{run_cli, spawn_detached};
use super::protocol::{ResourceContent, ResourceDefinition, ResourceReadResult, ToolCallResult, ToolDefinition};
use crate::scope;

pub const CONTEXT_RESOURCE_URI: &str = "graphiti://context";
const DEFAULT_TOKEN_BUDGET: usize = 8192;
const CHARS_PER_TOKEN: usize = 4;

pub struct HandlerContext {
    pub current_exe: PathBuf,
}

/// Tools with a non-default timeout; every other tool defaults to 30 s.
/// Range is the spec's 10-120 s band.
fn timeout_for(tool: &str) -> Duration {
    match tool {
        "health" => Duration::from_secs(10),
        "index" => Duration::from_secs(120),
        "summarize" | "compact" => Duration::from_secs(90),
        _ => Duration::from_secs(30),
    }
}

/// `{"global": {...}, "project": {...}}`, merged into a tool's own
/// properties map (`json!`'s object literal has no spread operator).
fn scope_properties() -> serde_json::Map<String, Value> {
    json!({
        "global": {"type": "boolean", "description": "Operate on the global scope"},
        "project": {"type": "boolean", "description": "Operate on the project scope"}
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

fn with_scope_properties(mut properties: serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
    properties.extend(scope_properties());
    properties
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "add".to_string(),
            description: "Add a node or fact to the knowledge graph.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": with_scope_properties(
                    json!({"content": {"type": "string"}}).as_object().cloned().unwrap_or_default()
                ),
                "required": ["content"]
            }),
        },
        ToolDefinition {
            name: "search".to_string(),
            description: "Search the knowledge graph for relevant episodes.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": with_scope_properties(
                    json!({"query": {"type": "string"}, "limit": {"type": "integer"}})
                        .as_object().cloned().unwrap_or_default()
                ),
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "list".to_string(),
            description: "List recent episodes in the knowledge graph.".to_string(),
            input_schema: json!({"type": "object", "properties": scope_properties()}),
        },
        ToolDefinition {
            name: "show".to_string(),
            description: "Show a single episode by id.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": with_scope_properties(
                    json!({"id": {"type": "string"}}).as_object().cloned().unwrap_or_default()
                ),
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "delete".to_string(),
            description: "Delete an episode by id.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": with_scope_properties(
                    json!({"id": {"type": "string"}}).as_object().cloned().unwrap_or_default()
                ),
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "summarize".to_string(),
            description: "Force an on-demand summarization of pending commits/turns.".to_string(),
            input_schema: json!({"type": "object", "properties": scope_properties()}),
        },
        ToolDefinition {
            name: "compact".to_string(),
            description: "Compact/prune stale episodes from the graph.".to_string(),
            input_schema: json!({"type": "object", "properties": scope_properties()}),
        },
        ToolDefinition {
            name: "health".to_string(),
            description: "Report cloud/local LLM reachability, queue depth, and index staleness.".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "config".to_string(),
            description: "Show the current effective configuration.".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "capture".to_string(),
            description: "Capture the current AI-assistant conversation transcript (runs detached, no result is awaited).".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "transcript_path": {"type": "string"},
                    "session_id": {"type": "string"}
                },
                "required": ["transcript_path", "session_id"]
            }),
        },
        ToolDefinition {
            name: "index".to_string(),
            description: "Replay git history into the knowledge graph.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"full": {"type": "boolean"}, "since": {"type": "string"}}
            }),
        },
        ToolDefinition {
            name: "queue_status".to_string(),
            description: "Report job queue and LLM failed-request queue depth.".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
        },
    ]
}

fn scope_args(arguments: &Value) -> Vec<&'static str> {
    let mut args = Vec::new();
    if arguments.get("global").and_then(Value::as_bool) == Some(true) {
        args.push("--global");
    }
    if arguments.get("project").and_then(Value::as_bool) == Some(true) {
        args.push("--project");
    }
    args
}

pub fn dispatch_tool(ctx: &HandlerContext, tool_name: &str, arguments: &Value) -> ToolCallResult {
    if tool_name == "capture" {
        let transcript_path = arguments.get("transcript_path").and_then(Value::as_str).unwrap_or_default();
        let session_id = arguments.get("session_id").and_then(Value::as_str).unwrap_or_default();
        spawn_detached(
            &ctx.current_exe,
            &["capture", "--auto", "--transcript-path", transcript_path, "--session-id", session_id],
        );
        return ToolCallResult::text("capture started".to_string());
    }

    let mut args: Vec<String> = match tool_name {
        "queue_status" => vec!["queue".to_string(), "status".to_string()],
        other => vec![other.to_string()],
    };

    match tool_name {
        "search" => {
            if let Some(q) = arguments.get("query").and_then(Value::as_str) {
                args.push("--query".to_string());
                args.push(q.to_string());
            }
            if let Some(limit) = arguments.get("limit").and_then(Value::as_i64) {
                args.push("--limit".to_string());
                args.push(limit.to_string());
            }
        }
        "add" => {
            if let Some(c) = arguments.get("content").and_then(Value::as_str) {
                args.push("--content".to_string());
                args.push(c.to_string());
            }
        }
        "show" | "delete" => {
            if let Some(id) = arguments.get("id").and_then(Value::as_str) {
                args.push("--id".to_string());
                args.push(id.to_string());
            }
        }
        "index" => {
            if arguments.get("full").and_then(Value::as_bool) == Some(true) {
                args.push("--full".to_string());
            }
            if let Some(since) = arguments.get("since").and_then(Value::as_str) {
                args.push("--since".to_string());
                args.push(since.to_string());
            }
        }
        _ => {}
    }

    let scope = scope_args(arguments);
    args.extend(scope.into_iter().map(String::from));

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    match run_cli(&ctx.current_exe, &arg_refs, timeout_for(tool_name)) {
        Ok(stdout) => ToolCallResult::text(stdout),
        Err(e) => ToolCallResult::error(e),
    }
}

pub fn resource_definitions() -> Vec<ResourceDefinition> {
    vec![ResourceDefinition {
        uri: CONTEXT_RESOURCE_URI.to_string(),
        name: "context".to_string(),
        mime_type: "text/plain".to_string(),
    }]
}

fn current_head_short_sha(repo: &std::path::Path) -> Option<String> {
    let output = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(repo)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Context-resource handler (spec §4.L): stale check against the persisted
/// `last_indexed_sha`, a non-blocking detached re-index if stale, and an
/// independent bounded-token-budget search. Runs in < 10 ms for the stale
/// check itself; the search below it is the dominant cost.
pub fn read_context_resource(ctx: &HandlerContext, repo: &std::path::Path, token_budget: Option<usize>) -> ResourceReadResult {
    let state_path = scope::index_state_path(repo);
    let last_indexed_sha = std::fs::read_to_string(&state_path)
        .ok()
        .and_then(|s| serde_json::from_str::<Value>(&s).ok())
        .and_then(|v| v.get("last_indexed_sha").and_then(Value::as_str).map(String::from));

    let head = current_head_short_sha(repo);
    let is_stale = match (&head, &last_indexed_sha) {
        (Some(h), Some(last)) => !last.starts_with(h.as_str()) && !h.starts_with(last.as_str()),
        _ => true,
    };

    if is_stale {
        spawn_detached(&ctx.current_exe, &["index", "--quiet"]);
    }

    let char_budget = token_budget.unwrap_or(DEFAULT_TOKEN_BUDGET) * CHARS_PER_TOKEN;
    let search_args = ["search", "--query", "decisions architecture"];
    let text = run_cli(&ctx.current_exe, &search_args, Duration::from_secs(5)).unwrap_or_default();
    let text: String = text.chars().take(char_budget).collect();

    ResourceReadResult {
        contents: vec![ResourceContent {
            uri: CONTEXT_RESOURCE_URI.to_string(),
            mime_type: "text/plain".to_string(),
            text,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definitions_cover_cli_surface() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        for expected in ["add", "search", "list", "show", "delete", "summarize", "compact", "health", "config", "capture", "index"] {
            assert!(names.contains(&expected), "missing tool: {expected}");
        }
    }

    #[test]
    fn dispatch_capture_does_not_run_cli_subprocess() {
        let ctx = HandlerContext { current_exe: PathBuf::from("/nonexistent/graphiti") };
        let result = dispatch_tool(&ctx, "capture", &json!({"transcript_path": "/tmp/t.jsonl", "session_id": "abc"}));
        assert!(!result.is_error);
    }

    #[test]
    fn resource_definitions_expose_context() {
        let resources = resource_definitions();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri, CONTEXT_RESOURCE_URI);
    }
}

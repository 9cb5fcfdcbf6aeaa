//! MCP stdio event loop: read one JSON-RPC request per line from stdin,
//! write one response per line to stdout. Every other log line goes
//! through `tracing`, which this crate routes to stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::handlers::{self, HandlerContext};
use super::protocol::*;

pub fn run_server(current_exe: PathBuf, repo: PathBuf) {
    let ctx = HandlerContext { current_exe };

    let stdin = io::stdin();
    let reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!(error = %e, "error reading stdin");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "failed to parse JSON-RPC request");
                let err = JsonRpcErrorResponse::new(Value::Null, -32700, format!("Parse error: {e}"));
                write_frame(&mut writer, &err);
                continue;
            }
        };

        // Notifications (no id) get no response.
        let Some(id) = request.id else {
            debug!(method = %request.method, "received notification");
            continue;
        };

        let response = handle_request(&ctx, &repo, &request.method, &request.params, id);
        write_frame(&mut writer, &response);
    }
}

fn write_frame<W: Write, T: serde::Serialize>(writer: &mut W, value: &T) {
    if let Ok(s) = serde_json::to_string(value) {
        let _ = writeln!(writer, "{s}");
        let _ = writer.flush();
    }
}

fn handle_request(ctx: &HandlerContext, repo: &std::path::Path, method: &str, params: &Option<Value>, id: Value) -> Value {
    match method {
        "initialize" => to_value(JsonRpcResponse::new(id, serde_json::to_value(InitializeResult::new()).unwrap())),
        "tools/list" => {
            let result = ToolsListResult { tools: handlers::tool_definitions() };
            to_value(JsonRpcResponse::new(id, serde_json::to_value(result).unwrap()))
        }
        "tools/call" => {
            let Some(params) = params else {
                let result = ToolCallResult::error("Missing params".to_string());
                return to_value(JsonRpcResponse::new(id, serde_json::to_value(result).unwrap()));
            };
            let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
            let arguments = params.get("arguments").cloned().unwrap_or(Value::Object(serde_json::Map::new()));
            let result = handlers::dispatch_tool(ctx, tool_name, &arguments);
            to_value(JsonRpcResponse::new(id, serde_json::to_value(result).unwrap()))
        }
        "resources/list" => {
            let result = ResourcesListResult { resources: handlers::resource_definitions() };
            to_value(JsonRpcResponse::new(id, serde_json::to_value(result).unwrap()))
        }
        "resources/read" => {
            let uri = params.as_ref().and_then(|p| p.get("uri")).and_then(Value::as_str).unwrap_or("");
            if uri != handlers::CONTEXT_RESOURCE_URI {
                return to_value(JsonRpcErrorResponse::new(id, -32602, format!("Unknown resource: {uri}")));
            }
            let result = handlers::read_context_resource(ctx, repo, None);
            to_value(JsonRpcResponse::new(id, serde_json::to_value(result).unwrap()))
        }
        "ping" => to_value(JsonRpcResponse::new(id, json!({}))),
        _ => to_value(JsonRpcErrorResponse::new(id, -32601, format!("Method not found: {method}"))),
    }
}

fn to_value<T: serde::Serialize>(v: T) -> Value {
    serde_json::to_value(v).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> HandlerContext {
        HandlerContext { current_exe: PathBuf::from("/nonexistent/graphiti") }
    }

    #[test]
    fn initialize_reports_protocol_version() {
        let result = handle_request(&ctx(), &PathBuf::from("."), "initialize", &None, json!(1));
        assert_eq!(result["result"]["protocolVersion"], "2025-03-26");
    }

    #[test]
    fn tools_list_includes_add_and_search() {
        let result = handle_request(&ctx(), &PathBuf::from("."), "tools/list", &None, json!(2));
        let names: Vec<String> = result["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert!(names.contains(&"add".to_string()));
        assert!(names.contains(&"search".to_string()));
    }

    #[test]
    fn unknown_method_returns_error() {
        let result = handle_request(&ctx(), &PathBuf::from("."), "bogus/method", &None, json!(3));
        assert_eq!(result["error"]["code"], -32601);
    }

    #[test]
    fn resources_read_rejects_unknown_uri() {
        let params = json!({"uri": "graphiti://nope"});
        let result = handle_request(&ctx(), &PathBuf::from("."), "resources/read", &Some(params), json!(4));
        assert_eq!(result["error"]["code"], -32602);
    }
}

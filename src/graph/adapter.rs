//! Graph-engine LLM/embed facades (component D).
//!
//! The graph engine only ever sees this narrow interface: `chat` returning
//! free text or schema-validated structured output, and `create`/`create_batch`
//! for embeddings. No teacher module plays this role directly; the prompt
//! manipulation (schema-suffix stripping, bare-list wrapping, code-fence
//! stripping) follows spec §4.D verbatim since it's a graph-engine-specific
//! contract, not something the teacher's CLI-oriented LLM usage needed.

use crate::error::GraphitiError;
use crate::llm::Transport;
use crate::models::LLMOperation;
use serde_json::Value;

const SCHEMA_SUFFIX_MARKER: &str = "Respond with a JSON object in the following format:";

/// Strip a trailing "Respond with a JSON object in the following format: {...}"
/// block from `text`, if present, so the schema isn't specified twice when
/// it's also passed as a structured-output parameter.
pub fn strip_schema_suffix(text: &str) -> String {
    match text.find(SCHEMA_SUFFIX_MARKER) {
        Some(idx) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Parse a model response against an expected JSON schema: strip
/// triple-backtick fences, then if the result is a bare list but the schema
/// declares exactly one list-typed property, wrap it as `{field: list}`.
pub fn parse_structured_response(raw: &str, schema: &Value) -> Result<Value, GraphitiError> {
    let unfenced = strip_code_fences(raw);
    let parsed: Value = serde_json::from_str(unfenced.trim())
        .map_err(|e| GraphitiError::SchemaValidation(format!("invalid JSON: {e}")))?;

    if parsed.is_array() {
        if let Some(field) = sole_list_field(schema) {
            let mut obj = serde_json::Map::new();
            obj.insert(field, parsed);
            return Ok(Value::Object(obj));
        }
    }
    Ok(parsed)
}

fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches('\n');
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim().to_string();
        }
        return rest.trim().to_string();
    }
    trimmed.to_string()
}

fn sole_list_field(schema: &Value) -> Option<String> {
    let properties = schema.get("properties")?.as_object()?;
    let list_fields: Vec<&String> = properties
        .iter()
        .filter(|(_, v)| v.get("type").and_then(|t| t.as_str()) == Some("array"))
        .map(|(k, _)| k)
        .collect();
    if list_fields.len() == 1 {
        Some(list_fields[0].clone())
    } else {
        None
    }
}

/// Send `messages` (optionally against a response schema) through the LLM
/// transport in a worker thread, returning structured output when a schema
/// was given and free text otherwise.
pub fn chat(
    transport: &mut Transport,
    mut messages: Vec<Value>,
    schema: Option<&Value>,
) -> Result<Value, GraphitiError> {
    if let Some(schema) = schema {
        if let Some(last) = messages.last_mut() {
            if let Some(content) = last.get("content").and_then(|c| c.as_str()) {
                let stripped = strip_schema_suffix(content);
                last["content"] = Value::String(stripped);
            }
        }
        let body = serde_json::json!({
            "messages": messages,
            "format": schema,
        });
        let response = transport.dispatch(LLMOperation::Chat, None, body)?;
        parse_structured_response(&response.text, schema)
    } else {
        let body = serde_json::json!({ "messages": messages });
        let response = transport.dispatch(LLMOperation::Chat, None, body)?;
        Ok(Value::String(response.text))
    }
}

/// Embed one string.
pub fn create(transport: &mut Transport, text: &str) -> Result<Vec<f64>, GraphitiError> {
    let body = serde_json::json!({ "input": text });
    let response = transport.dispatch(LLMOperation::Embed, None, body)?;
    let parsed: Value = serde_json::from_str(&response.text)?;
    let vector = parsed
        .get("embeddings")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .or_else(|| parsed.get("embedding"))
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|n| n.as_f64()).collect())
        .unwrap_or_default();
    Ok(vector)
}

/// Embed many strings as sequential `create` calls — no hidden parallelism
/// (spec §4.D is explicit that batching here must not hide concurrency).
pub fn create_batch(transport: &mut Transport, texts: &[String]) -> Result<Vec<Vec<f64>>, GraphitiError> {
    texts.iter().map(|t| create(transport, t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_schema_suffix() {
        let text = "Summarize this.\n\nRespond with a JSON object in the following format: {\"a\": 1}";
        assert_eq!(strip_schema_suffix(text), "Summarize this.");
    }

    #[test]
    fn leaves_text_without_suffix_unchanged() {
        let text = "Summarize this.";
        assert_eq!(strip_schema_suffix(text), text);
    }

    #[test]
    fn strips_code_fences_before_parsing() {
        let raw = "```json\n{\"a\": 1}\n```";
        let schema = serde_json::json!({"properties": {"a": {"type": "integer"}}});
        let parsed = parse_structured_response(raw, &schema).unwrap();
        assert_eq!(parsed["a"], 1);
    }

    #[test]
    fn wraps_bare_list_into_sole_list_field() {
        let raw = "[1, 2, 3]";
        let schema = serde_json::json!({
            "properties": { "items": { "type": "array" } }
        });
        let parsed = parse_structured_response(raw, &schema).unwrap();
        assert_eq!(parsed["items"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn leaves_bare_list_alone_when_schema_has_no_sole_list_field() {
        let raw = "[1, 2, 3]";
        let schema = serde_json::json!({
            "properties": { "a": { "type": "integer" }, "b": { "type": "array" }, "c": {"type": "array"} }
        });
        let parsed = parse_structured_response(raw, &schema).unwrap();
        assert!(parsed.is_array());
    }
}

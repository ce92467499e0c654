//! The seven MCP tools: definitions and dispatch into the engine.
//!
//! Tool responses carry human-readable text plus a machine-readable
//! `details` payload with discriminator codes.

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use engram_core::chunk::ChunkKind;
use engram_engine::{MemoryEngine, RememberAction, ReplaceBlockOutcome, StoreOutcome};

/// Outcome of one tool call, transport-agnostic.
pub struct ToolResult {
    pub text: String,
    pub details: Value,
    pub is_error: bool,
}

impl ToolResult {
    fn ok(text: impl Into<String>, details: Value) -> Self {
        Self {
            text: text.into(),
            details,
            is_error: false,
        }
    }

    fn err(text: impl Into<String>, code: &str) -> Self {
        Self {
            text: text.into(),
            details: json!({ "code": code }),
            is_error: true,
        }
    }
}

/// JSON Schema for a tool taking `agent_id` plus the given properties.
fn schema(mut properties: serde_json::Map<String, Value>, required: &[&str]) -> Value {
    properties.insert(
        "agent_id".to_string(),
        json!({ "type": "string", "description": "Agent namespace for this memory operation" }),
    );
    properties.insert(
        "scope".to_string(),
        json!({ "type": "string", "description": "Optional partition within the agent; omit for the global scope" }),
    );
    let mut all_required = vec!["agent_id"];
    all_required.extend_from_slice(required);
    json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": all_required,
    })
}

fn props(entries: &[(&str, Value)]) -> serde_json::Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// All seven tool definitions, in the shape `tools/list` returns.
pub fn tool_definitions() -> Value {
    json!([
        {
            "name": "remember_facts",
            "description": "Extract factual claims from text and reconcile them against existing memory (insert, reinforce, or supersede).",
            "inputSchema": schema(props(&[
                ("text", json!({ "type": "string", "description": "Free-form text to extract facts from" })),
            ]), &["text"]),
        },
        {
            "name": "store_memory",
            "description": "Store raw content verbatim. Duplicate content strengthens the existing memory instead of creating a new one.",
            "inputSchema": schema(props(&[
                ("content", json!({ "type": "string", "description": "Content to store" })),
                ("metadata", json!({ "type": "string", "description": "Optional JSON metadata" })),
            ]), &["content"]),
        },
        {
            "name": "recall_memories",
            "description": "Semantic search over stored facts and memories, ranked by similarity, strength, and recency.",
            "inputSchema": schema(props(&[
                ("query", json!({ "type": "string", "description": "What to recall" })),
                ("limit", json!({ "type": "integer", "description": "Max results (1-50, default 10)" })),
                ("kind", json!({ "type": "string", "enum": ["fact", "memory"], "description": "Restrict to one chunk kind" })),
            ]), &["query"]),
        },
        {
            "name": "forget_memory",
            "description": "Delete memories matching a description. Facts the deleted entries had superseded become visible again.",
            "inputSchema": schema(props(&[
                ("description", json!({ "type": "string", "description": "What to forget" })),
                ("threshold", json!({ "type": "number", "description": "Similarity threshold (default 0.7)" })),
            ]), &["description"]),
        },
        {
            "name": "recall_memory_block",
            "description": "Read a named memory block.",
            "inputSchema": schema(props(&[
                ("key", json!({ "type": "string", "description": "Block key" })),
            ]), &["key"]),
        },
        {
            "name": "replace_memory_block",
            "description": "Replace all occurrences of a substring inside a named memory block.",
            "inputSchema": schema(props(&[
                ("key", json!({ "type": "string", "description": "Block key" })),
                ("old_text", json!({ "type": "string", "description": "Substring to replace" })),
                ("new_text", json!({ "type": "string", "description": "Replacement text" })),
            ]), &["key", "old_text", "new_text"]),
        },
        {
            "name": "append_memory_block",
            "description": "Append text to a named memory block, creating it if missing.",
            "inputSchema": schema(props(&[
                ("key", json!({ "type": "string", "description": "Block key" })),
                ("text", json!({ "type": "string", "description": "Text to append" })),
            ]), &["key", "text"]),
        },
    ])
}

fn str_arg<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolResult> {
    args.get(name).and_then(Value::as_str).ok_or_else(|| {
        ToolResult::err(format!("missing required argument '{name}'"), "invalid_arguments")
    })
}

fn opt_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

/// Dispatch a `tools/call` into the engine.
pub async fn call_tool(
    engine: &MemoryEngine,
    name: &str,
    args: &Value,
    cancel: &CancellationToken,
) -> ToolResult {
    let agent_id = match str_arg(args, "agent_id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let scope = opt_str(args, "scope");

    let result = match name {
        "remember_facts" => remember_facts(engine, agent_id, args, scope, cancel).await,
        "store_memory" => store_memory(engine, agent_id, args, scope, cancel).await,
        "recall_memories" => recall_memories(engine, agent_id, args, scope, cancel).await,
        "forget_memory" => forget_memory(engine, agent_id, args, scope, cancel).await,
        "recall_memory_block" => recall_block(engine, agent_id, args, scope),
        "replace_memory_block" => replace_block(engine, agent_id, args, scope),
        "append_memory_block" => append_block(engine, agent_id, args, scope),
        other => Ok(ToolResult::err(format!("unknown tool '{other}'"), "unknown_tool")),
    };

    match result {
        Ok(tool_result) => tool_result,
        Err(e) => ToolResult::err(e.to_string(), e.code()),
    }
}

async fn remember_facts(
    engine: &MemoryEngine,
    agent_id: &str,
    args: &Value,
    scope: Option<&str>,
    cancel: &CancellationToken,
) -> engram_core::EngramResult<ToolResult> {
    let text = match str_arg(args, "text") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let actions = engine.remember_facts(agent_id, text, scope, cancel).await?;

    if actions.is_empty() {
        return Ok(ToolResult::ok(
            "No facts worth remembering were found in the text.",
            json!({ "actions": [] }),
        ));
    }
    let lines: Vec<String> = actions
        .iter()
        .map(|a| match a {
            RememberAction::Inserted { content, .. } => format!("remembered: {content}"),
            RememberAction::Reinforced { content, .. } => format!("reinforced: {content}"),
            RememberAction::Superseded {
                new_content,
                old_content,
            } => format!("updated: {new_content} (was: {old_content})"),
        })
        .collect();
    Ok(ToolResult::ok(
        lines.join("\n"),
        json!({ "actions": actions }),
    ))
}

async fn store_memory(
    engine: &MemoryEngine,
    agent_id: &str,
    args: &Value,
    scope: Option<&str>,
    cancel: &CancellationToken,
) -> engram_core::EngramResult<ToolResult> {
    let content = match str_arg(args, "content") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let metadata = opt_str(args, "metadata");
    let outcome = engine
        .store_memory(agent_id, content, metadata, scope, cancel)
        .await?;
    let text = match &outcome {
        StoreOutcome::Stored { .. } => "Memory stored.".to_string(),
        StoreOutcome::Strengthened { encounter_count, .. } => {
            format!("Memory already present; strengthened (seen {encounter_count} times).")
        }
    };
    Ok(ToolResult::ok(text, json!({ "outcome": outcome })))
}

async fn recall_memories(
    engine: &MemoryEngine,
    agent_id: &str,
    args: &Value,
    scope: Option<&str>,
    cancel: &CancellationToken,
) -> engram_core::EngramResult<ToolResult> {
    let query = match str_arg(args, "query") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let limit = args.get("limit").and_then(Value::as_u64).map(|v| v as usize);
    let kind = opt_str(args, "kind").and_then(ChunkKind::parse);
    let scopes = scope.map(|s| vec![s.to_string()]);

    let hits = engine
        .recall_memories(agent_id, query, limit, kind, scopes.as_deref(), cancel)
        .await?;

    if hits.is_empty() {
        return Ok(ToolResult::ok("No matching memories.", json!({ "results": [] })));
    }
    let lines: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. [{:.2}] {}", i + 1, hit.score, hit.chunk.content))
        .collect();
    let results: Vec<Value> = hits
        .iter()
        .map(|hit| {
            json!({
                "id": hit.chunk.id,
                "kind": hit.chunk.kind,
                "content": hit.chunk.content,
                "metadata": hit.chunk.metadata,
                "similarity": hit.similarity,
                "strength": hit.strength,
                "score": hit.score,
            })
        })
        .collect();
    Ok(ToolResult::ok(lines.join("\n"), json!({ "results": results })))
}

async fn forget_memory(
    engine: &MemoryEngine,
    agent_id: &str,
    args: &Value,
    scope: Option<&str>,
    cancel: &CancellationToken,
) -> engram_core::EngramResult<ToolResult> {
    let description = match str_arg(args, "description") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let threshold = args.get("threshold").and_then(Value::as_f64);
    let scopes = scope.map(|s| vec![s.to_string()]);

    let deleted = engine
        .forget_memory(agent_id, description, threshold, scopes.as_deref(), cancel)
        .await?;
    let text = if deleted.is_empty() {
        "Nothing matched closely enough to forget.".to_string()
    } else {
        format!(
            "Forgot {} memor{}:\n{}",
            deleted.len(),
            if deleted.len() == 1 { "y" } else { "ies" },
            deleted.join("\n")
        )
    };
    Ok(ToolResult::ok(text, json!({ "deleted": deleted })))
}

fn recall_block(
    engine: &MemoryEngine,
    agent_id: &str,
    args: &Value,
    scope: Option<&str>,
) -> engram_core::EngramResult<ToolResult> {
    let key = match str_arg(args, "key") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    match engine.recall_block(agent_id, key, scope)? {
        Some(block) => Ok(ToolResult::ok(
            block.value.clone(),
            json!({ "found": true, "key": key, "value": block.value }),
        )),
        None => Ok(ToolResult::ok(
            format!("No memory block named '{key}'."),
            json!({ "found": false, "key": key }),
        )),
    }
}

fn replace_block(
    engine: &MemoryEngine,
    agent_id: &str,
    args: &Value,
    scope: Option<&str>,
) -> engram_core::EngramResult<ToolResult> {
    let key = match str_arg(args, "key") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let old_text = match str_arg(args, "old_text") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let new_text = match str_arg(args, "new_text") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };

    let outcome = engine.replace_block(agent_id, key, old_text, new_text, scope)?;
    let text = match &outcome {
        ReplaceBlockOutcome::Replaced { replacements } => {
            format!("Replaced {replacements} occurrence(s) in '{key}'.")
        }
        ReplaceBlockOutcome::BlockNotFound => format!("No memory block named '{key}'."),
        ReplaceBlockOutcome::EmptyOldText => "old_text must not be empty.".to_string(),
        ReplaceBlockOutcome::TextNotFound => {
            format!("The text to replace was not found in '{key}'.")
        }
    };
    let is_error = !matches!(outcome, ReplaceBlockOutcome::Replaced { .. });
    Ok(ToolResult {
        text,
        details: json!({ "code": outcome.code(), "outcome": outcome }),
        is_error,
    })
}

fn append_block(
    engine: &MemoryEngine,
    agent_id: &str,
    args: &Value,
    scope: Option<&str>,
) -> engram_core::EngramResult<ToolResult> {
    let key = match str_arg(args, "key") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };
    let text = match str_arg(args, "text") {
        Ok(v) => v,
        Err(e) => return Ok(e),
    };

    let outcome = engine.append_block(agent_id, key, text, scope)?;
    let mut message = if outcome.created {
        format!("Created memory block '{key}'.")
    } else {
        format!("Appended to memory block '{key}'.")
    };
    if outcome.oversized() {
        message.push_str(&format!(
            "\nWarning: block is now {} bytes, past the 100 KiB guideline.",
            outcome.total_bytes
        ));
    }
    Ok(ToolResult::ok(message, json!({ "outcome": outcome })))
}

//! Fact extraction via the LLM capability.
//!
//! The extractor's response contract is a bare JSON array of
//! `{fact, intensity}` objects. Models wrap arrays in markdown fences
//! or objects often enough that parsing is tolerant: fences are
//! stripped, a non-array response counts as zero facts, and malformed
//! entries are dropped rather than failing the batch.

use tokio_util::sync::CancellationToken;

use engram_core::errors::EngramResult;
use engram_core::traits::{ILlmClient, LlmMessage};

/// System prompt for the extraction call.
pub(crate) const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a fact extraction engine for an agent memory system. Extract discrete factual claims from the text that are worth remembering long-term.

Rules:
1. Each fact must be a single, self-contained statement
2. Do NOT include greetings, filler, or speculation
3. Prefer specific claims over vague observations
4. Rate how strongly the text asserts each fact

Return a JSON array. Each element must have exactly these fields:
- "fact": string (one self-contained claim)
- "intensity": number (0.0-1.0, how strongly the text asserts this)

If there is nothing worth extracting, return an empty array: []

Example output:
[
  {"fact": "User lives in Lisbon", "intensity": 0.9},
  {"fact": "User is learning Rust", "intensity": 0.7}
]"#;

/// One extracted claim with its asserted intensity, clamped to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFact {
    pub content: String,
    pub intensity: f64,
}


/// Run the extraction call and parse its response.
pub async fn extract_facts(
    llm: &dyn ILlmClient,
    text: &str,
    cancel: &CancellationToken,
) -> EngramResult<Vec<ExtractedFact>> {
    let messages = [LlmMessage::user(text)];
    let response = llm
        .complete(&messages, EXTRACTION_SYSTEM_PROMPT, cancel)
        .await?;
    Ok(parse_extraction_response(&response))
}

/// Parse the response text into validated facts. Never fails: anything
/// that is not a JSON array of well-formed entries yields zero facts.
pub fn parse_extraction_response(response: &str) -> Vec<ExtractedFact> {
    let body = strip_code_fences(response);
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                error = %e,
                preview = &body[..body.len().min(120)],
                "extraction response is not JSON; treating as zero facts"
            );
            return Vec::new();
        }
    };
    // Object-wrapped arrays are rejected along with everything else
    // that is not a bare array.
    let Some(entries) = value.as_array() else {
        tracing::warn!("extraction response is not a JSON array; treating as zero facts");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let fact = entry.get("fact")?.as_str()?.trim();
            let intensity = entry.get("intensity")?.as_f64()?;
            if fact.is_empty() {
                return None;
            }
            Some(ExtractedFact {
                content: fact.to_string(),
                intensity: intensity.clamp(0.0, 1.0),
            })
        })
        .collect()
}

/// Strip a surrounding markdown code fence (with optional info string).
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") through the first newline.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => return trimmed,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

//! Conflict classification between a new fact and an existing one.
//!
//! The tolerant parser lives next to the verdict so unknown input
//! collapses to `Distinct` at the boundary, not inside the pipeline.

use tokio_util::sync::CancellationToken;

use engram_core::errors::EngramResult;
use engram_core::traits::{ILlmClient, LlmMessage};

/// System prompt for the classification call.
pub(crate) const CLASSIFY_SYSTEM_PROMPT: &str = r#"You compare a NEW statement against an EXISTING remembered statement and answer with exactly one word:

DUPLICATE - the new statement says the same thing as the existing one
SUPERSEDES - the new statement replaces the existing one (the fact changed)
DISTINCT - the statements are about different things and can coexist

Answer with one word only."#;

/// Relationship between a new fact and its nearest existing neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Duplicate,
    Supersedes,
    Distinct,
}

impl Verdict {
    /// Parse an LLM response: first whitespace-delimited token,
    /// stripped of non-letters (bold/backtick/quote framing), matched
    /// case-insensitively. Anything else is `Distinct`.
    pub fn parse(response: &str) -> Self {
        let first = response.split_whitespace().next().unwrap_or("");
        let letters: String = first.chars().filter(char::is_ascii_alphabetic).collect();
        match letters.to_ascii_uppercase().as_str() {
            "DUPLICATE" => Self::Duplicate,
            "SUPERSEDES" => Self::Supersedes,
            "DISTINCT" => Self::Distinct,
            _ => Self::Distinct,
        }
    }
}

/// Ask the LLM capability whether `new_fact` duplicates, supersedes, or
/// is distinct from `existing_fact`.
pub async fn classify_conflict(
    llm: &dyn ILlmClient,
    new_fact: &str,
    existing_fact: &str,
    cancel: &CancellationToken,
) -> EngramResult<Verdict> {
    let prompt = format!("EXISTING: {existing_fact}\nNEW: {new_fact}");
    let messages = [LlmMessage::user(prompt)];
    let response = llm.complete(&messages, CLASSIFY_SYSTEM_PROMPT, cancel).await?;
    Ok(Verdict::parse(&response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_verdicts() {
        assert_eq!(Verdict::parse("DUPLICATE"), Verdict::Duplicate);
        assert_eq!(Verdict::parse("SUPERSEDES"), Verdict::Supersedes);
        assert_eq!(Verdict::parse("DISTINCT"), Verdict::Distinct);
    }

    #[test]
    fn framing_is_tolerated() {
        assert_eq!(Verdict::parse("**SUPERSEDES**"), Verdict::Supersedes);
        assert_eq!(Verdict::parse("`DUPLICATE`"), Verdict::Duplicate);
        assert_eq!(Verdict::parse("\"distinct\""), Verdict::Distinct);
        assert_eq!(Verdict::parse("Duplicate."), Verdict::Duplicate);
        assert_eq!(Verdict::parse("supersedes, because the city changed"), Verdict::Supersedes);
    }

    #[test]
    fn unknown_defaults_to_distinct() {
        assert_eq!(Verdict::parse(""), Verdict::Distinct);
        assert_eq!(Verdict::parse("   "), Verdict::Distinct);
        assert_eq!(Verdict::parse("MAYBE"), Verdict::Distinct);
        assert_eq!(Verdict::parse("I think these are the same"), Verdict::Distinct);
    }
}

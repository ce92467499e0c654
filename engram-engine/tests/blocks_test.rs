//! Memory-block tool tests.

use std::sync::Arc;

use engram_core::config::EngineConfig;
use engram_engine::{MemoryEngine, ReplaceBlockOutcome};
use test_fixtures::{ScriptedLlm, StubEmbedder};

fn engine() -> MemoryEngine {
    MemoryEngine::open_in_memory(
        Arc::new(StubEmbedder::new(4)),
        Arc::new(ScriptedLlm::new()),
        EngineConfig::default(),
    )
    .unwrap()
}

#[test]
fn recall_missing_block_is_none() {
    let engine = engine();
    assert!(engine.recall_block("a1", "persona", None).unwrap().is_none());
}

#[test]
fn append_creates_then_joins_with_newline() {
    let engine = engine();

    let first = engine.append_block("a1", "notes", "line one", None).unwrap();
    assert!(first.created);
    assert!(!first.oversized());

    let second = engine.append_block("a1", "notes", "line two", None).unwrap();
    assert!(!second.created);

    let block = engine.recall_block("a1", "notes", None).unwrap().unwrap();
    assert_eq!(block.value, "line one\nline two");
}

#[test]
fn append_flags_oversized_blocks() {
    let engine = engine();
    let big = "x".repeat(101 * 1024);
    let outcome = engine.append_block("a1", "dump", &big, None).unwrap();
    assert!(outcome.oversized());
    assert_eq!(outcome.total_bytes, big.len());
}

#[test]
fn replace_preconditions_are_structured_outcomes() {
    let engine = engine();

    // Absent block.
    assert_eq!(
        engine.replace_block("a1", "persona", "old", "new", None).unwrap(),
        ReplaceBlockOutcome::BlockNotFound
    );
    assert_eq!(ReplaceBlockOutcome::BlockNotFound.code(), "block_not_found");

    engine.append_block("a1", "persona", "calm and calm", None).unwrap();

    // Empty old_text.
    assert_eq!(
        engine.replace_block("a1", "persona", "", "new", None).unwrap(),
        ReplaceBlockOutcome::EmptyOldText
    );

    // old_text not a substring.
    assert_eq!(
        engine.replace_block("a1", "persona", "anxious", "new", None).unwrap(),
        ReplaceBlockOutcome::TextNotFound
    );
}

#[test]
fn replace_swaps_all_occurrences() {
    let engine = engine();
    engine
        .append_block("a1", "persona", "calm, calm, and calm", None)
        .unwrap();

    let outcome = engine
        .replace_block("a1", "persona", "calm", "curious", None)
        .unwrap();
    assert_eq!(outcome, ReplaceBlockOutcome::Replaced { replacements: 3 });

    let block = engine.recall_block("a1", "persona", None).unwrap().unwrap();
    assert_eq!(block.value, "curious, curious, and curious");
}

#[test]
fn blocks_are_scoped() {
    let engine = engine();
    engine.append_block("a1", "persona", "global", None).unwrap();
    engine.append_block("a1", "persona", "scoped", Some("work")).unwrap();

    assert_eq!(
        engine.recall_block("a1", "persona", None).unwrap().unwrap().value,
        "global"
    );
    assert_eq!(
        engine
            .recall_block("a1", "persona", Some("work"))
            .unwrap()
            .unwrap()
            .value,
        "scoped"
    );
    // Scope is trimmed before lookup.
    assert_eq!(
        engine
            .recall_block("a1", "persona", Some("  work "))
            .unwrap()
            .unwrap()
            .value,
        "scoped"
    );
}

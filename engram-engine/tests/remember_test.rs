//! End-to-end tests for the remember-facts pipeline.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use engram_core::chunk::{Chunk, ChunkKind, Intensity};
use engram_core::config::EngineConfig;
use engram_engine::{MemoryEngine, RememberAction};
use engram_storage::queries::{chunk_ops, chunk_query};
use test_fixtures::{ScriptedLlm, StubEmbedder};

const DIMS: usize = 4;

fn engine() -> (MemoryEngine, Arc<StubEmbedder>, Arc<ScriptedLlm>) {
    let embedder = Arc::new(StubEmbedder::new(DIMS));
    let llm = Arc::new(ScriptedLlm::new());
    let engine = MemoryEngine::open_in_memory(
        embedder.clone(),
        llm.clone(),
        EngineConfig::default(),
    )
    .unwrap();
    (engine, embedder, llm)
}

fn seed_fact(engine: &MemoryEngine, agent: &str, content: &str, embedding: Vec<f32>) -> Chunk {
    let chunk = Chunk::new_fact(agent, "", content, embedding, Intensity::new(0.5));
    engine
        .store()
        .with_conn(|conn| chunk_ops::insert_chunk(conn, &chunk))
        .unwrap();
    chunk
}

fn active_facts(engine: &MemoryEngine, agent: &str) -> Vec<Chunk> {
    engine
        .store()
        .with_conn(|conn| chunk_query::get_active_chunks(conn, agent, ChunkKind::Fact, -1, None))
        .unwrap()
}

#[tokio::test]
async fn duplicate_fact_reinforces_without_classification() {
    let (engine, embedder, llm) = engine();
    let e1 = vec![1.0, 0.0, 0.0, 0.0];
    let seeded = seed_fact(&engine, "a1", "User likes TS", e1.clone());
    embedder.pin("User likes TypeScript", e1);

    llm.push_response(r#"[{"fact": "User likes TypeScript", "intensity": 0.7}]"#);
    let actions = engine
        .remember_facts("a1", "I really like TypeScript", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(actions.len(), 1);
    match &actions[0] {
        RememberAction::Reinforced {
            content,
            old_intensity,
            new_intensity,
        } => {
            assert_eq!(content, "User likes TS");
            assert!((old_intensity - 0.5).abs() < 1e-9);
            // (0.5·1 + 0.7) / 2 = 0.60
            assert!((new_intensity - 0.6).abs() < 1e-9);
        }
        other => panic!("unexpected action: {other:?}"),
    }

    // One row only, counters bumped.
    let facts = active_facts(&engine, "a1");
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].id, seeded.id);
    assert_eq!(facts[0].encounter_count, 2);
    assert!((facts[0].running_intensity.value() - 0.6).abs() < 1e-9);

    // Similarity 1.0 > 0.93: only the extraction call hit the LLM.
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn ambiguous_band_supersession_is_atomic_and_visible() {
    let (engine, embedder, llm) = engine();
    let e_a = vec![1.0, 0.0, 0.0, 0.0];
    let berlin = seed_fact(&engine, "a1", "User lives in Berlin", e_a);
    // cos(e_a, e_b) = 0.88 — inside the ambiguous band.
    embedder.pin(
        "User lives in Bangkok",
        vec![0.88, (1.0f64 - 0.88 * 0.88).sqrt() as f32, 0.0, 0.0],
    );

    llm.push_response(r#"[{"fact": "User lives in Bangkok", "intensity": 0.5}]"#);
    llm.push_response("SUPERSEDES");

    let actions = engine
        .remember_facts("a1", "I moved to Bangkok last month", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(actions.len(), 1);
    match &actions[0] {
        RememberAction::Superseded {
            new_content,
            old_content,
        } => {
            assert_eq!(new_content, "User lives in Bangkok");
            assert_eq!(old_content, "User lives in Berlin");
        }
        other => panic!("unexpected action: {other:?}"),
    }

    // Extraction + one classification call.
    assert_eq!(llm.call_count(), 2);

    // Berlin is superseded by the Bangkok row; Bangkok is active.
    let active = active_facts(&engine, "a1");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].content, "User lives in Bangkok");

    let old = engine
        .store()
        .with_conn(|conn| chunk_ops::get_chunk(conn, &berlin.id))
        .unwrap()
        .unwrap();
    assert_eq!(old.superseded_by.as_deref(), Some(active[0].id.as_str()));
}

#[tokio::test]
async fn dissimilar_fact_inserts_without_classification() {
    let (engine, embedder, llm) = engine();
    seed_fact(&engine, "a1", "User lives in Berlin", vec![1.0, 0.0, 0.0, 0.0]);
    embedder.pin("User plays the cello", vec![0.0, 0.0, 0.0, 1.0]);

    llm.push_response(r#"[{"fact": "User plays the cello", "intensity": 0.8}]"#);
    let actions = engine
        .remember_facts("a1", "I play the cello", None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(
        actions[0],
        RememberAction::Inserted { ref content, intensity }
            if content == "User plays the cello" && (intensity - 0.8).abs() < 1e-9
    ));
    assert_eq!(active_facts(&engine, "a1").len(), 2);
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn intra_batch_duplicates_collapse() {
    let (engine, embedder, llm) = engine();
    let v = vec![0.0, 1.0, 0.0, 0.0];
    embedder.pin("User owns a canoe", v.clone());
    embedder.pin("The user owns a canoe", v);

    llm.push_response(
        r#"[{"fact": "User owns a canoe", "intensity": 0.6},
            {"fact": "The user owns a canoe", "intensity": 0.8}]"#,
    );
    let actions = engine
        .remember_facts("a1", "I bought a canoe", None, &CancellationToken::new())
        .await
        .unwrap();

    // The second extracted fact sees the first through the working set.
    assert!(matches!(actions[0], RememberAction::Inserted { .. }));
    assert!(matches!(actions[1], RememberAction::Reinforced { .. }));

    let facts = active_facts(&engine, "a1");
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].encounter_count, 2);
    // (0.6·1 + 0.8) / 2
    assert!((facts[0].running_intensity.value() - 0.7).abs() < 1e-9);
}

#[tokio::test]
async fn scope_isolates_conflict_candidates() {
    let (engine, embedder, llm) = engine();
    let v = vec![0.0, 0.0, 1.0, 0.0];
    // Same content in another scope must not be a candidate.
    let chunk = Chunk::new_fact("a1", "other", "User likes sailing", v.clone(), Intensity::new(0.5));
    engine
        .store()
        .with_conn(|conn| chunk_ops::insert_chunk(conn, &chunk))
        .unwrap();
    embedder.pin("User likes sailing", v);

    llm.push_response(r#"[{"fact": "User likes sailing", "intensity": 0.5}]"#);
    let actions = engine
        .remember_facts("a1", "sailing!", Some("work"), &CancellationToken::new())
        .await
        .unwrap();

    // Inserted fresh into "work" rather than reinforcing "other".
    assert!(matches!(actions[0], RememberAction::Inserted { .. }));
    let all = engine
        .store()
        .with_conn(|conn| chunk_query::get_active_chunks(conn, "a1", ChunkKind::Fact, -1, None))
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn over_long_input_fails_without_io() {
    let (engine, _embedder, llm) = engine();
    let text = "x".repeat(10_001);
    let err = engine
        .remember_facts("a1", &text, None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        engram_core::EngramError::InputTooLong { length: 10_001, max: 10_000 }
    ));
    // No LLM call, no rows.
    assert_eq!(llm.call_count(), 0);
    assert!(active_facts(&engine, "a1").is_empty());
}

#[tokio::test]
async fn unparseable_extraction_yields_empty_result() {
    let (engine, _embedder, llm) = engine();
    llm.push_response("Sorry, I cannot find any facts here.");
    let actions = engine
        .remember_facts("a1", "hello there", None, &CancellationToken::new())
        .await
        .unwrap();
    assert!(actions.is_empty());
    assert!(active_facts(&engine, "a1").is_empty());
}

#[tokio::test]
async fn cancelled_token_aborts_before_any_write() {
    let (engine, _embedder, _llm) = engine();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = engine
        .remember_facts("a1", "I moved to Lisbon", None, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, engram_core::EngramError::Cancelled));
    assert!(active_facts(&engine, "a1").is_empty());
}

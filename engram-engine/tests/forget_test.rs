//! Forget-engine tests: predecessor resurrection and agent isolation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use engram_core::chunk::{Chunk, Intensity};
use engram_core::config::EngineConfig;
use engram_engine::MemoryEngine;
use engram_storage::queries::chunk_ops;
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

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

/// Seed the Berlin → Bangkok supersession pair used across these tests.
fn seed_supersession(engine: &MemoryEngine, agent: &str) -> (Chunk, Chunk) {
    let bangkok = Chunk::new_fact(
        agent,
        "",
        "User lives in Bangkok",
        vec![1.0, 0.0, 0.0, 0.0],
        Intensity::new(0.5),
    );
    let mut berlin = Chunk::new_fact(
        agent,
        "",
        "User lives in Berlin",
        vec![0.0, 1.0, 0.0, 0.0],
        Intensity::new(0.5),
    );
    berlin.superseded_by = Some(bangkok.id.clone());
    engine
        .store()
        .with_conn(|conn| {
            chunk_ops::insert_chunk(conn, &bangkok)?;
            chunk_ops::insert_chunk(conn, &berlin)
        })
        .unwrap();
    (berlin, bangkok)
}

#[tokio::test]
async fn forgetting_a_superseder_resurrects_its_predecessor() {
    let (engine, embedder, _llm) = engine();
    let (berlin, bangkok) = seed_supersession(&engine, "a1");
    // Matches Bangkok only.
    embedder.pin("Bangkok", vec![1.0, 0.0, 0.0, 0.0]);

    let deleted = engine
        .forget_memory("a1", "Bangkok", Some(0.7), None, &cancel())
        .await
        .unwrap();
    assert_eq!(deleted, vec!["User lives in Bangkok".to_string()]);

    // Bangkok row is gone; Berlin is active again.
    let gone = engine
        .store()
        .with_conn(|conn| chunk_ops::get_chunk(conn, &bangkok.id))
        .unwrap();
    assert!(gone.is_none());

    let resurrected = engine
        .store()
        .with_conn(|conn| chunk_ops::get_chunk(conn, &berlin.id))
        .unwrap()
        .unwrap();
    assert!(resurrected.superseded_by.is_none());
}

#[tokio::test]
async fn superseded_chunks_cannot_be_forgotten_directly() {
    let (engine, embedder, _llm) = engine();
    let (berlin, bangkok) = seed_supersession(&engine, "a1");
    // Matches the inactive Berlin row only.
    embedder.pin("Berlin", vec![0.0, 1.0, 0.0, 0.0]);

    let deleted = engine
        .forget_memory("a1", "Berlin", Some(0.7), None, &cancel())
        .await
        .unwrap();
    assert!(deleted.is_empty());

    // Both rows untouched.
    for id in [&berlin.id, &bangkok.id] {
        assert!(engine
            .store()
            .with_conn(|conn| chunk_ops::get_chunk(conn, id))
            .unwrap()
            .is_some());
    }
}

#[tokio::test]
async fn resurrection_never_crosses_agents() {
    let (engine, embedder, _llm) = engine();
    let (_berlin, bangkok) = seed_supersession(&engine, "a1");
    // Corrupt cross-agent reference: agent B's chunk claims to be
    // superseded by agent A's Bangkok row.
    let mut intruder = Chunk::new_fact(
        "b1",
        "",
        "unrelated fact",
        vec![0.0, 0.0, 1.0, 0.0],
        Intensity::new(0.5),
    );
    intruder.superseded_by = Some(bangkok.id.clone());
    engine
        .store()
        .with_conn(|conn| chunk_ops::insert_chunk(conn, &intruder))
        .unwrap();

    embedder.pin("Bangkok", vec![1.0, 0.0, 0.0, 0.0]);
    engine
        .forget_memory("a1", "Bangkok", Some(0.7), None, &cancel())
        .await
        .unwrap();

    // The stale reference in agent B survives the clear.
    let untouched = engine
        .store()
        .with_conn(|conn| chunk_ops::get_chunk(conn, &intruder.id))
        .unwrap()
        .unwrap();
    assert_eq!(untouched.superseded_by.as_deref(), Some(bangkok.id.as_str()));
}

#[tokio::test]
async fn threshold_bounds_the_match_set() {
    let (engine, embedder, _llm) = engine();
    let near = Chunk::new_fact("a1", "", "near", vec![1.0, 0.0, 0.0, 0.0], Intensity::new(0.5));
    // cos = 0.6 against the description: below the 0.7 default.
    let off = Chunk::new_fact(
        "a1",
        "",
        "off",
        vec![0.6, 0.8, 0.0, 0.0],
        Intensity::new(0.5),
    );
    engine
        .store()
        .with_conn(|conn| {
            chunk_ops::insert_chunk(conn, &near)?;
            chunk_ops::insert_chunk(conn, &off)
        })
        .unwrap();
    embedder.pin("the near one", vec![1.0, 0.0, 0.0, 0.0]);

    let deleted = engine
        .forget_memory("a1", "the near one", None, None, &cancel())
        .await
        .unwrap();
    assert_eq!(deleted, vec!["near".to_string()]);
    assert!(engine
        .store()
        .with_conn(|conn| chunk_ops::get_chunk(conn, &off.id))
        .unwrap()
        .is_some());
}

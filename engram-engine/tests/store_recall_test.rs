//! Store-memory dedup (including the insert race) and the recall scan.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;

use engram_core::chunk::{Chunk, ChunkKind, Intensity};
use engram_core::config::EngineConfig;
use engram_core::errors::EngramResult;
use engram_core::traits::IEmbeddingProvider;
use engram_engine::{MemoryEngine, StoreOutcome};
use engram_storage::queries::{chunk_ops, chunk_query};
use engram_storage::Store;
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

#[tokio::test]
async fn store_twice_yields_one_row_with_two_encounters() {
    let (engine, _embedder, _llm) = engine();

    let first = engine
        .store_memory("a1", "Saw a heron at the lake", None, None, &cancel())
        .await
        .unwrap();
    assert!(matches!(first, StoreOutcome::Stored { .. }));

    let second = engine
        .store_memory("a1", "Saw a heron at the lake", None, None, &cancel())
        .await
        .unwrap();
    match second {
        StoreOutcome::Strengthened {
            encounter_count,
            new_intensity,
            ..
        } => {
            assert_eq!(encounter_count, 2);
            // (0.5·1 + 0.5) / 2 — the fixed 0.5 reading.
            assert!((new_intensity - 0.5).abs() < 1e-9);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let rows = engine
        .store()
        .with_conn(|conn| {
            chunk_query::get_active_chunks(conn, "a1", ChunkKind::Memory, -1, None)
        })
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].encounter_count, 2);
}

#[tokio::test]
async fn invalid_metadata_fails_without_side_effects() {
    let (engine, _embedder, _llm) = engine();
    let err = engine
        .store_memory("a1", "content", Some("not json"), None, &cancel())
        .await
        .unwrap_err();
    assert!(matches!(err, engram_core::EngramError::InvalidMetadata { .. }));

    let rows = engine
        .store()
        .with_conn(|conn| chunk_query::get_all_active_chunks(conn, "a1", -1, None))
        .unwrap();
    assert!(rows.is_empty());

    // Valid JSON metadata is accepted and persisted.
    engine
        .store_memory("a1", "content", Some(r#"{"source": "test"}"#), None, &cancel())
        .await
        .unwrap();
    let rows = engine
        .store()
        .with_conn(|conn| chunk_query::get_all_active_chunks(conn, "a1", -1, None))
        .unwrap();
    assert_eq!(rows[0].metadata.as_deref(), Some(r#"{"source": "test"}"#));
}

/// Embedder that injects a competing row into the database during the
/// embed call — exactly the window between the hash check and the
/// insert — to force the unique-constraint fallback.
struct RacingEmbedder {
    inner: StubEmbedder,
    db_path: std::path::PathBuf,
    raced: AtomicBool,
}

#[async_trait]
impl IEmbeddingProvider for RacingEmbedder {
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> EngramResult<Vec<f32>> {
        let embedding = self.inner.embed(text, cancel).await?;
        if !self.raced.swap(true, Ordering::SeqCst) {
            let competitor = Store::open(&self.db_path)?;
            let chunk = Chunk::new_memory("a1", "", text, embedding.clone(), None);
            competitor.with_conn(|conn| chunk_ops::insert_chunk(conn, &chunk))?;
        }
        Ok(embedding)
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

#[tokio::test]
async fn concurrent_duplicate_store_falls_back_to_reinforce() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    let embedder = Arc::new(RacingEmbedder {
        inner: StubEmbedder::new(DIMS),
        db_path: path.clone(),
        raced: AtomicBool::new(false),
    });
    let llm = Arc::new(ScriptedLlm::new());
    let engine =
        MemoryEngine::open(&path, embedder, llm, EngineConfig::default()).unwrap();

    let outcome = engine
        .store_memory("a1", "Race", None, None, &cancel())
        .await
        .unwrap();
    match outcome {
        StoreOutcome::Strengthened { encounter_count, .. } => assert_eq!(encounter_count, 2),
        other => panic!("expected fallback reinforcement, got {other:?}"),
    }

    let rows = engine
        .store()
        .with_conn(|conn| {
            chunk_query::get_active_chunks(conn, "a1", ChunkKind::Memory, -1, None)
        })
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].encounter_count, 2);
}

#[tokio::test]
async fn recall_ranks_by_composite_score() {
    let (engine, embedder, _llm) = engine();
    let close = vec![1.0, 0.0, 0.0, 0.0];
    let far = vec![0.0, 1.0, 0.0, 0.0];
    embedder.pin("query", close.clone());

    for (content, embedding) in [("close chunk", close), ("far chunk", far)] {
        let chunk = Chunk::new_fact("a1", "", content, embedding, Intensity::new(0.8));
        engine
            .store()
            .with_conn(|conn| chunk_ops::insert_chunk(conn, &chunk))
            .unwrap();
    }

    let hits = engine
        .recall_memories("a1", "query", None, None, None, &cancel())
        .await
        .unwrap();
    // The orthogonal chunk sits below the 0.1 similarity floor.
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.content, "close chunk");
    assert!(hits[0].similarity > 0.99);
    assert!(hits[0].score > 0.0);
}

#[tokio::test]
async fn recall_applies_retrieval_boost() {
    let (engine, embedder, _llm) = engine();
    let v = vec![1.0, 0.0, 0.0, 0.0];
    embedder.pin("query", v.clone());
    let chunk = Chunk::new_fact("a1", "", "boosted", v, Intensity::new(0.5));
    engine
        .store()
        .with_conn(|conn| chunk_ops::insert_chunk(conn, &chunk))
        .unwrap();

    engine
        .recall_memories("a1", "query", None, None, None, &cancel())
        .await
        .unwrap();

    let row = engine
        .store()
        .with_conn(|conn| chunk_ops::get_chunk(conn, &chunk.id))
        .unwrap()
        .unwrap();
    assert_eq!(row.access_count, 1);
    assert!((row.running_intensity.value() - 0.52).abs() < 1e-9);
    // Encounters are untouched by retrieval.
    assert_eq!(row.encounter_count, 1);
}

#[tokio::test]
async fn recall_drops_chunks_below_strength_floor() {
    let (engine, embedder, _llm) = engine();
    let v = vec![1.0, 0.0, 0.0, 0.0];
    embedder.pin("query", v.clone());

    let mut faded = Chunk::new_fact("a1", "", "faded chunk", v.clone(), Intensity::new(0.05));
    faded.last_accessed_at = Utc::now() - Duration::days(365);
    let healthy = Chunk::new_fact("a1", "", "healthy chunk", v, Intensity::new(0.8));
    engine
        .store()
        .with_conn(|conn| {
            chunk_ops::insert_chunk(conn, &faded)?;
            chunk_ops::insert_chunk(conn, &healthy)
        })
        .unwrap();

    let hits = engine
        .recall_memories("a1", "query", None, None, None, &cancel())
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.content, "healthy chunk");
}

#[tokio::test]
async fn recall_excludes_superseded_and_respects_kind() {
    let (engine, embedder, _llm) = engine();
    let v = vec![1.0, 0.0, 0.0, 0.0];
    embedder.pin("query", v.clone());

    let fact = Chunk::new_fact("a1", "", "a fact", v.clone(), Intensity::new(0.8));
    let memory = Chunk::new_memory("a1", "", "a memory", v.clone(), None);
    let mut gone = Chunk::new_fact("a1", "", "superseded", v, Intensity::new(0.8));
    gone.superseded_by = Some(fact.id.clone());
    engine
        .store()
        .with_conn(|conn| {
            chunk_ops::insert_chunk(conn, &fact)?;
            chunk_ops::insert_chunk(conn, &memory)?;
            chunk_ops::insert_chunk(conn, &gone)
        })
        .unwrap();

    let all = engine
        .recall_memories("a1", "query", None, None, None, &cancel())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let facts_only = engine
        .recall_memories("a1", "query", None, Some(ChunkKind::Fact), None, &cancel())
        .await
        .unwrap();
    assert_eq!(facts_only.len(), 1);
    assert_eq!(facts_only[0].chunk.content, "a fact");
}

#[tokio::test]
async fn update_chunk_reembeds_and_rehashes() {
    let (engine, embedder, _llm) = engine();
    embedder.pin("fresh content", vec![0.0, 0.0, 1.0, 0.0]);

    let stored = engine
        .store_memory("a1", "stale content", None, None, &cancel())
        .await
        .unwrap();
    let id = match stored {
        StoreOutcome::Stored { id, .. } => id,
        other => panic!("unexpected: {other:?}"),
    };

    let updated = engine
        .update_chunk(&id, "fresh content", &cancel())
        .await
        .unwrap();
    assert_eq!(updated.content, "fresh content");
    assert_eq!(
        updated.content_hash.as_deref(),
        Some(engram_core::hash::content_hash("fresh content").as_str())
    );
    assert_eq!(updated.embedding, vec![0.0, 0.0, 1.0, 0.0]);

    let missing = engine
        .update_chunk("01ARZ3NDEKTSV4RRFFQ69G5FAV", "x", &cancel())
        .await;
    assert!(matches!(
        missing,
        Err(engram_core::EngramError::ChunkNotFound { .. })
    ));
}

#[tokio::test]
async fn delete_chunk_clears_inbound_references() {
    let (engine, _embedder, _llm) = engine();
    let newer = Chunk::new_fact("a1", "", "newer", vec![1.0, 0.0, 0.0, 0.0], Intensity::new(0.5));
    let mut older = Chunk::new_fact("a1", "", "older", vec![0.0, 1.0, 0.0, 0.0], Intensity::new(0.5));
    older.superseded_by = Some(newer.id.clone());
    engine
        .store()
        .with_conn(|conn| {
            chunk_ops::insert_chunk(conn, &newer)?;
            chunk_ops::insert_chunk(conn, &older)
        })
        .unwrap();

    assert!(engine.delete_chunk(&newer.id).unwrap());
    let resurrected = engine
        .store()
        .with_conn(|conn| chunk_ops::get_chunk(conn, &older.id))
        .unwrap()
        .unwrap();
    assert!(resurrected.superseded_by.is_none());

    // Deleting a missing id reports false.
    assert!(!engine.delete_chunk(&newer.id).unwrap());
}

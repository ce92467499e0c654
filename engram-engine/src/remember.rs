//! The remember-facts pipeline: extract → embed → candidate search →
//! threshold-banded classification → apply.
//!
//! No outer transaction wraps the batch: each fact is independently
//! meaningful, and a failure on fact k must not discard facts 1..k-1.
//! Supersession (insert + mark) is the one mutation that gets its own
//! transaction. The in-memory working set is updated after every
//! commit so later facts in the batch see earlier ones.

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use engram_core::chunk::{Chunk, ChunkKind, Intensity};
use engram_core::constants::{AMBIGUOUS_THRESHOLD, CONFLICT_TOP_K, DUPLICATE_THRESHOLD};
use engram_core::errors::{EngramError, EngramResult};
use engram_core::vector::cosine_similarity;
use engram_storage::queries::{chunk_ops, chunk_query};
use engram_storage::scope::normalize_scope;
use engram_strength::formula::updated_intensity;

use crate::classify::{self, Verdict};
use crate::engine::MemoryEngine;
use crate::extraction;

/// What happened to one extracted fact.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RememberAction {
    Inserted {
        content: String,
        intensity: f64,
    },
    Reinforced {
        content: String,
        old_intensity: f64,
        new_intensity: f64,
    },
    Superseded {
        new_content: String,
        old_content: String,
    },
}

impl MemoryEngine {
    /// Ingest free-form text: extract facts and resolve each against
    /// the agent's active facts in the given scope. Returns one action
    /// per extracted fact, in extraction order.
    pub async fn remember_facts(
        &self,
        agent_id: &str,
        text: &str,
        scope: Option<&str>,
        cancel: &CancellationToken,
    ) -> EngramResult<Vec<RememberAction>> {
        let length = text.chars().count();
        if length > self.config.max_text_length {
            return Err(EngramError::InputTooLong {
                length,
                max: self.config.max_text_length,
            });
        }

        let facts = extraction::extract_facts(self.llm.as_ref(), text, cancel).await?;
        if facts.is_empty() {
            return Ok(Vec::new());
        }

        let scope = normalize_scope(scope);
        // The working set: every active fact in scope, held in memory
        // for the whole batch and mutated as actions commit.
        let mut working = self.store.with_conn(|conn| {
            chunk_query::get_active_chunks(
                conn,
                agent_id,
                ChunkKind::Fact,
                self.config.max_search_facts as i64,
                Some(std::slice::from_ref(&scope)),
            )
        })?;

        tracing::debug!(
            agent_id,
            scope = %scope,
            facts = facts.len(),
            candidates = working.len(),
            "resolving extracted facts"
        );

        let mut actions = Vec::with_capacity(facts.len());
        for fact in facts {
            let embedding = self.embed_checked(&fact.content, cancel).await?;
            let best = best_candidate(&embedding, &working)?;

            let action = match best {
                Some((index, similarity)) if similarity >= AMBIGUOUS_THRESHOLD => {
                    let verdict = if similarity > DUPLICATE_THRESHOLD {
                        // Near-verbatim match: skip the LLM call.
                        Verdict::Duplicate
                    } else {
                        classify::classify_conflict(
                            self.llm.as_ref(),
                            &fact.content,
                            &working[index].content,
                            cancel,
                        )
                        .await?
                    };
                    if cancel.is_cancelled() {
                        return Err(EngramError::Cancelled);
                    }
                    match verdict {
                        Verdict::Duplicate => self.apply_duplicate(
                            &mut working[index],
                            fact.intensity,
                        )?,
                        Verdict::Supersedes => self.apply_supersession(
                            agent_id,
                            &scope,
                            &fact.content,
                            fact.intensity,
                            embedding,
                            &mut working,
                            index,
                        )?,
                        Verdict::Distinct => self.apply_insert(
                            agent_id,
                            &scope,
                            &fact.content,
                            fact.intensity,
                            embedding,
                            &mut working,
                        )?,
                    }
                }
                _ => self.apply_insert(
                    agent_id,
                    &scope,
                    &fact.content,
                    fact.intensity,
                    embedding,
                    &mut working,
                )?,
            };
            actions.push(action);
        }
        Ok(actions)
    }

    /// Insert a brand-new fact and append it to the working set so the
    /// rest of the batch sees it.
    fn apply_insert(
        &self,
        agent_id: &str,
        scope: &str,
        content: &str,
        intensity: f64,
        embedding: Vec<f32>,
        working: &mut Vec<Chunk>,
    ) -> EngramResult<RememberAction> {
        let chunk = Chunk::new_fact(agent_id, scope, content, embedding, Intensity::new(intensity));
        self.store
            .with_conn(|conn| chunk_ops::insert_chunk(conn, &chunk))?;
        let action = RememberAction::Inserted {
            content: chunk.content.clone(),
            intensity: chunk.running_intensity.value(),
        };
        working.push(chunk);
        Ok(action)
    }

    /// Reinforce an existing fact and mirror the new counters into the
    /// working-set entry.
    fn apply_duplicate(
        &self,
        existing: &mut Chunk,
        reading: f64,
    ) -> EngramResult<RememberAction> {
        let old_intensity = existing.running_intensity.value();
        let new_intensity =
            updated_intensity(old_intensity, existing.encounter_count, reading);
        let now = Utc::now();
        self.store
            .with_conn(|conn| chunk_ops::reinforce_chunk(conn, &existing.id, new_intensity, now))?;

        existing.running_intensity = Intensity::new(new_intensity);
        existing.encounter_count += 1;
        existing.access_count += 1;
        existing.last_accessed_at = now;

        Ok(RememberAction::Reinforced {
            content: existing.content.clone(),
            old_intensity,
            new_intensity,
        })
    }

    /// Insert the new fact and mark the old one superseded, atomically.
    /// On success the old fact leaves the working set.
    #[allow(clippy::too_many_arguments)]
    fn apply_supersession(
        &self,
        agent_id: &str,
        scope: &str,
        content: &str,
        intensity: f64,
        embedding: Vec<f32>,
        working: &mut Vec<Chunk>,
        old_index: usize,
    ) -> EngramResult<RememberAction> {
        let chunk = Chunk::new_fact(agent_id, scope, content, embedding, Intensity::new(intensity));
        let old_id = working[old_index].id.clone();
        self.store.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| EngramError::storage(format!("supersede begin: {e}")))?;
            chunk_ops::insert_chunk(&tx, &chunk)?;
            chunk_ops::supersede_chunk(&tx, &chunk.id, &old_id)?;
            tx.commit()
                .map_err(|e| EngramError::storage(format!("supersede commit: {e}")))
        })?;

        let old = working.swap_remove(old_index);
        let action = RememberAction::Superseded {
            new_content: chunk.content.clone(),
            old_content: old.content,
        };
        working.push(chunk);
        Ok(action)
    }
}

/// Top candidate by cosine similarity, considering only the top-K
/// nearest chunks of the working set.
fn best_candidate(embedding: &[f32], working: &[Chunk]) -> EngramResult<Option<(usize, f64)>> {
    let mut scored = Vec::with_capacity(working.len());
    for (index, chunk) in working.iter().enumerate() {
        let similarity = cosine_similarity(embedding, &chunk.embedding)?;
        scored.push((index, similarity));
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(CONFLICT_TOP_K);
    Ok(scored.first().copied())
}

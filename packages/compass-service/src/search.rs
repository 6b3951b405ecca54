pub mod dedup;
pub mod rerank;

use std::{cmp::Ordering, collections::HashMap};

use compass_config::Search;
use compass_store::{KeywordHit, KnowledgeChunk, KnowledgeStore, VectorHit};
use uuid::Uuid;

use crate::Result;

/// A retrieval candidate carrying both raw channel scores and the blended
/// score that downstream stages reorder.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
	pub chunk: KnowledgeChunk,
	pub vector_score: f32,
	pub keyword_score: f32,
	pub combined: f32,
	pub relevance: f32,
	pub final_rank: u32,
}

pub(crate) async fn hybrid_search(
	store: &dyn KnowledgeStore,
	cfg: &Search,
	query: &str,
	embedding: &[f32],
) -> Result<Vec<RankedCandidate>> {
	let (vector, keyword) = tokio::join!(
		store.vector_search(embedding, cfg.candidate_k),
		store.keyword_search(query, cfg.candidate_k),
	);
	let candidates =
		merge_hits(vector?, keyword?, cfg.vector_weight, cfg.keyword_weight, cfg.candidate_k);

	tracing::debug!(candidates = candidates.len(), "Merged hybrid search channels.");

	Ok(candidates)
}

/// Merge both channels by chunk id. A chunk found by only one channel scores
/// zero on the other, so single-channel hits are penalized but kept.
pub(crate) fn merge_hits(
	vector: Vec<VectorHit>,
	keyword: Vec<KeywordHit>,
	vector_weight: f32,
	keyword_weight: f32,
	limit: u32,
) -> Vec<RankedCandidate> {
	let mut merged: HashMap<Uuid, RankedCandidate> = HashMap::new();

	for hit in vector {
		let entry = merged.entry(hit.chunk.chunk_id).or_insert_with(|| RankedCandidate {
			chunk: hit.chunk,
			vector_score: 0.0,
			keyword_score: 0.0,
			combined: 0.0,
			relevance: 0.0,
			final_rank: 0,
		});

		entry.vector_score = entry.vector_score.max(hit.score);
	}
	for hit in keyword {
		let entry = merged.entry(hit.chunk.chunk_id).or_insert_with(|| RankedCandidate {
			chunk: hit.chunk,
			vector_score: 0.0,
			keyword_score: 0.0,
			combined: 0.0,
			relevance: 0.0,
			final_rank: 0,
		});

		entry.keyword_score = entry.keyword_score.max(hit.score);
	}

	let weight_sum = vector_weight + keyword_weight;
	let mut candidates: Vec<RankedCandidate> = merged.into_values().collect();

	for candidate in &mut candidates {
		let blended =
			vector_weight * candidate.vector_score + keyword_weight * candidate.keyword_score;

		candidate.combined = (blended / weight_sum).clamp(0.0, 1.0);
	}

	sort_candidates(&mut candidates);
	candidates.truncate(limit as usize);
	assign_ranks(&mut candidates);

	candidates
}

pub(crate) fn sort_candidates(candidates: &mut [RankedCandidate]) {
	candidates.sort_by(|left, right| {
		cmp_f32_desc(left.combined, right.combined)
			.then_with(|| left.chunk.chunk_id.cmp(&right.chunk.chunk_id))
	});
}

pub(crate) fn assign_ranks(candidates: &mut [RankedCandidate]) {
	for (idx, candidate) in candidates.iter_mut().enumerate() {
		candidate.final_rank = idx as u32 + 1;
	}
}

pub(crate) fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

#[cfg(test)]
mod tests {
	use compass_store::ChunkMetadata;

	use super::*;

	fn chunk(id: u128) -> KnowledgeChunk {
		KnowledgeChunk {
			chunk_id: Uuid::from_u128(id),
			text: format!("chunk {id}"),
			embedding: vec![1.0],
			metadata: ChunkMetadata::default(),
		}
	}

	fn vector_hit(id: u128, score: f32) -> VectorHit {
		VectorHit { chunk: chunk(id), score }
	}

	fn keyword_hit(id: u128, score: f32) -> KeywordHit {
		KeywordHit { chunk: chunk(id), score }
	}

	#[test]
	fn merge_blends_both_channels() {
		let merged =
			merge_hits(vec![vector_hit(1, 0.8)], vec![keyword_hit(1, 0.5)], 0.7, 0.3, 10);

		assert_eq!(merged.len(), 1);
		assert!((merged[0].combined - (0.7 * 0.8 + 0.3 * 0.5)).abs() < 1e-6);
		assert_eq!(merged[0].final_rank, 1);
	}

	#[test]
	fn single_channel_hit_scores_zero_on_missing_side() {
		let merged = merge_hits(vec![vector_hit(1, 1.0)], Vec::new(), 0.7, 0.3, 10);

		assert_eq!(merged[0].vector_score, 1.0);
		assert_eq!(merged[0].keyword_score, 0.0);
		assert!((merged[0].combined - 0.7).abs() < 1e-6);
	}

	#[test]
	fn equal_scores_break_ties_by_chunk_id() {
		let merged = merge_hits(
			vec![vector_hit(2, 0.5), vector_hit(1, 0.5)],
			Vec::new(),
			0.7,
			0.3,
			10,
		);

		assert_eq!(merged[0].chunk.chunk_id, Uuid::from_u128(1));
		assert_eq!(merged[1].chunk.chunk_id, Uuid::from_u128(2));
		assert_eq!(merged[0].final_rank, 1);
		assert_eq!(merged[1].final_rank, 2);
	}

	#[test]
	fn limit_truncates_after_ordering() {
		let merged = merge_hits(
			vec![vector_hit(1, 0.9), vector_hit(2, 0.8), vector_hit(3, 0.7)],
			Vec::new(),
			0.7,
			0.3,
			2,
		);

		assert_eq!(merged.len(), 2);
		assert_eq!(merged[0].chunk.chunk_id, Uuid::from_u128(1));
		assert_eq!(merged[1].chunk.chunk_id, Uuid::from_u128(2));
	}

	#[test]
	fn uneven_weights_stay_normalized() {
		let merged =
			merge_hits(vec![vector_hit(1, 1.0)], vec![keyword_hit(1, 1.0)], 0.9, 0.6, 10);

		assert!((merged[0].combined - 1.0).abs() < 1e-6);
	}
}

use compass_store::cosine_similarity;

use crate::search::RankedCandidate;

/// Drop candidates whose embedding is near-identical to a better-ranked
/// survivor. Order and ranks of the survivors are preserved.
pub(crate) fn deduplicate(
	candidates: Vec<RankedCandidate>,
	sim_threshold: f32,
) -> Vec<RankedCandidate> {
	let mut accepted: Vec<RankedCandidate> = Vec::with_capacity(candidates.len());

	'candidates: for candidate in candidates {
		for survivor in &accepted {
			let Some(similarity) =
				cosine_similarity(&candidate.chunk.embedding, &survivor.chunk.embedding)
			else {
				continue;
			};

			if similarity.max(0.0) >= sim_threshold {
				tracing::debug!(
					dropped = %candidate.chunk.chunk_id,
					kept = %survivor.chunk.chunk_id,
					similarity,
					"Dropped near-duplicate candidate.",
				);

				continue 'candidates;
			}
		}

		accepted.push(candidate);
	}

	accepted
}

#[cfg(test)]
mod tests {
	use compass_store::{ChunkMetadata, KnowledgeChunk};
	use uuid::Uuid;

	use super::*;

	fn candidate(id: u128, embedding: Vec<f32>, rank: u32) -> RankedCandidate {
		RankedCandidate {
			chunk: KnowledgeChunk {
				chunk_id: Uuid::from_u128(id),
				text: format!("chunk {id}"),
				embedding,
				metadata: ChunkMetadata::default(),
			},
			vector_score: 0.0,
			keyword_score: 0.0,
			combined: 1.0 / rank as f32,
			relevance: 0.0,
			final_rank: rank,
		}
	}

	#[test]
	fn near_duplicate_keeps_the_higher_ranked_candidate() {
		// Unit vectors roughly 18 degrees apart, cosine about 0.95.
		let survivors = deduplicate(
			vec![
				candidate(1, vec![1.0, 0.0], 1),
				candidate(2, vec![0.95, 0.312], 2),
				candidate(3, vec![0.0, 1.0], 3),
			],
			0.9,
		);

		assert_eq!(survivors.len(), 2);
		assert_eq!(survivors[0].chunk.chunk_id, Uuid::from_u128(1));
		assert_eq!(survivors[1].chunk.chunk_id, Uuid::from_u128(3));
		assert_eq!(survivors[1].final_rank, 3);
	}

	#[test]
	fn survivors_are_pairwise_below_threshold() {
		let survivors = deduplicate(
			vec![
				candidate(1, vec![1.0, 0.0], 1),
				candidate(2, vec![0.9, 0.1], 2),
				candidate(3, vec![0.8, 0.2], 3),
				candidate(4, vec![0.0, 1.0], 4),
			],
			0.9,
		);

		for (i, left) in survivors.iter().enumerate() {
			for right in survivors.iter().skip(i + 1) {
				let similarity =
					cosine_similarity(&left.chunk.embedding, &right.chunk.embedding)
						.unwrap_or(0.0);

				assert!(similarity.max(0.0) < 0.9);
			}
		}
	}

	#[test]
	fn unit_threshold_only_collapses_exact_duplicates() {
		let survivors = deduplicate(
			vec![
				candidate(1, vec![1.0, 0.0], 1),
				candidate(2, vec![1.0, 0.0], 2),
				candidate(3, vec![0.99, 0.141], 3),
			],
			1.0,
		);
		let ids: Vec<Uuid> = survivors.iter().map(|c| c.chunk.chunk_id).collect();

		assert_eq!(ids, vec![Uuid::from_u128(1), Uuid::from_u128(3)]);
	}

	#[test]
	fn opposed_vectors_never_count_as_duplicates() {
		let survivors = deduplicate(
			vec![candidate(1, vec![1.0, 0.0], 1), candidate(2, vec![-1.0, 0.0], 2)],
			0.9,
		);

		assert_eq!(survivors.len(), 2);
	}
}

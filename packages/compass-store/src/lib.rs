mod corpus;
mod error;

pub use corpus::CorpusStore;
pub use error::{Error, Result};

use std::{future::Future, pin::Pin};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A unit of retrievable knowledge text with its embedding and metadata.
/// Owned by the store; downstream stages hold request-scoped copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
	pub chunk_id: Uuid,
	pub text: String,
	pub embedding: Vec<f32>,
	#[serde(default)]
	pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkMetadata {
	pub category: Option<String>,
	pub source_kind: String,
	pub source_id: String,
	pub curriculum_tags: Vec<String>,
	pub grades: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
	pub chunk: KnowledgeChunk,
	/// Similarity in [0,1].
	pub score: f32,
}

#[derive(Debug, Clone)]
pub struct KeywordHit {
	pub chunk: KnowledgeChunk,
	/// Lexical overlap in [0,1].
	pub score: f32,
}

pub trait KnowledgeStore
where
	Self: Send + Sync,
{
	fn vector_search<'a>(
		&'a self,
		embedding: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<VectorHit>>>;

	fn keyword_search<'a>(
		&'a self,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<KeywordHit>>>;
}

pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return None;
	}

	Some((dot / (lhs_norm.sqrt() * rhs_norm.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cosine_of_equal_vectors_is_one() {
		let similarity = cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]).expect("similarity");

		assert!((similarity - 1.0).abs() < 1e-6);
	}

	#[test]
	fn cosine_rejects_mismatched_or_zero_vectors() {
		assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_none());
		assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).is_none());
		assert!(cosine_similarity(&[], &[]).is_none());
	}

	#[test]
	fn cosine_of_opposed_vectors_is_negative_one() {
		let similarity = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).expect("similarity");

		assert!((similarity + 1.0).abs() < 1e-6);
	}
}

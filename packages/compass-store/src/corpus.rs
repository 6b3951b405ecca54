use std::{cmp::Ordering, collections::HashSet, fs, path::Path};

use crate::{
	BoxFuture, Error, KeywordHit, KnowledgeChunk, KnowledgeStore, Result, VectorHit,
	cosine_similarity,
};

const MAX_QUERY_TERMS: usize = 16;

/// In-memory corpus loaded from JSONL records, one chunk per line.
pub struct CorpusStore {
	chunks: Vec<KnowledgeChunk>,
}

impl CorpusStore {
	pub fn from_records(chunks: Vec<KnowledgeChunk>) -> Self {
		Self { chunks }
	}

	pub fn from_jsonl_path(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::ReadCorpus { path: path.to_path_buf(), source: err })?;
		let mut chunks = Vec::new();

		for (idx, line) in raw.lines().enumerate() {
			if line.trim().is_empty() {
				continue;
			}

			let chunk: KnowledgeChunk = serde_json::from_str(line)
				.map_err(|err| Error::ParseRecord { line: idx + 1, source: err })?;

			chunks.push(chunk);
		}

		Ok(Self { chunks })
	}

	pub fn len(&self) -> usize {
		self.chunks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}
}

impl KnowledgeStore for CorpusStore {
	fn vector_search<'a>(
		&'a self,
		embedding: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<VectorHit>>> {
		Box::pin(async move {
			let mut hits = Vec::new();

			for chunk in &self.chunks {
				let Some(similarity) = cosine_similarity(embedding, &chunk.embedding) else {
					continue;
				};

				// Opposed vectors floor at zero so scores stay in [0,1].
				hits.push(VectorHit { chunk: chunk.clone(), score: similarity.max(0.0) });
			}

			hits.sort_by(|left, right| {
				cmp_f32_desc(left.score, right.score)
					.then_with(|| left.chunk.chunk_id.cmp(&right.chunk.chunk_id))
			});
			hits.truncate(limit as usize);

			Ok(hits)
		})
	}

	fn keyword_search<'a>(
		&'a self,
		query: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<KeywordHit>>> {
		Box::pin(async move {
			let terms = tokenize_query(query, MAX_QUERY_TERMS);
			let mut hits = Vec::new();

			if terms.is_empty() {
				return Ok(hits);
			}

			for chunk in &self.chunks {
				let mut haystack = chunk.text.clone();

				for tag in &chunk.metadata.curriculum_tags {
					haystack.push(' ');
					haystack.push_str(tag);
				}

				let score = lexical_overlap_ratio(&terms, &haystack);

				if score <= 0.0 {
					continue;
				}

				hits.push(KeywordHit { chunk: chunk.clone(), score });
			}

			hits.sort_by(|left, right| {
				cmp_f32_desc(left.score, right.score)
					.then_with(|| left.chunk.chunk_id.cmp(&right.chunk.chunk_id))
			});
			hits.truncate(limit as usize);

			Ok(hits)
		})
	}
}

fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

fn tokenize_query(query: &str, max_terms: usize) -> Vec<String> {
	let mut normalized = String::with_capacity(query.len());

	for ch in query.chars() {
		if ch.is_ascii_alphanumeric() {
			normalized.push(ch.to_ascii_lowercase());
		} else {
			normalized.push(' ');
		}
	}

	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for token in normalized.split_whitespace() {
		if token.len() < 2 {
			continue;
		}
		if seen.insert(token) {
			out.push(token.to_string());
		}
		if out.len() >= max_terms {
			break;
		}
	}

	out
}

fn lexical_overlap_ratio(query_terms: &[String], text: &str) -> f32 {
	if query_terms.is_empty() {
		return 0.0;
	}

	let mut normalized = String::with_capacity(text.len());

	for ch in text.chars() {
		if ch.is_ascii_alphanumeric() {
			normalized.push(ch.to_ascii_lowercase());
		} else {
			normalized.push(' ');
		}
	}

	let text_terms: HashSet<&str> =
		normalized.split_whitespace().filter(|token| token.len() >= 2).collect();

	if text_terms.is_empty() {
		return 0.0;
	}

	let mut matched = 0_usize;

	for term in query_terms {
		if text_terms.contains(term.as_str()) {
			matched += 1;
		}
	}

	matched as f32 / query_terms.len() as f32
}

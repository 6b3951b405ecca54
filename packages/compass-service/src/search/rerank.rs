use compass_config::Ranking;
use compass_domain::{BudgetTier, StudentProfile};
use compass_store::KnowledgeChunk;

use crate::search::{RankedCandidate, assign_ranks, sort_candidates};

const FUNDING_PHRASES: &[&str] =
	&["bursary", "bursaries", "nsfas", "scholarship", "scholarships", "financial aid", "funded"];

/// Reorder candidates by blending the retrieval score with how well each
/// chunk matches the extracted student profile. A permutation of the input,
/// never an addition or removal.
pub(crate) fn rerank(candidates: &mut [RankedCandidate], profile: &StudentProfile, cfg: &Ranking) {
	for candidate in candidates.iter_mut() {
		candidate.relevance = profile_relevance(profile, &candidate.chunk, cfg);

		let blended =
			cfg.retrieval_weight * candidate.combined + cfg.profile_weight * candidate.relevance;

		candidate.combined = blended.clamp(0.0, 1.0);
	}

	sort_candidates(candidates);
	assign_ranks(candidates);
}

/// Profile relevance in [0,1]. Profile parts the query never mentioned
/// contribute zero rather than penalizing the chunk.
pub(crate) fn profile_relevance(
	profile: &StudentProfile,
	chunk: &KnowledgeChunk,
	cfg: &Ranking,
) -> f32 {
	let haystack = chunk_haystack(chunk);
	let subject_score = matched_fraction(profile.subjects.iter(), &haystack);
	let grade_score = profile
		.grade
		.filter(|grade| chunk.metadata.grades.contains(&grade.as_year()))
		.map_or(0.0, |_| 1.0);
	let interest_score = matched_fraction(profile.interests.iter(), &haystack);
	let constraint_score = constraint_match(profile, &haystack);
	let relevance = cfg.subject_weight * subject_score
		+ cfg.grade_weight * grade_score
		+ cfg.interest_weight * interest_score
		+ cfg.constraint_weight * constraint_score;

	relevance.clamp(0.0, 1.0)
}

fn chunk_haystack(chunk: &KnowledgeChunk) -> String {
	let mut haystack = chunk.text.clone();

	for tag in &chunk.metadata.curriculum_tags {
		haystack.push(' ');
		haystack.push_str(tag);
	}
	if let Some(category) = &chunk.metadata.category {
		haystack.push(' ');
		haystack.push_str(category);
	}

	normalize(&haystack)
}

fn matched_fraction<'a>(terms: impl Iterator<Item = &'a String>, haystack: &str) -> f32 {
	let mut total = 0_usize;
	let mut matched = 0_usize;

	for term in terms {
		total += 1;

		if contains_phrase(haystack, &normalize(term)) {
			matched += 1;
		}
	}

	if total == 0 { 0.0 } else { matched as f32 / total as f32 }
}

fn constraint_match(profile: &StudentProfile, haystack: &str) -> f32 {
	let mut scores = Vec::new();

	// Only a low budget carries a lexical signal worth scoring. Medium and
	// high tiers do not constrain which chunks apply.
	if profile.constraints.budget == Some(BudgetTier::Low) {
		let funded =
			FUNDING_PHRASES.iter().any(|phrase| contains_phrase(haystack, phrase));

		scores.push(if funded { 1.0 } else { 0.0 });
	}
	if let Some(location) = &profile.constraints.location {
		scores.push(if contains_phrase(haystack, &normalize(location)) { 1.0 } else { 0.0 });
	}

	if scores.is_empty() {
		0.0
	} else {
		scores.iter().sum::<f32>() / scores.len() as f32
	}
}

fn normalize(text: &str) -> String {
	let mut out = String::with_capacity(text.len());

	for ch in text.chars() {
		if ch.is_alphanumeric() {
			out.extend(ch.to_lowercase());
		} else {
			out.push(' ');
		}
	}

	out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
	if phrase.is_empty() {
		return false;
	}

	let padded_haystack = format!(" {haystack} ");
	let padded_phrase = format!(" {phrase} ");

	padded_haystack.contains(&padded_phrase)
}

use std::fmt::Write;

use compass_domain::{AssessmentDepth, BudgetTier, Mark, StudentProfile};
use serde::Serialize;
use tokenizers::Tokenizer;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::search::RankedCandidate;

/// Estimates token counts with the configured tokenizer, falling back to a
/// character heuristic when no tokenizer is available.
pub struct TokenEstimator {
	tokenizer: Option<Tokenizer>,
}

impl TokenEstimator {
	pub fn from_repo(repo: Option<&str>) -> Self {
		let tokenizer = repo.and_then(|repo| match Tokenizer::from_pretrained(repo, None) {
			Ok(tokenizer) => Some(tokenizer),
			Err(err) => {
				tracing::warn!(
					error = %err,
					repo,
					"Failed to load tokenizer, falling back to character heuristic.",
				);

				None
			},
		});

		Self { tokenizer }
	}

	pub fn heuristic() -> Self {
		Self { tokenizer: None }
	}

	pub fn estimate(&self, text: &str) -> u32 {
		if let Some(tokenizer) = &self.tokenizer {
			match tokenizer.encode(text, false) {
				Ok(encoding) => return encoding.len() as u32,
				Err(err) => {
					tracing::error!(error = %err, "Tokenizer failed to encode text.");
				},
			}
		}

		// Roughly four characters per token for Latin-script text.
		text.chars().count().div_ceil(4) as u32
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
	pub chunk_id: Uuid,
	pub text: String,
	pub category: Option<String>,
	pub source_kind: String,
	pub source_id: String,
	pub final_rank: u32,
	pub tokens: u32,
	pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
	pub entries: Vec<ContextEntry>,
	pub total_tokens: u32,
}

/// Greedily pack candidates in rank order until the budget is exhausted.
/// When even the first candidate does not fit, it is truncated so a
/// non-empty input always yields a non-empty bundle.
pub(crate) fn assemble(
	candidates: &[RankedCandidate],
	estimator: &TokenEstimator,
	max_tokens: u32,
) -> ContextBundle {
	let mut entries = Vec::new();
	let mut total_tokens = 0_u32;

	for candidate in candidates {
		let tokens = estimator.estimate(&candidate.chunk.text);

		if total_tokens + tokens > max_tokens {
			if entries.is_empty() {
				let text = truncate_to_budget(&candidate.chunk.text, estimator, max_tokens);
				let tokens = estimator.estimate(&text);

				tracing::debug!(
					chunk_id = %candidate.chunk.chunk_id,
					tokens,
					"Truncated the first chunk to fit the context budget.",
				);
				entries.push(entry_from(candidate, text, tokens, true));

				total_tokens += tokens;
			}

			break;
		}

		entries.push(entry_from(candidate, candidate.chunk.text.clone(), tokens, false));

		total_tokens += tokens;
	}

	ContextBundle { entries, total_tokens }
}

fn entry_from(candidate: &RankedCandidate, text: String, tokens: u32, truncated: bool) -> ContextEntry {
	ContextEntry {
		chunk_id: candidate.chunk.chunk_id,
		text,
		category: candidate.chunk.metadata.category.clone(),
		source_kind: candidate.chunk.metadata.source_kind.clone(),
		source_id: candidate.chunk.metadata.source_id.clone(),
		final_rank: candidate.final_rank,
		tokens,
		truncated,
	}
}

/// Cut text down to the budget at sentence boundaries, falling back to a
/// character cut when not even the first sentence fits.
fn truncate_to_budget(text: &str, estimator: &TokenEstimator, budget: u32) -> String {
	let mut current = String::new();

	for (_, sentence) in text.split_sentence_bound_indices() {
		let candidate = format!("{current}{sentence}");

		if estimator.estimate(&candidate) > budget {
			break;
		}

		current = candidate;
	}

	if !current.is_empty() {
		return current;
	}

	let mut out: String = text.chars().take(budget as usize * 4).collect();

	while !out.is_empty() && estimator.estimate(&out) > budget {
		out.pop();
	}

	out
}

/// Render the generation prompt from the query, the extracted profile, and
/// the assembled context.
pub(crate) fn render_prompt(
	query: &str,
	profile: &StudentProfile,
	bundle: &ContextBundle,
	disclaimer_marker: &str,
) -> String {
	let mut prompt = String::new();

	prompt.push_str(
		"You are a career guidance assistant for South African senior-phase students.\n\n",
	);
	prompt.push_str("Student query:\n");
	prompt.push_str(query.trim());
	prompt.push_str("\n\nStudent profile:\n");
	prompt.push_str(&render_profile(profile));
	prompt.push_str("\nKnowledge context:\n");

	for entry in &bundle.entries {
		let category = entry.category.as_deref().unwrap_or("uncategorized");

		let _ = writeln!(
			prompt,
			"[{}] ({category} | {}:{})\n{}",
			entry.final_rank, entry.source_kind, entry.source_id, entry.text,
		);
	}

	let _ = write!(
		prompt,
		"\nRecommend careers and study paths for this student using only the \
		 knowledge context above. Answer as a numbered list where each item \
		 starts with \"Career:\" followed by the career name, a colon, and a \
		 short motivation. End your answer with a sentence that includes the \
		 exact phrase \"{disclaimer_marker}\".",
	);

	prompt
}

fn render_profile(profile: &StudentProfile) -> String {
	let mut out = String::new();

	if let Some(grade) = profile.grade {
		let _ = writeln!(out, "- Grade: {}", grade.as_year());
	}
	if !profile.subjects.is_empty() {
		let subjects: Vec<&str> = profile.subjects.iter().map(String::as_str).collect();
		let _ = writeln!(out, "- Subjects: {}", subjects.join(", "));
	}
	for (subject, mark) in &profile.marks {
		match mark {
			Mark::Exact(score) => {
				let _ = writeln!(out, "- Mark: {score}% for {subject}");
			},
			Mark::Range { min, max } => {
				let _ = writeln!(out, "- Mark: {min}-{max}% for {subject}");
			},
		}
	}
	if !profile.interests.is_empty() {
		let interests: Vec<&str> = profile.interests.iter().map(String::as_str).collect();
		let _ = writeln!(out, "- Interests: {}", interests.join(", "));
	}
	if let Some(budget) = profile.constraints.budget {
		let budget = match budget {
			BudgetTier::Low => "low",
			BudgetTier::Medium => "medium",
			BudgetTier::High => "high",
		};
		let _ = writeln!(out, "- Budget: {budget}");
	}
	if let Some(location) = &profile.constraints.location {
		let _ = writeln!(out, "- Preferred location: {location}");
	}
	if let Some(deadline) = &profile.constraints.deadline {
		let _ = writeln!(out, "- Application deadline: {deadline}");
	}
	if let Some(aps) = profile.aps {
		let _ = writeln!(out, "- APS: {aps}");
	}
	if profile.depth == AssessmentDepth::Comprehensive {
		out.push_str("- Requested depth: comprehensive\n");
	}
	if out.is_empty() {
		out.push_str("- No profile details detected.\n");
	}

	out
}

use compass_domain::{RecommendedItem, StudentProfile, StructuredProfileFields, extract_profile};
use serde::{Deserialize, Serialize};

use crate::{
	BiasReport, CompassService, ContextBundle, Error, GenerationResult, Result,
	assemble::{assemble, render_prompt},
	bias::detect_teaching_bias,
	generate::generate,
	search::{dedup::deduplicate, hybrid_search, rerank::rerank},
};

/// A single guidance request: free text plus optional structured fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuidanceRequest {
	pub query: String,
	pub fields: Option<StructuredProfileFields>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationOutcome {
	pub profile: StudentProfile,
	pub context: ContextBundle,
	pub generation: GenerationResult,
	pub recommendations: Vec<RecommendedItem>,
	pub bias: Option<BiasReport>,
}

impl CompassService {
	/// Run the whole pipeline for one request: profile extraction, hybrid
	/// retrieval, reranking, deduplication, context assembly, generation,
	/// and the post-hoc bias check.
	pub async fn evaluate(&self, request: &GuidanceRequest) -> Result<EvaluationOutcome> {
		let query = request.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidInput { message: "Query text is empty.".to_string() });
		}

		let profile = extract_profile(query, request.fields.as_ref());

		tracing::debug!(
			grade = ?profile.grade,
			subjects = profile.subjects.len(),
			interests = profile.interests.len(),
			"Extracted student profile.",
		);

		let embedding = self.embed_query(query).await?;
		let mut candidates =
			hybrid_search(self.store.as_ref(), &self.cfg.search, query, &embedding).await?;

		if candidates.is_empty() {
			tracing::warn!("Hybrid search returned no candidates, serving the fallback answer.");

			return Ok(self.fallback_outcome(profile));
		}

		rerank(&mut candidates, &profile, &self.cfg.ranking);

		let mut candidates = deduplicate(candidates, self.cfg.dedup.sim_threshold);

		candidates.truncate(self.cfg.search.top_k as usize);

		let context = assemble(&candidates, &self.estimator, self.cfg.context.max_tokens);
		let prompt =
			render_prompt(query, &profile, &context, &self.cfg.generation.disclaimer_marker);
		let generation = generate(
			self.providers.generation.as_ref(),
			&self.cfg.providers.generation,
			&self.cfg.generation,
			&prompt,
		)
		.await;
		let recommendations = generation
			.response
			.as_deref()
			.map(compass_domain::extract_recommendations)
			.unwrap_or_default();
		let bias = if generation.success {
			let report = detect_teaching_bias(
				&recommendations,
				self.cfg.bias.dominance_threshold,
				self.cfg.bias.min_items,
			);

			self.stats.record(&report);

			if report.has_bias {
				tracing::warn!(
					teaching_percentage = report.teaching_percentage,
					severity = report.severity,
					"Recommendations lean heavily toward teaching careers.",
				);
			}

			Some(report)
		} else {
			None
		};

		tracing::info!(
			success = generation.success,
			context_entries = context.entries.len(),
			recommendations = recommendations.len(),
			"Evaluated guidance request.",
		);

		Ok(EvaluationOutcome { profile, context, generation, recommendations, bias })
	}

	/// Canned answer for queries the corpus cannot ground. Served without
	/// calling the generation provider.
	fn fallback_outcome(&self, profile: StudentProfile) -> EvaluationOutcome {
		let marker = &self.cfg.generation.disclaimer_marker;
		let response = format!(
			"We could not find guidance material matching your query. Broad fields \
			 worth exploring include engineering, health sciences, commerce, \
			 education, and the trades; your school's guidance department can help \
			 you narrow these down. Always {marker} before making final choices.",
		);

		EvaluationOutcome {
			profile,
			context: ContextBundle { entries: Vec::new(), total_tokens: 0 },
			generation: GenerationResult {
				success: true,
				response: Some(response),
				error: None,
				retry_count: 0,
				elapsed_ms: 0,
				footer_present: true,
				fallback: true,
			},
			recommendations: Vec::new(),
			bias: None,
		}
	}
}

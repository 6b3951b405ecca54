mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Bias, Config, Context, Dedup, EmbeddingProviderConfig, Generation, GenerationProviderConfig,
	Providers, Ranking, Search, Service,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("generation", &cfg.providers.generation.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.search.candidate_k == 0 {
		return Err(Error::Validation {
			message: "search.candidate_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.top_k > cfg.search.candidate_k {
		return Err(Error::Validation {
			message: "search.top_k must not exceed search.candidate_k.".to_string(),
		});
	}

	for (label, weight) in [
		("search.vector_weight", cfg.search.vector_weight),
		("search.keyword_weight", cfg.search.keyword_weight),
		("ranking.retrieval_weight", cfg.ranking.retrieval_weight),
		("ranking.profile_weight", cfg.ranking.profile_weight),
		("ranking.subject_weight", cfg.ranking.subject_weight),
		("ranking.grade_weight", cfg.ranking.grade_weight),
		("ranking.interest_weight", cfg.ranking.interest_weight),
		("ranking.constraint_weight", cfg.ranking.constraint_weight),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number."),
			});
		}
		if !(0.0..=1.0).contains(&weight) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if cfg.search.vector_weight + cfg.search.keyword_weight <= 0.0 {
		return Err(Error::Validation {
			message: "search.vector_weight and search.keyword_weight must not both be zero."
				.to_string(),
		});
	}
	if cfg.ranking.retrieval_weight + cfg.ranking.profile_weight <= 0.0 {
		return Err(Error::Validation {
			message: "ranking.retrieval_weight and ranking.profile_weight must not both be zero."
				.to_string(),
		});
	}

	if !cfg.dedup.sim_threshold.is_finite() {
		return Err(Error::Validation {
			message: "dedup.sim_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.dedup.sim_threshold) {
		return Err(Error::Validation {
			message: "dedup.sim_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}

	if cfg.context.max_tokens == 0 {
		return Err(Error::Validation {
			message: "context.max_tokens must be greater than zero.".to_string(),
		});
	}

	if !cfg.bias.dominance_threshold.is_finite() {
		return Err(Error::Validation {
			message: "bias.dominance_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..1.0).contains(&cfg.bias.dominance_threshold) {
		return Err(Error::Validation {
			message: "bias.dominance_threshold must be in the range 0.0-1.0, exclusive of 1.0."
				.to_string(),
		});
	}
	if cfg.bias.min_items == 0 {
		return Err(Error::Validation {
			message: "bias.min_items must be greater than zero.".to_string(),
		});
	}

	if cfg.generation.backoff_initial_ms == 0 {
		return Err(Error::Validation {
			message: "generation.backoff_initial_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.generation.backoff_max_ms < cfg.generation.backoff_initial_ms {
		return Err(Error::Validation {
			message: "generation.backoff_max_ms must not be less than generation.backoff_initial_ms."
				.to_string(),
		});
	}
	if cfg.generation.disclaimer_marker.trim().is_empty() {
		return Err(Error::Validation {
			message: "generation.disclaimer_marker must be non-empty.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.context.tokenizer_repo.as_deref().map(|repo| repo.trim().is_empty()).unwrap_or(false) {
		cfg.context.tokenizer_repo = None;
	}
}

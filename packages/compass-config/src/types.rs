use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub dedup: Dedup,
	#[serde(default)]
	pub context: Context,
	#[serde(default)]
	pub bias: Bias,
	#[serde(default)]
	pub generation: Generation,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub generation: GenerationProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct GenerationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub candidate_k: u32,
	pub top_k: u32,
	pub vector_weight: f32,
	pub keyword_weight: f32,
}
impl Default for Search {
	fn default() -> Self {
		Self { candidate_k: 50, top_k: 20, vector_weight: 0.7, keyword_weight: 0.3 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub retrieval_weight: f32,
	pub profile_weight: f32,
	pub subject_weight: f32,
	pub grade_weight: f32,
	pub interest_weight: f32,
	pub constraint_weight: f32,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			retrieval_weight: 0.6,
			profile_weight: 0.4,
			subject_weight: 0.35,
			grade_weight: 0.25,
			interest_weight: 0.25,
			constraint_weight: 0.15,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Dedup {
	pub sim_threshold: f32,
}
impl Default for Dedup {
	fn default() -> Self {
		Self { sim_threshold: 0.9 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Context {
	pub max_tokens: u32,
	pub tokenizer_repo: Option<String>,
}
impl Default for Context {
	fn default() -> Self {
		Self { max_tokens: 3_000, tokenizer_repo: None }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Bias {
	pub dominance_threshold: f32,
	pub min_items: u32,
}
impl Default for Bias {
	fn default() -> Self {
		Self { dominance_threshold: 0.6, min_items: 3 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Generation {
	pub max_retries: u32,
	pub backoff_initial_ms: u64,
	pub backoff_max_ms: u64,
	pub disclaimer_marker: String,
}
impl Default for Generation {
	fn default() -> Self {
		Self {
			max_retries: 2,
			backoff_initial_ms: 200,
			backoff_max_ms: 2_000,
			disclaimer_marker: default_disclaimer_marker(),
		}
	}
}

fn default_disclaimer_marker() -> String {
	"consult a registered career counsellor".to_string()
}

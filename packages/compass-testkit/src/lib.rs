//! Scripted providers and fixture builders for exercising the pipeline
//! without network access.

use std::{
	collections::HashMap,
	hash::{DefaultHasher, Hash, Hasher},
	sync::Mutex,
};

use color_eyre::eyre::eyre;
use compass_config::{
	Config, EmbeddingProviderConfig, GenerationProviderConfig, Providers, Service,
};
use compass_service::{BoxFuture, EmbeddingProvider, GenerationProvider};
use compass_store::{ChunkMetadata, KnowledgeChunk};
use uuid::Uuid;

/// Deterministic embedding provider. Texts either carry a scripted vector
/// or fall back to a unit axis derived from the text hash.
pub struct ScriptedEmbedding {
	dimensions: usize,
	overrides: HashMap<String, Vec<f32>>,
	yield_nothing: bool,
}

impl ScriptedEmbedding {
	pub fn new(dimensions: usize) -> Self {
		Self { dimensions, overrides: HashMap::new(), yield_nothing: false }
	}

	pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
		self.overrides.insert(text.to_string(), vector);

		self
	}

	/// A provider that answers with no vectors at all.
	pub fn returning_none(dimensions: usize) -> Self {
		Self { dimensions, overrides: HashMap::new(), yield_nothing: true }
	}

	fn vector_for(&self, text: &str) -> Vec<f32> {
		if let Some(vector) = self.overrides.get(text) {
			return vector.clone();
		}

		let mut hasher = DefaultHasher::new();

		text.hash(&mut hasher);

		axis(self.dimensions, hasher.finish() as usize % self.dimensions)
	}
}

impl EmbeddingProvider for ScriptedEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			if self.yield_nothing {
				return Ok(Vec::new());
			}

			Ok(texts.iter().map(|text| self.vector_for(text)).collect())
		})
	}
}

/// Unit vector along one axis, handy for constructing corpora with known
/// similarities.
pub fn axis(dimensions: usize, index: usize) -> Vec<f32> {
	let mut vector = vec![0.0; dimensions];

	if dimensions > 0 {
		vector[index % dimensions] = 1.0;
	}

	vector
}

enum Script {
	Succeed(String),
	Fail(String),
	Flaky { failures: u32, response: String },
}

/// Generation provider with a scripted outcome and an attempt counter.
pub struct ScriptedGeneration {
	script: Script,
	attempts: Mutex<u32>,
}

impl ScriptedGeneration {
	pub fn succeeding(response: &str) -> Self {
		Self { script: Script::Succeed(response.to_string()), attempts: Mutex::new(0) }
	}

	pub fn failing(message: &str) -> Self {
		Self { script: Script::Fail(message.to_string()), attempts: Mutex::new(0) }
	}

	/// Fails the first `failures` attempts, then succeeds.
	pub fn flaky(failures: u32, response: &str) -> Self {
		Self {
			script: Script::Flaky { failures, response: response.to_string() },
			attempts: Mutex::new(0),
		}
	}

	pub fn attempts(&self) -> u32 {
		*self.attempts.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
	}
}

impl GenerationProvider for ScriptedGeneration {
	fn complete<'a>(
		&'a self,
		_cfg: &'a GenerationProviderConfig,
		_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			let attempt = {
				let mut attempts =
					self.attempts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

				*attempts += 1;

				*attempts
			};

			match &self.script {
				Script::Succeed(response) => Ok(response.clone()),
				Script::Fail(message) => Err(eyre!("{message}")),
				Script::Flaky { failures, response } =>
					if attempt <= *failures {
						Err(eyre!("Scripted failure on attempt {attempt}."))
					} else {
						Ok(response.clone())
					},
			}
		})
	}
}

pub fn knowledge_chunk(id: u128, text: &str, embedding: Vec<f32>) -> KnowledgeChunk {
	KnowledgeChunk {
		chunk_id: Uuid::from_u128(id),
		text: text.to_string(),
		embedding,
		metadata: ChunkMetadata::default(),
	}
}

/// A config pointing at nothing in particular; provider calls are expected
/// to be served by scripted providers.
pub fn test_config() -> Config {
	Config {
		service: Service { log_level: "debug".to_string() },
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "scripted".to_string(),
				api_base: "http://127.0.0.1:0".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test-embedding".to_string(),
				dimensions: 4,
				timeout_ms: 5_000,
				default_headers: serde_json::Map::new(),
			},
			generation: GenerationProviderConfig {
				provider_id: "scripted".to_string(),
				api_base: "http://127.0.0.1:0".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/chat/completions".to_string(),
				model: "test-generation".to_string(),
				temperature: 0.2,
				timeout_ms: 5_000,
				default_headers: serde_json::Map::new(),
			},
		},
		search: Default::default(),
		ranking: Default::default(),
		dedup: Default::default(),
		context: Default::default(),
		bias: Default::default(),
		generation: Default::default(),
	}
}

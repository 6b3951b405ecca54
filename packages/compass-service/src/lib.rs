pub mod assemble;
pub mod bias;
pub mod error;
pub mod evaluate;
pub mod generate;
pub mod search;

use std::{future::Future, pin::Pin, sync::Arc};

pub use assemble::{ContextBundle, ContextEntry, TokenEstimator};
pub use bias::{BiasReport, BiasStats, BiasStatsSnapshot, CategoryDistribution, CategoryShare};
use compass_config::{Config, EmbeddingProviderConfig, GenerationProviderConfig};
use compass_providers::{embedding, generation};
use compass_store::KnowledgeStore;
pub use error::{Error, Result};
pub use evaluate::{EvaluationOutcome, GuidanceRequest};
pub use generate::{GenerationResult, GenerationState};
pub use search::RankedCandidate;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl GenerationProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a GenerationProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(generation::complete(cfg, prompt))
	}
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, generation: Arc<dyn GenerationProvider>) -> Self {
		Self { embedding, generation }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);
		Self { embedding: provider.clone(), generation: provider }
	}
}

pub struct CompassService {
	pub cfg: Config,
	pub store: Arc<dyn KnowledgeStore>,
	pub providers: Providers,
	pub(crate) estimator: TokenEstimator,
	pub(crate) stats: BiasStats,
}

impl CompassService {
	pub fn new(cfg: Config, store: Arc<dyn KnowledgeStore>) -> Self {
		Self::with_providers(cfg, store, Providers::default())
	}

	pub fn with_providers(
		cfg: Config,
		store: Arc<dyn KnowledgeStore>,
		providers: Providers,
	) -> Self {
		let estimator = TokenEstimator::from_repo(cfg.context.tokenizer_repo.as_deref());

		Self { cfg, store, providers, estimator, stats: BiasStats::default() }
	}

	pub fn bias_stats(&self) -> BiasStatsSnapshot {
		self.stats.snapshot()
	}

	pub fn reset_bias_stats(&self) {
		self.stats.reset();
	}

	pub(crate) async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
		if query.trim().is_empty() {
			return Err(Error::InvalidInput { message: "Query text is empty.".to_string() });
		}

		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &[query.to_string()])
			.await?;
		let Some(vec) = embeddings.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if vec.len() != self.cfg.providers.embedding.dimensions as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vec)
	}
}

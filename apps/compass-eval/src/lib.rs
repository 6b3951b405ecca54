use std::{fs, path::{Path, PathBuf}, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use compass_service::{BiasStatsSnapshot, CompassService, EvaluationOutcome, GuidanceRequest};
use compass_store::CorpusStore;

#[derive(Debug, Parser)]
#[command(rename_all = "kebab")]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, value_name = "FILE")]
	pub corpus: PathBuf,
	#[arg(long, short = 'q', value_name = "TEXT", required_unless_present = "dataset")]
	pub query: Option<String>,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	queries: Vec<GuidanceRequest>,
}

#[derive(Debug, Serialize)]
struct QueryReport {
	query: String,
	outcome: EvaluationOutcome,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
	corpus_chunks: usize,
	queries: Vec<QueryReport>,
	bias_stats: BiasStatsSnapshot,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = compass_config::load(&args.config)?;
	let filter = EnvFilter::new(cfg.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let store = CorpusStore::from_jsonl_path(&args.corpus)?;
	let corpus_chunks = store.len();

	tracing::info!(chunks = corpus_chunks, "Loaded knowledge corpus.");

	let requests = match &args.query {
		Some(query) => vec![GuidanceRequest { query: query.clone(), fields: None }],
		None => {
			let dataset_path =
				args.dataset.as_ref().ok_or_else(|| eyre::eyre!("--dataset is required."))?;

			load_dataset(dataset_path.as_path())?.queries
		},
	};
	let service = CompassService::new(cfg, Arc::new(store));
	let mut reports = Vec::with_capacity(requests.len());

	for request in requests {
		let outcome = service.evaluate(&request).await?;

		reports.push(QueryReport { query: request.query, outcome });
	}

	let output =
		EvalOutput { corpus_chunks, queries: reports, bias_stats: service.bias_stats() };
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)
		.map_err(|err| eyre::eyre!("Failed to read dataset at {path:?}: {err}."))?;
	let dataset: EvalDataset = serde_json::from_str(&raw)
		.map_err(|err| eyre::eyre!("Failed to parse dataset at {path:?}: {err}."))?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset at {path:?} contains no queries."));
	}

	Ok(dataset)
}

// crates.io
use clap::Parser;
// self
use compass_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	compass_eval::run(args).await
}

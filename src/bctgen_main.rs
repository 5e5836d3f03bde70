use anyhow::{Context, Result};
use bctgen::cli::Args;
use bctgen::config::RunConfig;
use bctgen::openai::real::create_openai_client;
use bctgen::pipeline;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{prelude::*, Registry};
use tracing_tree::HierarchicalLayer;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = Registry::default()
        .with(
            HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        );
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let args = Args::parse();
    let config =
        RunConfig::from_args(&args).context("Invalid run configuration")?;

    let client = create_openai_client(
        &config.openai_api_key,
        config.openai_api_base.as_deref(),
    );

    let summary = pipeline::run(&config, client.as_ref())
        .await
        .with_context(|| {
            format!("Failed to generate dataset \"{}\"", config.template_name)
        })?;

    info!(
        "Wrote {} BCT tables and {}",
        summary.category_files.len(),
        summary.merged_file.display()
    );
    Ok(())
}

use crate::config::RunConfig;
use crate::error::Result;
use crate::generation::generate_dataset;
use crate::merge::merge_and_write;
use crate::openai::OpenAIClientTrait;
use crate::prompts::PromptTemplate;
use crate::taxonomy::Taxonomy;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub category_files: Vec<PathBuf>,
    pub merged_file: PathBuf,
}

/// Loads the template and taxonomy, generates every BCT, then merges.
///
/// The template is read first since it is local and cheap to validate.
#[instrument(skip_all, fields(template = %config.template_name), err)]
pub async fn run(
    config: &RunConfig,
    client: &dyn OpenAIClientTrait,
) -> Result<RunSummary> {
    let start_time = Instant::now();

    let template =
        PromptTemplate::load(&config.prompts_dir, &config.template_name)?;
    info!("System prompt: {}", template.system_prompt);
    info!("User prompt: {}", template.user_prompt);

    let taxonomy = Taxonomy::load(&config.taxonomy_source).await?;

    let category_files = generate_dataset(
        client,
        &config.generation_settings(),
        &template,
        &taxonomy,
        &config.data_dir,
    )
    .await?;

    let merged_file =
        merge_and_write(&taxonomy, &config.data_dir, &config.template_name)?;

    info!("Run finished in {} ms", start_time.elapsed().as_millis());
    Ok(RunSummary {
        category_files,
        merged_file,
    })
}

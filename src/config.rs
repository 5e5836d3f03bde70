use crate::cli::Args;
use crate::error::{DatasetError, Result};
use crate::generation::{GenerationSettings, RetryPolicy};
use crate::openai::DEFAULT_MODEL;
use crate::taxonomy::TaxonomySource;
use std::path::PathBuf;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_API_BASE_ENV: &str = "OPENAI_API_BASE";
pub const TAXONOMY_URL_ENV: &str = "BCT_TAXONOMY_URL";

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub template_name: String,
    pub num_messages: usize,
    pub model: String,
    pub openai_api_key: String,
    pub openai_api_base: Option<String>,
    pub taxonomy_source: TaxonomySource,
    pub prompts_dir: PathBuf,
    pub data_dir: PathBuf,
    pub retry: RetryPolicy,
}

impl RunConfig {
    pub fn new(
        template_name: impl Into<String>,
        num_messages: usize,
        openai_api_key: impl Into<String>,
    ) -> Self {
        Self {
            template_name: template_name.into(),
            num_messages,
            model: DEFAULT_MODEL.to_string(),
            openai_api_key: openai_api_key.into(),
            openai_api_base: None,
            taxonomy_source: TaxonomySource::default(),
            prompts_dir: PathBuf::from("./prompts"),
            data_dir: PathBuf::from("./data"),
            retry: RetryPolicy::default(),
        }
    }

    /// Builds the config from CLI flags and the process environment.
    pub fn from_args(args: &Args) -> Result<Self> {
        Self::from_lookup(args, |key| std::env::var(key).ok())
    }

    /// Same as [`RunConfig::from_args`] with an explicit variable lookup.
    pub fn from_lookup<F>(args: &Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty =
            |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = non_empty(OPENAI_API_KEY_ENV).ok_or_else(|| {
            DatasetError::Config(format!("{} is not set", OPENAI_API_KEY_ENV))
        })?;

        if args.num == 0 {
            return Err(DatasetError::Config(
                "number of messages per BCT must be at least 1".to_string(),
            ));
        }

        let mut config = Self::new(&args.prompt, args.num, api_key);
        config.openai_api_base = non_empty(OPENAI_API_BASE_ENV);
        if let Some(location) = non_empty(TAXONOMY_URL_ENV) {
            config.taxonomy_source = TaxonomySource::parse(&location);
        }
        Ok(config)
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.model.clone(),
            temperature: 0.0,
            num_messages: self.num_messages,
            retry: self.retry.clone(),
        }
    }
}

use crate::error::{DatasetError, Result};
use crate::openai::{build_messages, OpenAIClientTrait, DEFAULT_MODEL};
use crate::prompts::PromptTemplate;
use crate::storage;
use crate::taxonomy::{Category, Taxonomy};
use async_openai::types::{CreateChatCompletionResponse, FinishReason};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Number of generated messages echoed to the log after each BCT.
const SAMPLE_SIZE: usize = 5;

fn numbering_regex() -> &'static Regex {
    static NUMBERING: OnceLock<Regex> = OnceLock::new();
    NUMBERING.get_or_init(|| Regex::new(r"^\d+(?:[.):]\s*|\s+)").unwrap())
}

/// How often a category is re-asked after a truncated or malformed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per category, including the first one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Request parameters shared by every category of a run.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub num_messages: usize,
    pub retry: RetryPolicy,
}

impl GenerationSettings {
    pub fn new(num_messages: usize) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            num_messages,
            retry: RetryPolicy::default(),
        }
    }
}

/// Splits a numbered-list completion into exactly `expected` messages.
///
/// Blank lines are dropped. When there are more lines than expected, only
/// lines starting with a digit are kept, which discards any chatter the
/// model adds around the list. Leading numbering such as `1.`, `2)` or `3 `
/// is stripped from every kept line, and a line that was nothing but a
/// number does not count as a message.
pub fn format_response(
    category_id: &str,
    content: &str,
    expected: usize,
) -> Result<Vec<String>> {
    let mut lines: Vec<&str> = content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() > expected {
        lines.retain(|line| line.starts_with(char::is_numeric));
    }

    let messages: Vec<String> = lines
        .into_iter()
        .map(|line| numbering_regex().replace(line, "").into_owned())
        .filter(|message| !message.is_empty())
        .collect();

    if messages.len() != expected {
        return Err(DatasetError::ResponseFormat {
            category: category_id.to_string(),
            expected,
            actual: messages.len(),
            content: content.to_string(),
        });
    }

    Ok(messages)
}

fn finish_reason_name(reason: Option<&FinishReason>) -> String {
    reason
        .and_then(|reason| serde_json::to_value(reason).ok())
        .and_then(|value| value.as_str().map(String::from))
        .unwrap_or_else(|| "none".to_string())
}

fn render_response(response: &CreateChatCompletionResponse) -> String {
    serde_json::to_string_pretty(response)
        .unwrap_or_else(|_| format!("{:?}", response))
}

/// One request/parse/validate round for a category.
async fn attempt_category(
    client: &dyn OpenAIClientTrait,
    settings: &GenerationSettings,
    category: &Category,
    prompt: &PromptTemplate,
) -> Result<Vec<String>> {
    let messages = build_messages(&prompt.system_prompt, &prompt.user_prompt)
        .map_err(|source| DatasetError::Completion {
            category: category.id.clone(),
            source,
        })?;

    let response = client
        .chat_completion(settings.model.clone(), settings.temperature, messages)
        .await
        .map_err(|source| DatasetError::Completion {
            category: category.id.clone(),
            source,
        })?;

    let choice = match response.choices.first() {
        Some(choice) => choice,
        None => {
            return Err(DatasetError::GenerationIncomplete {
                category: category.id.clone(),
                finish_reason: "no choices".to_string(),
                response: render_response(&response),
            })
        }
    };

    if !matches!(choice.finish_reason, Some(FinishReason::Stop)) {
        return Err(DatasetError::GenerationIncomplete {
            category: category.id.clone(),
            finish_reason: finish_reason_name(choice.finish_reason.as_ref()),
            response: render_response(&response),
        });
    }

    let content = choice.message.content.as_deref().unwrap_or_default();
    format_response(&category.id, content, settings.num_messages)
}

/// Produces validated messages for one category, re-asking with the same
/// prompt while the failure is retryable and attempts remain.
#[instrument(skip_all, fields(bct = %category.id), err)]
pub async fn generate_category_messages(
    client: &dyn OpenAIClientTrait,
    settings: &GenerationSettings,
    template: &PromptTemplate,
    category: &Category,
) -> Result<Vec<String>> {
    let max_attempts = settings.retry.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let prompt = template.for_category(category, settings.num_messages)?;
        if attempt == 1 {
            info!("[{}] {}", category.id, prompt.user_prompt);
        }

        match attempt_category(client, settings, category, &prompt).await {
            Ok(messages) => return Ok(messages),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                warn!(
                    "Attempt {}/{} for BCT {} failed: {}",
                    attempt, max_attempts, category.id, e
                );
                if !settings.retry.delay.is_zero() {
                    tokio::time::sleep(settings.retry.delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Generates and persists messages for every category in table order.
///
/// Each table is written as soon as its category succeeds, so a failure
/// later in the run leaves earlier tables in place. Returns the written
/// paths.
#[instrument(
    skip_all,
    fields(template = %template.name, num_messages = settings.num_messages),
    err
)]
pub async fn generate_dataset(
    client: &dyn OpenAIClientTrait,
    settings: &GenerationSettings,
    template: &PromptTemplate,
    taxonomy: &Taxonomy,
    data_dir: &Path,
) -> Result<Vec<PathBuf>> {
    info!(
        "Generating dataset \"{}\" with {} messages for each BCT",
        template.name, settings.num_messages
    );
    std::fs::create_dir_all(storage::category_dir(data_dir, &template.name))?;

    let mut written = Vec::with_capacity(taxonomy.len());
    for category in taxonomy.iter() {
        let messages =
            generate_category_messages(client, settings, template, category)
                .await?;

        let path =
            storage::category_path(data_dir, &template.name, &category.id);
        storage::write_messages(&path, &messages)?;

        for (index, message) in messages.iter().take(SAMPLE_SIZE).enumerate() {
            info!("{}. {}", index + 1, message);
        }
        written.push(path);
    }

    info!(
        "Dataset \"{}\" is generated and saved to \"{}\"",
        template.name,
        storage::category_dir(data_dir, &template.name).display()
    );
    Ok(written)
}

use thiserror::Error;

/// Errors raised while building a BCT message dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Taxonomy source '{location}' is unavailable: {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error("Prompt template '{template}' is malformed: {reason}")]
    TemplateFormat { template: String, reason: String },

    #[error(
        "Could not generate messages for BCT {category} (finish reason: {finish_reason}):\n{response}"
    )]
    GenerationIncomplete {
        category: String,
        finish_reason: String,
        response: String,
    },

    #[error(
        "Wrong format for BCT {category} messages: expected {expected}, got {actual}:\n{content}"
    )]
    ResponseFormat {
        category: String,
        expected: usize,
        actual: usize,
        content: String,
    },

    #[error("Missing generated output for BCT(s) {}", .categories.join(", "))]
    MissingCategoryOutput { categories: Vec<String> },

    #[error("Completion request for BCT {category} failed: {source}")]
    Completion {
        category: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl DatasetError {
    /// Whether re-asking the service with the same prompt may fix this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DatasetError::GenerationIncomplete { .. }
                | DatasetError::ResponseFormat { .. }
        )
    }

    pub(crate) fn source_unavailable(
        location: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        DatasetError::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn template_format(
        template: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        DatasetError::TemplateFormat {
            template: template.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn missing_output(categories: Vec<String>) -> Self {
        DatasetError::MissingCategoryOutput { categories }
    }
}

pub type Result<T, E = DatasetError> = std::result::Result<T, E>;

use crate::error::{DatasetError, Result};
use crate::taxonomy::Category;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::OnceLock;

pub const NUM_MESSAGES_PLACEHOLDER: &str = "{num_messages}";
pub const LABEL_PLACEHOLDER: &str = "{bct_label}";
pub const DEFINITION_PLACEHOLDER: &str = "{bct_definition}";
pub const EXAMPLES_PLACEHOLDER: &str = "{bct_examples}";

fn divider_regex() -> &'static Regex {
    static DIVIDER: OnceLock<Regex> = OnceLock::new();
    DIVIDER.get_or_init(|| Regex::new(r"^\s*={3,}\s*$").unwrap())
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{[a-z][a-z0-9_]*\}").unwrap())
}

/// A system/user prompt pair read from `<prompts_dir>/<name>.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl PromptTemplate {
    pub fn load(prompts_dir: &Path, name: &str) -> Result<Self> {
        let path = prompts_dir.join(format!("{}.txt", name));
        let content = std::fs::read_to_string(&path).map_err(|e| {
            DatasetError::template_format(
                name,
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;
        Self::parse(name, &content)
    }

    /// Accepts either a document split by a single `=====` divider line, or
    /// exactly two non-blank lines (system, then user).
    pub fn parse(name: &str, content: &str) -> Result<Self> {
        let lines: Vec<&str> = content.lines().collect();
        let dividers: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| divider_regex().is_match(line))
            .map(|(index, _)| index)
            .collect();

        let (system_prompt, user_prompt) = match dividers.as_slice() {
            [] => {
                let parts: Vec<&str> = lines
                    .iter()
                    .map(|line| line.trim())
                    .filter(|line| !line.is_empty())
                    .collect();
                match parts.as_slice() {
                    [system, user] => (system.to_string(), user.to_string()),
                    _ => {
                        return Err(DatasetError::template_format(
                            name,
                            format!(
                                "expected a divider or exactly 2 lines, \
                                 found {} lines",
                                parts.len()
                            ),
                        ))
                    }
                }
            }
            [divider] => (
                lines[..*divider].join("\n").trim().to_string(),
                lines[divider + 1..].join("\n").trim().to_string(),
            ),
            _ => {
                return Err(DatasetError::template_format(
                    name,
                    format!("expected one divider, found {}", dividers.len()),
                ))
            }
        };

        if system_prompt.is_empty() || user_prompt.is_empty() {
            return Err(DatasetError::template_format(
                name,
                "system and user prompts must both be non-empty",
            ));
        }

        Ok(Self {
            name: name.to_string(),
            system_prompt,
            user_prompt,
        })
    }

    /// Returns a copy with every occurrence of each token replaced in both
    /// prompts.
    ///
    /// Runs a single pass over the template text, so inserted values are
    /// never scanned for further tokens. Tokens without a replacement are
    /// left as they are.
    pub fn substitute(&self, replacements: &[(&str, &str)]) -> Self {
        let fill = |text: &str| {
            placeholder_regex()
                .replace_all(text, |caps: &Captures| {
                    let token = &caps[0];
                    replacements
                        .iter()
                        .find(|(candidate, _)| *candidate == token)
                        .map_or(token, |(_, value)| *value)
                        .to_string()
                })
                .into_owned()
        };

        Self {
            name: self.name.clone(),
            system_prompt: fill(&self.system_prompt),
            user_prompt: fill(&self.user_prompt),
        }
    }

    /// Fails on the first `{placeholder}` token in either prompt that is not
    /// one of `known`. Only the template text is checked, never the values
    /// that will be inserted into it.
    pub fn ensure_known_placeholders(&self, known: &[&str]) -> Result<()> {
        for text in [&self.system_prompt, &self.user_prompt] {
            if let Some(token) = placeholder_regex()
                .find_iter(text)
                .find(|token| !known.contains(&token.as_str()))
            {
                return Err(DatasetError::template_format(
                    &self.name,
                    format!("unknown placeholder {}", token.as_str()),
                ));
            }
        }
        Ok(())
    }

    /// The prompt pair sent for one category.
    pub fn for_category(
        &self,
        category: &Category,
        num_messages: usize,
    ) -> Result<Self> {
        let count = num_messages.to_string();
        let replacements = [
            (NUM_MESSAGES_PLACEHOLDER, count.as_str()),
            (LABEL_PLACEHOLDER, category.label.as_str()),
            (DEFINITION_PLACEHOLDER, category.definition.as_str()),
            (EXAMPLES_PLACEHOLDER, category.examples.as_str()),
        ];
        let known: Vec<&str> =
            replacements.iter().map(|(token, _)| *token).collect();
        self.ensure_known_placeholders(&known)?;
        Ok(self.substitute(&replacements))
    }
}

//! Loading of the BCT Taxonomy v1 reference table.
//!
//! Labels, definitions and examples follow the BCT Taxonomy v1
//! (https://digitalwellbeing.org/wp-content/uploads/2016/11/BCTTv1_PDF_version.pdf),
//! published as a processed sheet with corrected grammar.

use crate::error::{DatasetError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, instrument};
use url::Url;

/// CSV export of the processed taxonomy sheet.
pub const DEFAULT_TAXONOMY_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vS1NRUf8ZMAowUBBqq69awHkuDY1ZQIQord5rbFlhHr8dcJUaQqQImEMJnhuwKtuASrU_cBtO7Omj9Q/pub?gid=970379036&single=true&output=csv";

/// One behavior change technique.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    #[serde(rename = "No")]
    pub id: String,
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "Definition")]
    pub definition: String,
    #[serde(rename = "Examples")]
    pub examples: String,
}

/// Where the taxonomy table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomySource {
    Url(Url),
    File(PathBuf),
}

impl TaxonomySource {
    /// http(s) URLs are fetched, anything else is read as a local path.
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                TaxonomySource::Url(url)
            }
            _ => TaxonomySource::File(PathBuf::from(location)),
        }
    }
}

impl Default for TaxonomySource {
    fn default() -> Self {
        Self::parse(DEFAULT_TAXONOMY_URL)
    }
}

impl fmt::Display for TaxonomySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonomySource::Url(url) => write!(f, "{}", url),
            TaxonomySource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The loaded taxonomy, in table order.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<Category>,
}

impl Taxonomy {
    #[instrument(skip_all, fields(source = %source), err)]
    pub async fn load(source: &TaxonomySource) -> Result<Self> {
        let location = source.to_string();
        let body = match source {
            TaxonomySource::Url(url) => fetch(url).await?,
            TaxonomySource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| DatasetError::source_unavailable(&location, e))?,
        };

        let taxonomy = Self::from_csv_reader(body.as_bytes(), &location)?;
        info!("Loaded {} BCTs from {}", taxonomy.len(), location);
        Ok(taxonomy)
    }

    /// Parses a CSV table with at least `No`, `Label`, `Definition` and
    /// `Examples` columns. Ids must be unique.
    pub fn from_csv_reader<R: Read>(reader: R, location: &str) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut categories = Vec::new();
        let mut seen = HashSet::new();

        for record in csv_reader.deserialize::<Category>() {
            let category = record
                .map_err(|e| DatasetError::source_unavailable(location, e))?;
            if !seen.insert(category.id.clone()) {
                return Err(DatasetError::source_unavailable(
                    location,
                    format!("duplicate BCT id '{}'", category.id),
                ));
            }
            categories.push(category);
        }

        if categories.is_empty() {
            return Err(DatasetError::source_unavailable(
                location,
                "table has no BCT rows",
            ));
        }

        Ok(Self { categories })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn get(&self, position: usize) -> Option<&Category> {
        self.categories.get(position)
    }

    pub fn find(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|category| category.id.as_str())
    }
}

async fn fetch(url: &Url) -> Result<String> {
    let response = reqwest::get(url.clone())
        .await
        .and_then(|response| response.error_for_status())
        .map_err(|e| DatasetError::source_unavailable(url.as_str(), e))?;

    response
        .text()
        .await
        .map_err(|e| DatasetError::source_unavailable(url.as_str(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TABLE: &str = "\
No,Label,Definition,Examples,Grouping
1.1,Goal setting (behavior),Set or agree on a goal,\"Agree on a daily walking goal, e.g. 10k steps\",Goals
1.2,Problem solving,Analyse factors influencing the behavior,,Goals
7,Cues,Introduce environmental stimuli,Put a note on the fridge,Associations
";

    #[test]
    fn test_parses_rows_in_order() {
        let taxonomy = Taxonomy::from_csv_reader(TABLE.as_bytes(), "test").unwrap();

        assert_eq!(taxonomy.len(), 3);
        assert_eq!(
            taxonomy.ids().collect::<Vec<_>>(),
            vec!["1.1", "1.2", "7"]
        );
        let first = taxonomy.get(0).unwrap();
        assert_eq!(first.label, "Goal setting (behavior)");
        assert_eq!(first.examples, "Agree on a daily walking goal, e.g. 10k steps");
        assert_eq!(taxonomy.find("1.2").unwrap().examples, "");
        assert!(taxonomy.find("99").is_none());
    }

    #[test]
    fn test_missing_column_is_source_unavailable() {
        let table = "No,Label,Definition\n1.1,Goal setting,Set a goal\n";
        let err = Taxonomy::from_csv_reader(table.as_bytes(), "sheet").unwrap_err();
        assert!(matches!(err, DatasetError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let table = "No,Label,Definition,Examples\n1.1,A,B,C\n1.1,D,E,F\n";
        let err = Taxonomy::from_csv_reader(table.as_bytes(), "sheet").unwrap_err();
        assert!(err.to_string().contains("duplicate BCT id '1.1'"));
    }

    #[test]
    fn test_empty_table_rejected() {
        let table = "No,Label,Definition,Examples\n";
        let err = Taxonomy::from_csv_reader(table.as_bytes(), "sheet").unwrap_err();
        assert!(matches!(err, DatasetError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_source_parsing() {
        assert!(matches!(
            TaxonomySource::parse("https://example.com/bcts.csv"),
            TaxonomySource::Url(_)
        ));
        assert_eq!(
            TaxonomySource::parse("./bcts.csv"),
            TaxonomySource::File(PathBuf::from("./bcts.csv"))
        );
        assert!(matches!(TaxonomySource::default(), TaxonomySource::Url(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TABLE.as_bytes()).unwrap();

        let source = TaxonomySource::File(file.path().to_path_buf());
        let taxonomy = Taxonomy::load(&source).await.unwrap();
        assert_eq!(taxonomy.len(), 3);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_source_unavailable() {
        let source = TaxonomySource::File(PathBuf::from("/nonexistent/bcts.csv"));
        let err = Taxonomy::load(&source).await.unwrap_err();
        assert!(matches!(err, DatasetError::SourceUnavailable { .. }));
    }
}

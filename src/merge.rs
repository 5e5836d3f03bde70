use crate::error::{DatasetError, Result};
use crate::storage;
use crate::taxonomy::Taxonomy;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRow {
    pub message: String,
    /// Id of the BCT the message was generated for
    pub bct: String,
}

/// All per-category tables of a run, in taxonomy order. A row's index is
/// its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedTable {
    pub rows: Vec<MergedRow>,
}

impl MergedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes `,message,bct` followed by one `index,message,bct` row each.
    pub fn write(&self, path: &Path) -> Result<()> {
        storage::write_atomically(path, |writer| {
            writer.write_record(["", "message", "bct"])?;
            for (index, row) in self.rows.iter().enumerate() {
                writer.write_record([
                    index.to_string().as_str(),
                    row.message.as_str(),
                    row.bct.as_str(),
                ])?;
            }
            Ok(())
        })
    }
}

/// Reads back every per-category table of `template` in taxonomy order.
///
/// Every expected file is checked up front so the error names all missing
/// BCTs at once, not just the first.
#[instrument(skip(taxonomy, data_dir), err)]
pub fn merge_dataset(
    taxonomy: &Taxonomy,
    data_dir: &Path,
    template: &str,
) -> Result<MergedTable> {
    let missing: Vec<String> = taxonomy
        .ids()
        .filter(|id| !storage::category_path(data_dir, template, id).is_file())
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(DatasetError::missing_output(missing));
    }

    let mut table = MergedTable::default();
    for id in taxonomy.ids() {
        let path = storage::category_path(data_dir, template, id);
        let messages = storage::read_messages(&path)?;
        table
            .rows
            .extend(messages.into_iter().map(|message| MergedRow {
                message,
                bct: id.to_string(),
            }));
    }
    Ok(table)
}

/// Merges and writes `<data_dir>/<template>.csv`, returning its path.
pub fn merge_and_write(
    taxonomy: &Taxonomy,
    data_dir: &Path,
    template: &str,
) -> Result<PathBuf> {
    let table = merge_dataset(taxonomy, data_dir, template)?;
    let path = storage::merged_path(data_dir, template);
    table.write(&path)?;
    info!(
        "Merged {} messages from {} BCTs into {}",
        table.len(),
        taxonomy.len(),
        path.display()
    );
    Ok(path)
}

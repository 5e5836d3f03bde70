use crate::error::{DatasetError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `<data_dir>/<template>/`
pub fn category_dir(data_dir: &Path, template: &str) -> PathBuf {
    data_dir.join(template)
}

/// `<data_dir>/<template>/<category_id>.csv`
pub fn category_path(
    data_dir: &Path,
    template: &str,
    category_id: &str,
) -> PathBuf {
    category_dir(data_dir, template).join(format!("{}.csv", category_id))
}

/// `<data_dir>/<template>.csv`
pub fn merged_path(data_dir: &Path, template: &str) -> PathBuf {
    data_dir.join(format!("{}.csv", template))
}

/// Writes rows to a temporary file beside `path`, then renames it into
/// place. Readers never see a half-written table.
pub(crate) fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<&mut File>) -> Result<()>,
{
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(temp.as_file_mut());
        fill(&mut writer)?;
        writer.flush()?;
    }
    temp.persist(path).map_err(|e| DatasetError::Io(e.error))?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Persists one message per row, without a header.
pub fn write_messages(path: &Path, messages: &[String]) -> Result<()> {
    write_atomically(path, |writer| {
        for message in messages {
            writer.write_record([message])?;
        }
        Ok(())
    })
}

/// Reads back a table written by [`write_messages`].
pub fn read_messages(path: &Path) -> Result<Vec<String>> {
    let location = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| DatasetError::source_unavailable(&location, e))?;

    let mut messages = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| DatasetError::source_unavailable(&location, e))?;
        if record.len() != 1 {
            return Err(DatasetError::source_unavailable(
                &location,
                format!("expected 1 column, found {}", record.len()),
            ));
        }
        messages.push(record[0].to_string());
    }
    Ok(messages)
}

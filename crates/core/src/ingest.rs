use crate::error::IngestError;
use crate::models::Table;
use crate::naming::sanitize_index_name;
use crate::normalize::normalize;
use crate::tabular::read_csv_table;
use std::path::Path;
use tracing::info;

/// Read a CSV file and normalize it into a backend-ready table.
pub fn load_csv_table(path: &Path) -> Result<Table, IngestError> {
    let table = read_csv_table(path)?;
    Ok(normalize(&table))
}

/// Default index name for an uploaded file: the file stem, sanitized.
pub fn index_name_for_file(path: &Path) -> Result<String, IngestError> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing file name: {}", path.display()))
        })?;

    Ok(sanitize_index_name(stem))
}

/// Download a bootstrap data file to `dest`. Used when a configured remote
/// source should seed the local file before ingestion.
pub async fn fetch_remote_csv(url: &str, dest: &Path) -> Result<(), IngestError> {
    info!(url, dest = %dest.display(), "downloading remote data file");

    let response = reqwest::get(url).await?.error_for_status()?;
    let bytes = response.bytes().await?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, &bytes).await?;

    info!(bytes = bytes.len(), "download complete");
    Ok(())
}

use crate::error::IngestError;
use crate::models::Table;
use std::path::Path;

/// Read a CSV file into a [`Table`]. The header row becomes the column list;
/// records shorter than the header leave their trailing cells missing, to be
/// filled later by normalization.
pub fn read_csv_table(path: &Path) -> Result<Table, IngestError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut table = Table::new(headers.clone());
    for record in reader.records() {
        let record = record?;
        table.push_row(
            headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string)),
        );
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn header_becomes_column_list() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("cities.csv");
        fs::write(&path, "city,state\nBoston,MA\nAustin,TX\n")?;

        let table = read_csv_table(&path)?;
        assert_eq!(table.columns, vec!["city", "state"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "city"), Some("Austin"));
        Ok(())
    }

    #[test]
    fn short_records_leave_cells_missing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("partial.csv");
        fs::write(&path, "a,b,c\n1,2\n")?;

        let table = read_csv_table(&path)?;
        assert_eq!(table.cell(0, "b"), Some("2"));
        assert_eq!(table.cell(0, "c"), None);
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = read_csv_table(Path::new("/nonexistent/input.csv"));
        assert!(result.is_err());
    }
}

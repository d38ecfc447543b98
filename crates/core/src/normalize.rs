use crate::models::Table;

/// Sentinel strings that stand in for a missing value in uploaded data.
pub const MISSING_SENTINELS: [&str; 2] = ["__NA__", "N/A"];

/// Fill value for missing cells in predominantly numeric columns.
pub const NUMERIC_FILL: &str = "0";

/// Fill value for missing cells in all other columns.
pub const TEXT_FILL: &str = "No Data";

/// Standardize a raw table into a backend-ready document set.
///
/// Sentinel strings (`__NA__`, `N/A`) and blank cells are treated as missing.
/// Columns whose remaining values are predominantly numeric get missing cells
/// filled with `"0"`; every other column is filled with `"No Data"`. The
/// output carries every column in every row, all values as strings.
///
/// Idempotent: normalizing an already-normalized table is a no-op.
pub fn normalize(table: &Table) -> Table {
    let numeric_columns: Vec<&String> = table
        .columns
        .iter()
        .filter(|column| is_predominantly_numeric(table, column))
        .collect();

    let mut normalized = Table::new(table.columns.clone());
    for row in &table.rows {
        let cells = table.columns.iter().map(|column| {
            let value = match row.get(column) {
                Some(value) if !is_missing(value) => value.clone(),
                _ if numeric_columns.contains(&column) => NUMERIC_FILL.to_string(),
                _ => TEXT_FILL.to_string(),
            };
            (column.clone(), value)
        });
        normalized.push_row(cells);
    }

    normalized
}

fn is_missing(value: &str) -> bool {
    value.trim().is_empty() || MISSING_SENTINELS.contains(&value)
}

/// A column is numeric when a strict majority of its non-missing cells parse
/// as numbers. A column with no non-missing cells is not numeric, so a table
/// with no numeric columns at all takes the text-fill path throughout.
fn is_predominantly_numeric(table: &Table, column: &str) -> bool {
    let mut non_missing = 0usize;
    let mut numeric = 0usize;

    for row in &table.rows {
        match row.get(column) {
            Some(value) if !is_missing(value) => {
                non_missing += 1;
                if value.trim().parse::<f64>().is_ok() {
                    numeric += 1;
                }
            }
            _ => {}
        }
    }

    non_missing > 0 && numeric * 2 > non_missing
}

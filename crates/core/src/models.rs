use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One table row. Cell lookup is by column name; column order lives on the
/// owning [`Table`], not on the row.
pub type Row = HashMap<String, String>;

/// An ordered, stringly-typed table. Columns are discovered from the first
/// ingested source (CSV header or first query hit); rows may lack a column,
/// which counts as a missing value until normalization fills it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row from `(column, value)` pairs. Columns not seen before are
    /// added to the column list in arrival order.
    pub fn push_row<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut row = Row::new();
        for (column, value) in cells {
            if !self.columns.iter().any(|existing| existing == &column) {
                self.columns.push(column.clone());
            }
            row.insert(column, value);
        }
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of one bulk write. Partial failure is data, not an error; the
/// caller decides whether to surface it. The index is left as the backend
/// left it, with no rollback.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub index: String,
    pub success_count: u64,
    pub failed_count: u64,
    pub failed_reasons: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl LoadReport {
    pub fn empty(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            success_count: 0,
            failed_count: 0,
            failed_reasons: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    pub fn is_partial(&self) -> bool {
        self.failed_count > 0
    }
}

/// Cursor-based full-scan settings: one page of backend state in flight at a
/// time, context kept alive between fetches.
#[derive(Debug, Clone, Copy)]
pub struct ScrollOptions {
    pub page_size: usize,
    pub keep_alive_secs: u64,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            page_size: 1000,
            keep_alive_secs: 120,
        }
    }
}

/// Query-time settings. Fuzziness is the maximum edit distance applied
/// uniformly to every clause of one query.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub fuzziness: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { fuzziness: 2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_row_discovers_columns_in_arrival_order() {
        let mut table = Table::default();
        table.push_row([
            ("city".to_string(), "Boston".to_string()),
            ("zip".to_string(), "02134".to_string()),
        ]);
        table.push_row([
            ("state".to_string(), "MA".to_string()),
            ("city".to_string(), "Cambridge".to_string()),
        ]);

        assert_eq!(table.columns, vec!["city", "zip", "state"]);
        assert_eq!(table.cell(1, "city"), Some("Cambridge"));
        assert_eq!(table.cell(1, "zip"), None);
    }

    #[test]
    fn empty_report_is_not_partial() {
        let report = LoadReport::empty("cities");
        assert_eq!(report.success_count, 0);
        assert!(!report.is_partial());
    }
}

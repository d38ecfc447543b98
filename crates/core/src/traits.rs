use crate::error::SearchError;
use crate::models::{LoadReport, Table};
use async_trait::async_trait;

/// The backend document store as this system consumes it: bulk write, scoped
/// fuzzy query, cursor-based full scan, and metadata reads. The session layer
/// and tests depend on this seam rather than on a concrete backend.
#[async_trait]
pub trait DocumentStore {
    /// Create the index if it does not exist. Never deletes.
    async fn ensure_index(&self, index: &str) -> Result<(), SearchError>;

    /// Write every row of `table` in one bulk operation. Partial failure is
    /// reported in the [`LoadReport`], not raised.
    async fn bulk_load(&self, index: &str, table: &Table) -> Result<LoadReport, SearchError>;

    /// All index names known to the backend. Transport failure is non-fatal:
    /// logged and reported as an empty list.
    async fn list_indices(&self) -> Vec<String>;

    /// Field names of one index, in the order the backend reports them.
    /// Missing index or missing mapping yields an empty list.
    async fn list_fields(&self, index: &str) -> Vec<String>;

    /// Full contents of an index via paginated scan. A nonexistent index
    /// yields an empty table, not an error.
    async fn read_all(&self, index: &str) -> Result<Table, SearchError>;

    /// Fuzzy OR-query with one field-scoped clause per `(field, term)` entry.
    /// A document matches when **any** clause matches.
    async fn search_per_field(
        &self,
        index: &str,
        filters: &[(String, String)],
    ) -> Result<Table, SearchError>;

    /// Fuzzy OR-query with one clause per term, each spanning all given
    /// fields. A document matches when **any** term matches any field.
    async fn search_any_field(
        &self,
        index: &str,
        fields: &[String],
        terms: &[String],
    ) -> Result<Table, SearchError>;
}

use crate::error::SearchError;
use crate::models::Table;
use crate::traits::DocumentStore;
use std::collections::BTreeMap;

/// Outcome of a background index-list poll. A change is reported to the
/// caller (so a UI can prompt the user to refresh) rather than applied to
/// the current view transparently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRefresh {
    Unchanged,
    Changed(Vec<String>),
}

/// Per-session interaction state: the selected index, its cached full table
/// and field list, and the current filter values. One session belongs to one
/// user; nothing here is shared between sessions or stored globally.
pub struct SearchSession<S> {
    store: S,
    index: Option<String>,
    fields: Vec<String>,
    cached_table: Option<Table>,
    known_indices: Vec<String>,
    filters: BTreeMap<String, String>,
}

impl<S> SearchSession<S>
where
    S: DocumentStore + Send + Sync,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            index: None,
            fields: Vec::new(),
            cached_table: None,
            known_indices: Vec::new(),
            filters: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn selected_index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Fields of the selected index, in backend order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Poll the backend for the current index list and compare it with the
    /// last one seen. Read-only; safe to run on a timer.
    pub async fn refresh_indices(&mut self) -> IndexRefresh {
        let latest = self.store.list_indices().await;
        if latest == self.known_indices {
            return IndexRefresh::Unchanged;
        }

        self.known_indices = latest.clone();
        IndexRefresh::Changed(latest)
    }

    /// Select an index to work with: loads its full contents and field list
    /// (concurrently) into the session cache and clears any filters left
    /// over from the previous index.
    pub async fn select_index(&mut self, name: &str) -> Result<(), SearchError> {
        let (table, fields) = tokio::join!(self.store.read_all(name), self.store.list_fields(name));

        self.cached_table = Some(table?);
        self.fields = fields;
        self.index = Some(name.to_string());
        self.filters.clear();
        Ok(())
    }

    pub fn set_filter(&mut self, field: impl Into<String>, term: impl Into<String>) {
        self.filters.insert(field.into(), term.into());
    }

    pub fn reset_filters(&mut self) {
        self.filters.clear();
    }

    /// Filter entries that would actually reach the backend: blank values
    /// are excluded before query construction.
    pub fn active_filters(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .filter(|(_, term)| !term.trim().is_empty())
            .map(|(field, term)| (field.clone(), term.trim().to_string()))
            .collect()
    }

    /// The table the session should currently display. With no active
    /// filters this is the cached full table and the backend is not
    /// consulted; otherwise it is a fuzzy per-field OR-query.
    pub async fn current_view(&self) -> Result<Table, SearchError> {
        let Some(index) = self.index.as_deref() else {
            return Ok(Table::default());
        };

        let active = self.active_filters();
        if active.is_empty() {
            return Ok(self.cached_table.clone().unwrap_or_default());
        }

        self.store.search_per_field(index, &active).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LoadReport;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        tables: Mutex<HashMap<String, Table>>,
        search_calls: AtomicUsize,
    }

    impl FakeStore {
        fn with_table(index: &str, table: Table) -> Self {
            let store = Self::default();
            store
                .tables
                .lock()
                .unwrap()
                .insert(index.to_string(), table);
            store
        }

        fn search_calls(&self) -> usize {
            self.search_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn ensure_index(&self, _index: &str) -> Result<(), SearchError> {
            Ok(())
        }

        async fn bulk_load(&self, index: &str, table: &Table) -> Result<LoadReport, SearchError> {
            self.tables
                .lock()
                .unwrap()
                .insert(index.to_string(), table.clone());
            let mut report = LoadReport::empty(index);
            report.success_count = table.len() as u64;
            Ok(report)
        }

        async fn list_indices(&self) -> Vec<String> {
            let mut names: Vec<String> = self.tables.lock().unwrap().keys().cloned().collect();
            names.sort();
            names
        }

        async fn list_fields(&self, index: &str) -> Vec<String> {
            self.tables
                .lock()
                .unwrap()
                .get(index)
                .map(|table| table.columns.clone())
                .unwrap_or_default()
        }

        async fn read_all(&self, index: &str) -> Result<Table, SearchError> {
            Ok(self
                .tables
                .lock()
                .unwrap()
                .get(index)
                .cloned()
                .unwrap_or_default())
        }

        async fn search_per_field(
            &self,
            index: &str,
            filters: &[(String, String)],
        ) -> Result<Table, SearchError> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            let full = self.read_all(index).await?;

            let mut matched = Table::new(full.columns.clone());
            for row in &full.rows {
                let hit = filters.iter().any(|(field, term)| {
                    row.get(field)
                        .is_some_and(|value| value.to_lowercase().contains(&term.to_lowercase()))
                });
                if hit {
                    matched.push_row(row.clone());
                }
            }
            Ok(matched)
        }

        async fn search_any_field(
            &self,
            index: &str,
            fields: &[String],
            terms: &[String],
        ) -> Result<Table, SearchError> {
            let filters: Vec<(String, String)> = fields
                .iter()
                .flat_map(|field| terms.iter().map(move |term| (field.clone(), term.clone())))
                .collect();
            self.search_per_field(index, &filters).await
        }
    }

    fn cities_table() -> Table {
        let mut table = Table::new(vec!["city".to_string(), "state".to_string()]);
        table.push_row([
            ("city".to_string(), "Boston".to_string()),
            ("state".to_string(), "MA".to_string()),
        ]);
        table.push_row([
            ("city".to_string(), "Austin".to_string()),
            ("state".to_string(), "TX".to_string()),
        ]);
        table
    }

    #[tokio::test]
    async fn empty_filter_set_serves_the_cache_without_searching() {
        let store = FakeStore::with_table("cities", cities_table());
        let mut session = SearchSession::new(store);
        session.select_index("cities").await.unwrap();

        session.set_filter("city", "   ");
        let view = session.current_view().await.unwrap();

        assert_eq!(view.len(), 2);
        assert_eq!(session.store().search_calls(), 0);
    }

    #[tokio::test]
    async fn non_empty_filters_query_the_store() {
        let store = FakeStore::with_table("cities", cities_table());
        let mut session = SearchSession::new(store);
        session.select_index("cities").await.unwrap();

        session.set_filter("city", "Boston");
        let view = session.current_view().await.unwrap();

        assert_eq!(view.len(), 1);
        assert_eq!(view.cell(0, "state"), Some("MA"));
        assert_eq!(session.store().search_calls(), 1);
    }

    #[tokio::test]
    async fn a_row_matching_only_one_filter_is_still_returned() {
        let store = FakeStore::with_table("cities", cities_table());
        let mut session = SearchSession::new(store);
        session.select_index("cities").await.unwrap();

        session.set_filter("city", "Boston");
        session.set_filter("state", "ZZ");
        let view = session.current_view().await.unwrap();

        assert_eq!(view.len(), 1, "OR semantics: one matching clause suffices");
        assert_eq!(view.cell(0, "city"), Some("Boston"));
    }

    #[tokio::test]
    async fn reset_restores_the_full_cached_table() {
        let store = FakeStore::with_table("cities", cities_table());
        let mut session = SearchSession::new(store);
        session.select_index("cities").await.unwrap();

        session.set_filter("city", "Austin");
        assert_eq!(session.current_view().await.unwrap().len(), 1);

        session.reset_filters();
        assert_eq!(session.current_view().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn selecting_an_index_caches_its_fields_and_clears_filters() {
        let store = FakeStore::with_table("cities", cities_table());
        let mut session = SearchSession::new(store);

        session.set_filter("city", "stale");
        session.select_index("cities").await.unwrap();

        assert_eq!(session.fields(), ["city", "state"]);
        assert!(session.active_filters().is_empty());
    }

    #[tokio::test]
    async fn refresh_reports_index_list_changes_once() {
        let store = FakeStore::with_table("cities", cities_table());
        let mut session = SearchSession::new(store);

        assert_eq!(
            session.refresh_indices().await,
            IndexRefresh::Changed(vec!["cities".to_string()])
        );
        assert_eq!(session.refresh_indices().await, IndexRefresh::Unchanged);

        session
            .store()
            .tables
            .lock()
            .unwrap()
            .insert("towns".to_string(), Table::default());
        assert!(matches!(
            session.refresh_indices().await,
            IndexRefresh::Changed(_)
        ));
    }

    #[tokio::test]
    async fn no_selected_index_views_as_empty() {
        let session = SearchSession::new(FakeStore::default());
        assert!(session.current_view().await.unwrap().is_empty());
    }
}

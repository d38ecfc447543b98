use crate::error::SearchError;
use crate::models::{LoadReport, QueryOptions, ScrollOptions, Table};
use crate::naming::sanitize_index_name;
use crate::traits::DocumentStore;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};
use url::Url;

/// HTTP client for an Elasticsearch-compatible document store. Indexing goes
/// through the `_bulk` endpoint as a single NDJSON request; full reads use
/// the scroll protocol; queries are built as `bool.should` fuzzy clauses.
pub struct ElasticStore {
    client: Arc<Client>,
    endpoint: String,
    credentials: Option<(String, String)>,
    scroll: ScrollOptions,
    query: QueryOptions,
}

impl ElasticStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SearchError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;

        Ok(Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credentials: None,
            scroll: ScrollOptions::default(),
            query: QueryOptions::default(),
        })
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn with_scroll_options(mut self, scroll: ScrollOptions) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn with_query_options(mut self, query: QueryOptions) -> Self {
        self.query = query;
        self
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{}", self.endpoint, path));

        match &self.credentials {
            Some((username, password)) => builder.basic_auth(username, Some(password)),
            None => builder,
        }
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self.request(Method::HEAD, index).send().await?;

        if response.status() == StatusCode::OK {
            return Ok(true);
        }
        if response.status().is_client_error() {
            return Ok(false);
        }

        response.error_for_status()?;
        Ok(false)
    }

    /// Resolve a response into its JSON body, mapping 4xx to [`SearchError::Rejected`]
    /// with the backend's message and 5xx to [`SearchError::Unavailable`].
    async fn json_body(response: Response) -> Result<Value, SearchError> {
        if response.status().is_client_error() {
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::Rejected { details });
        }

        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }

    async fn run_search(&self, index: &str, body: &Value) -> Result<Table, SearchError> {
        let index = sanitize_index_name(index);
        let response = self
            .request(Method::POST, &format!("{index}/_search"))
            .json(body)
            .send()
            .await?;

        let page = Self::json_body(response).await?;
        let mut table = Table::default();
        append_hits(&mut table, &page);
        Ok(table)
    }

    async fn next_scroll_page(
        &self,
        scroll_id: &str,
        keep_alive: &str,
    ) -> Result<Value, SearchError> {
        let response = self
            .request(Method::POST, "_search/scroll")
            .json(&json!({ "scroll": keep_alive, "scroll_id": scroll_id }))
            .send()
            .await?;

        Self::json_body(response).await
    }

    /// Best-effort release of a scroll context. Failure only costs backend
    /// memory until the context's own keep-alive expires.
    async fn clear_scroll(&self, scroll_id: &str) {
        let outcome = self
            .request(Method::DELETE, "_search/scroll")
            .json(&json!({ "scroll_id": scroll_id }))
            .send()
            .await;

        if let Err(error) = outcome {
            debug!(%error, "failed to release scroll context");
        }
    }
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn ensure_index(&self, index: &str) -> Result<(), SearchError> {
        let index = sanitize_index_name(index);
        if self.index_exists(&index).await? {
            return Ok(());
        }

        // No explicit mappings: every document value is a string after
        // normalization, so dynamic inference on first write is safe.
        let response = self
            .request(Method::PUT, &index)
            .json(&json!({
                "settings": {
                    "number_of_shards": 1,
                    "number_of_replicas": 0
                }
            }))
            .send()
            .await?;

        if response.status().is_client_error() {
            let details = response.text().await.unwrap_or_default();
            return Err(SearchError::Rejected { details });
        }

        response.error_for_status()?;
        Ok(())
    }

    async fn bulk_load(&self, index: &str, table: &Table) -> Result<LoadReport, SearchError> {
        let index = sanitize_index_name(index);
        self.ensure_index(&index).await?;

        if table.is_empty() {
            return Ok(LoadReport::empty(index));
        }

        let payload = bulk_payload(&index, table)?;
        let response = self
            .request(Method::POST, "_bulk")
            .header("Content-Type", "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        let body = Self::json_body(response).await?;
        Ok(parse_bulk_report(&index, &body))
    }

    async fn list_indices(&self) -> Vec<String> {
        let response = match self
            .request(Method::GET, "_cat/indices?format=json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                error!(%error, "could not reach backend to list indices");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            error!(status = %response.status(), "index listing rejected by backend");
            return Vec::new();
        }

        let entries: Vec<Value> = match response.json().await {
            Ok(entries) => entries,
            Err(error) => {
                error!(%error, "malformed index listing from backend");
                return Vec::new();
            }
        };

        entries
            .iter()
            .filter_map(|entry| entry.pointer("/index").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    async fn list_fields(&self, index: &str) -> Vec<String> {
        let index = sanitize_index_name(index);
        let response = match self
            .request(Method::GET, &format!("{index}/_mapping"))
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                error!(%error, index, "could not reach backend for index mapping");
                return Vec::new();
            }
        };

        // Missing index reads as "no fields yet", not as a failure.
        if !response.status().is_success() {
            return Vec::new();
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(error) => {
                error!(%error, index, "malformed mapping from backend");
                return Vec::new();
            }
        };

        mapping_field_names(&index, &body)
    }

    async fn read_all(&self, index: &str) -> Result<Table, SearchError> {
        let index = sanitize_index_name(index);
        if !self.index_exists(&index).await? {
            return Ok(Table::default());
        }

        let keep_alive = format!("{}s", self.scroll.keep_alive_secs);
        let response = self
            .request(Method::POST, &format!("{index}/_search?scroll={keep_alive}"))
            .json(&json!({
                "query": { "match_all": {} },
                "size": self.scroll.page_size
            }))
            .send()
            .await?;

        let first_page = Self::json_body(response).await?;
        let mut table = Table::default();
        let mut appended = append_hits(&mut table, &first_page);
        let mut scroll_id = scroll_id_of(&first_page);

        let mut failure = None;
        while appended > 0 {
            let Some(id) = scroll_id.clone() else { break };
            match self.next_scroll_page(&id, &keep_alive).await {
                Ok(page) => {
                    appended = append_hits(&mut table, &page);
                    if let Some(next) = scroll_id_of(&page) {
                        scroll_id = Some(next);
                    }
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }

        // Release the cursor whether the scan completed or was abandoned.
        if let Some(id) = scroll_id {
            self.clear_scroll(&id).await;
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(table),
        }
    }

    async fn search_per_field(
        &self,
        index: &str,
        filters: &[(String, String)],
    ) -> Result<Table, SearchError> {
        let active = active_entries(filters);
        if active.is_empty() {
            return Err(SearchError::InvalidQuery(
                "every filter was blank after trimming".to_string(),
            ));
        }

        let body = per_field_query(&active, self.query.fuzziness);
        self.run_search(index, &body).await
    }

    async fn search_any_field(
        &self,
        index: &str,
        fields: &[String],
        terms: &[String],
    ) -> Result<Table, SearchError> {
        let terms: Vec<String> = terms
            .iter()
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty())
            .collect();

        if fields.is_empty() {
            return Err(SearchError::InvalidQuery(
                "no fields given to search over".to_string(),
            ));
        }
        if terms.is_empty() {
            return Err(SearchError::InvalidQuery(
                "every search term was blank after trimming".to_string(),
            ));
        }

        let body = any_field_query(fields, &terms, self.query.fuzziness);
        self.run_search(index, &body).await
    }
}

/// Drop filter entries whose term is blank after trimming.
fn active_entries(filters: &[(String, String)]) -> Vec<(String, String)> {
    filters
        .iter()
        .filter(|(_, term)| !term.trim().is_empty())
        .map(|(field, term)| (field.clone(), term.trim().to_string()))
        .collect()
}

/// One fuzzy `match` clause per `(field, term)` entry, combined with OR
/// semantics: `minimum_should_match: 1` means a document is a hit when any
/// single clause matches, not all of them.
pub fn per_field_query(filters: &[(String, String)], fuzziness: u32) -> Value {
    let clauses: Vec<Value> = filters
        .iter()
        .map(|(field, term)| {
            json!({
                "match": {
                    field: {
                        "query": term,
                        "fuzziness": fuzziness.to_string()
                    }
                }
            })
        })
        .collect();

    json!({
        "query": {
            "bool": {
                "should": clauses,
                "minimum_should_match": 1
            }
        }
    })
}

/// One fuzzy `multi_match` clause per free term, each spanning all given
/// fields, combined with the same OR semantics as [`per_field_query`].
pub fn any_field_query(fields: &[String], terms: &[String], fuzziness: u32) -> Value {
    let clauses: Vec<Value> = terms
        .iter()
        .map(|term| {
            json!({
                "multi_match": {
                    "query": term,
                    "fields": fields,
                    "fuzziness": fuzziness.to_string()
                }
            })
        })
        .collect();

    json!({
        "query": {
            "bool": {
                "should": clauses,
                "minimum_should_match": 1
            }
        }
    })
}

/// Serialize a table into `_bulk` NDJSON. Document ids are row ordinals, so
/// re-uploading a file overwrites documents by position.
fn bulk_payload(index: &str, table: &Table) -> Result<String, SearchError> {
    let mut lines = Vec::with_capacity(table.rows.len() * 2);

    for (ordinal, row) in table.rows.iter().enumerate() {
        lines.push(serde_json::to_string(&json!({
            "index": { "_index": index, "_id": ordinal }
        }))?);

        let mut document = serde_json::Map::new();
        for column in &table.columns {
            if let Some(value) = row.get(column) {
                document.insert(column.clone(), Value::String(value.clone()));
            }
        }
        lines.push(serde_json::to_string(&Value::Object(document))?);
    }

    Ok(lines.join("\n") + "\n")
}

/// Fold the item-level `_bulk` response into success/failure counts. Item
/// failures do not fail the load; the caller sees them in the report.
fn parse_bulk_report(index: &str, body: &Value) -> LoadReport {
    let items = body
        .pointer("/items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut success_count = 0u64;
    let mut failed_count = 0u64;
    let mut failed_reasons = Vec::new();

    for item in &items {
        let action = item
            .pointer("/index")
            .or_else(|| item.pointer("/create"))
            .cloned()
            .unwrap_or(Value::Null);

        let status = action
            .pointer("/status")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        if (200..300).contains(&status) {
            success_count += 1;
        } else {
            failed_count += 1;
            let reason = action
                .pointer("/error/reason")
                .and_then(Value::as_str)
                .unwrap_or("unknown failure")
                .to_string();
            failed_reasons.push(reason);
        }
    }

    LoadReport {
        index: index.to_string(),
        success_count,
        failed_count,
        failed_reasons,
        completed_at: Utc::now(),
    }
}

/// Append every hit's `_source` to the table, preserving arrival order and
/// the backend's field order within each document. Returns the hit count of
/// this page so the scroll loop can detect the final, empty page.
fn append_hits(table: &mut Table, page: &Value) -> usize {
    let hits = page
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let count = hits.len();
    for hit in &hits {
        if let Some(source) = hit.pointer("/_source").and_then(Value::as_object) {
            table.push_row(source.iter().map(|(field, value)| {
                let cell = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (field.clone(), cell)
            }));
        }
    }

    count
}

fn scroll_id_of(page: &Value) -> Option<String> {
    page.pointer("/_scroll_id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Field names from a `GET /{index}/_mapping` body, in the order the backend
/// serialized them. Relies on `serde_json`'s `preserve_order` feature; the
/// backend does not promise alphabetical order and neither do we.
fn mapping_field_names(index: &str, body: &Value) -> Vec<String> {
    body.pointer(&format!("/{index}/mappings/properties"))
        .and_then(Value::as_object)
        .map(|properties| properties.keys().cloned().collect())
        .unwrap_or_default()
}

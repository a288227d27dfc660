//! Client for a PostgREST-style hosted service (`/rest/v1/<table>`).
//!
//! Every call is a single request with no retries; failures surface as
//! [`StoreError`] for the caller to report.

use crate::core::error::{StoreError, WriteAction};
use crate::core::store::{Filter, Query, Store, Table};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::Value;
use tracing::debug;

pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn filter_param(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq(column, value) => (column.clone(), format!("eq.{}", filter_value(value))),
        Filter::IsNull(column) => (column.clone(), "is.null".to_string()),
        Filter::Gte(column, value) => (column.clone(), format!("gte.{}", filter_value(value))),
        Filter::Lt(column, value) => (column.clone(), format!("lt.{}", filter_value(value))),
    }
}

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(query.filters.iter().map(filter_param));
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, table: Table, params: &[(String, String)]) -> anyhow::Result<Url> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, table.name()))
            .with_context(|| format!("Invalid store base url: {}", self.base_url))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Sends a request that returns the affected rows.
    async fn send_for_rows(&self, request: RequestBuilder) -> anyhow::Result<Vec<Value>> {
        let response = request
            .header("Prefer", "return=representation")
            .send()
            .await
            .context("Store request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read store response")?;
        if !status.is_success() {
            debug!(%status, response = %body, "Store rejected request");
            return Err(anyhow!("store responded with {status}: {body}"));
        }
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&body).context("Failed to parse store response")
    }

    fn id_filter(id: &str) -> Vec<(String, String)> {
        vec![filter_param(&Filter::eq("id", id))]
    }
}

#[async_trait]
impl Store for RestStore {
    async fn fetch(&self, table: Table, query: &Query) -> Result<Vec<Value>, StoreError> {
        let url = self
            .table_url(table, &query_params(query))
            .map_err(|e| StoreError::fetch(table, e))?;
        debug!("REST GET {}", url);
        self.send_for_rows(self.request(Method::GET, url))
            .await
            .map_err(|e| StoreError::fetch(table, e))
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        let write_err = |e: anyhow::Error| StoreError::write(table, WriteAction::Insert, e);
        let url = self.table_url(table, &[]).map_err(write_err)?;
        debug!("REST POST {}", url);
        let rows = self
            .send_for_rows(self.request(Method::POST, url).json(&record))
            .await
            .map_err(write_err)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| write_err(anyhow!("store returned no row for the insert")))
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        let write_err = |e: anyhow::Error| StoreError::write(table, WriteAction::Update, e);
        let url = self
            .table_url(table, &Self::id_filter(id))
            .map_err(write_err)?;
        debug!("REST PATCH {}", url);
        let rows = self
            .send_for_rows(self.request(Method::PATCH, url).json(&patch))
            .await
            .map_err(write_err)?;
        rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            table,
            id: id.to_string(),
        })
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let write_err = |e: anyhow::Error| StoreError::write(table, WriteAction::Delete, e);
        let url = self
            .table_url(table, &Self::id_filter(id))
            .map_err(write_err)?;
        debug!("REST DELETE {}", url);
        let rows = self
            .send_for_rows(self.request(Method::DELETE, url))
            .await
            .map_err(write_err)?;
        if rows.is_empty() {
            return Err(StoreError::NotFound {
                table,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// The service has no conditional insert over arbitrary filters, so this
    /// is a filtered PATCH followed by a POST when nothing matched.
    async fn upsert(
        &self,
        table: Table,
        key: &[Filter],
        patch: Value,
        record: Value,
    ) -> Result<Value, StoreError> {
        let write_err = |e: anyhow::Error| StoreError::write(table, WriteAction::Upsert, e);
        let params: Vec<(String, String)> = key.iter().map(filter_param).collect();
        let url = self.table_url(table, &params).map_err(write_err)?;
        debug!("REST PATCH {}", url);
        let rows = self
            .send_for_rows(self.request(Method::PATCH, url).json(&patch))
            .await
            .map_err(write_err)?;
        if let Some(row) = rows.into_iter().next() {
            return Ok(row);
        }
        self.insert(table, record).await
    }
}

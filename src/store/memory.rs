use super::{prepare_insert, sanitize_patch};
use crate::core::error::{StoreError, WriteAction};
use crate::core::store::{Filter, Query, Store, Table, merge_patch};
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

/// In-memory store keeping rows per table in insertion order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<Table, Vec<Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch(&self, table: Table, query: &Query) -> Result<Vec<Value>, StoreError> {
        let tables = self.inner.lock().await;
        let rows = tables.get(&table).cloned().unwrap_or_default();
        debug!("Memory FETCH {} ({} rows)", table, rows.len());
        Ok(query.apply(rows))
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        let (id, row) = prepare_insert(table, record)?;
        let mut tables = self.inner.lock().await;
        let rows = tables.entry(table).or_default();
        if rows.iter().any(|r| row_id(r) == Some(id.as_str())) {
            return Err(StoreError::write(
                table,
                WriteAction::Insert,
                anyhow!("duplicate id {id}"),
            ));
        }
        debug!("Memory INSERT {} {}", table, id);
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        let patch = sanitize_patch(patch);
        let mut tables = self.inner.lock().await;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            .ok_or_else(|| StoreError::NotFound {
                table,
                id: id.to_string(),
            })?;
        merge_patch(row, &patch);
        debug!("Memory UPDATE {} {}", table, id);
        Ok(row.clone())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().await;
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|r| row_id(r) != Some(id));
        if rows.len() == before {
            return Err(StoreError::NotFound {
                table,
                id: id.to_string(),
            });
        }
        debug!("Memory DELETE {} {}", table, id);
        Ok(())
    }

    async fn upsert(
        &self,
        table: Table,
        key: &[Filter],
        patch: Value,
        record: Value,
    ) -> Result<Value, StoreError> {
        let patch = sanitize_patch(patch);
        // The whole find-or-insert runs under one lock.
        let mut tables = self.inner.lock().await;
        let rows = tables.entry(table).or_default();
        if let Some(row) = rows
            .iter_mut()
            .find(|row| key.iter().all(|f| f.matches(row)))
        {
            merge_patch(row, &patch);
            debug!("Memory UPSERT {} updated existing row", table);
            return Ok(row.clone());
        }

        let (id, row) = prepare_insert(table, record)?;
        debug!("Memory UPSERT {} inserted {}", table, id);
        rows.push(row.clone());
        Ok(row)
    }
}

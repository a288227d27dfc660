use super::{prepare_insert, sanitize_patch};
use crate::core::error::{StoreError, WriteAction};
use crate::core::store::{Filter, Query, Store, Table, merge_patch};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

/// Store backed by an embedded fjall keyspace, one partition per table.
/// Rows are JSON documents keyed by id.
pub struct LocalStore {
    keyspace: Keyspace,
    partitions: HashMap<Table, PartitionHandle>,
    // Serializes read-modify-write sequences such as upserts.
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;
        let keyspace = fjall::Config::new(path.join("store")).open()?;

        let mut partitions = HashMap::new();
        for table in Table::ALL {
            let partition =
                keyspace.open_partition(table.name(), PartitionCreateOptions::default())?;
            partitions.insert(table, partition);
        }

        Ok(Self {
            keyspace,
            partitions,
            write_lock: Mutex::new(()),
        })
    }

    fn partition(&self, table: Table) -> Result<&PartitionHandle> {
        self.partitions
            .get(&table)
            .ok_or_else(|| anyhow!("partition for {table} is not open"))
    }

    fn read_all(&self, table: Table) -> Result<Vec<Value>> {
        let partition = self.partition(table)?;
        let mut rows = Vec::new();
        for item in partition.iter() {
            let (_, value) = item?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn read_one(&self, table: Table, id: &str) -> Result<Option<Value>> {
        match self.partition(table)?.get(id.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn write_row(&self, table: Table, id: &str, row: &Value) -> Result<()> {
        self.partition(table)?
            .insert(id.as_bytes(), serde_json::to_vec(row)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn remove_row(&self, table: Table, id: &str) -> Result<()> {
        self.partition(table)?.remove(id.as_bytes())?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn apply_patch(&self, table: Table, mut row: Value, patch: &Value) -> Result<Value> {
        merge_patch(&mut row, patch);
        let id = row
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("stored row has no id"))?
            .to_string();
        self.write_row(table, &id, &row)?;
        Ok(row)
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn fetch(&self, table: Table, query: &Query) -> Result<Vec<Value>, StoreError> {
        let rows = self
            .read_all(table)
            .map_err(|e| StoreError::fetch(table, e))?;
        debug!("Local FETCH {} ({} rows)", table, rows.len());
        Ok(query.apply(rows))
    }

    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError> {
        let (id, row) = prepare_insert(table, record)?;
        let write_err = |e: anyhow::Error| StoreError::write(table, WriteAction::Insert, e);

        let _guard = self.write_lock.lock().await;
        if self.read_one(table, &id).map_err(write_err)?.is_some() {
            return Err(write_err(anyhow!("duplicate id {id}")));
        }
        self.write_row(table, &id, &row).map_err(write_err)?;
        debug!("Local INSERT {} {}", table, id);
        Ok(row)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError> {
        let patch = sanitize_patch(patch);
        let write_err = |e: anyhow::Error| StoreError::write(table, WriteAction::Update, e);

        let _guard = self.write_lock.lock().await;
        let row = self
            .read_one(table, id)
            .map_err(write_err)?
            .ok_or_else(|| StoreError::NotFound {
                table,
                id: id.to_string(),
            })?;
        let row = self.apply_patch(table, row, &patch).map_err(write_err)?;
        debug!("Local UPDATE {} {}", table, id);
        Ok(row)
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let write_err = |e: anyhow::Error| StoreError::write(table, WriteAction::Delete, e);

        let _guard = self.write_lock.lock().await;
        if self.read_one(table, id).map_err(write_err)?.is_none() {
            return Err(StoreError::NotFound {
                table,
                id: id.to_string(),
            });
        }
        self.remove_row(table, id).map_err(write_err)?;
        debug!("Local DELETE {} {}", table, id);
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
        let write_err = |e: anyhow::Error| StoreError::write(table, WriteAction::Upsert, e);

        let _guard = self.write_lock.lock().await;
        let existing = self
            .read_all(table)
            .map_err(write_err)?
            .into_iter()
            .find(|row| key.iter().all(|f| f.matches(row)));

        if let Some(row) = existing {
            let row = self.apply_patch(table, row, &patch).map_err(write_err)?;
            debug!("Local UPSERT {} updated existing row", table);
            return Ok(row);
        }

        let (id, row) = prepare_insert(table, record)?;
        self.write_row(table, &id, &row).map_err(write_err)?;
        debug!("Local UPSERT {} inserted {}", table, id);
        Ok(row)
    }
}

pub mod disk;
pub mod memory;
pub mod rest;

use crate::core::config::{AppConfig, Backend};
use crate::core::error::{StoreError, WriteAction};
use crate::core::store::{Store, Table};
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use disk::LocalStore;
use rest::RestStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Opens the store backend selected in the configuration.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    match config.store.backend {
        Backend::Local => {
            let path = config.data_path()?;
            debug!("Opening local store at {}", path.display());
            let store = LocalStore::open(&path)
                .with_context(|| format!("Failed to open local store at {}", path.display()))?;
            Ok(Arc::new(store))
        }
        Backend::Rest => {
            let rest = config
                .store
                .rest
                .as_ref()
                .context("The rest backend needs `store.rest.base_url` and `store.rest.api_key`")?;
            debug!("Using REST store at {}", rest.base_url);
            Ok(Arc::new(RestStore::new(&rest.base_url, &rest.api_key)))
        }
    }
}

/// Fills in `id` and `created_at` the way the hosted service does for new rows.
pub(crate) fn prepare_insert(table: Table, mut record: Value) -> Result<(String, Value), StoreError> {
    let Some(object) = record.as_object_mut() else {
        return Err(StoreError::write(
            table,
            WriteAction::Insert,
            anyhow!("record must be a JSON object"),
        ));
    };

    let id = match object.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let id = Uuid::new_v4().to_string();
            object.insert("id".to_string(), Value::String(id.clone()));
            id
        }
    };
    if object.get("created_at").is_none_or(Value::is_null) {
        object.insert(
            "created_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }
    Ok((id, record))
}

/// Drops keys a patch must never overwrite.
pub(crate) fn sanitize_patch(mut patch: Value) -> Value {
    if let Some(object) = patch.as_object_mut() {
        object.remove("id");
    }
    patch
}

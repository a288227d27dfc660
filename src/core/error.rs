//! Error types shared by the store backends and the services built on them.

use crate::core::roles::Permission;
use crate::core::store::Table;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Insert,
    Update,
    Delete,
    Upsert,
}

impl Display for WriteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WriteAction::Insert => "insert",
            WriteAction::Update => "update",
            WriteAction::Delete => "delete",
            WriteAction::Upsert => "upsert",
        })
    }
}

/// Failures reported by a [`Store`](crate::core::store::Store).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to fetch {table}: {source}")]
    Fetch {
        table: Table,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to {action} {table}: {source}")]
    Write {
        table: Table,
        action: WriteAction,
        #[source]
        source: anyhow::Error,
    },

    #[error("No {table} record with id {id}")]
    NotFound { table: Table, id: String },

    #[error("Failed to decode {table} record: {source}")]
    Decode {
        table: Table,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn fetch(table: Table, source: impl Into<anyhow::Error>) -> Self {
        StoreError::Fetch {
            table,
            source: source.into(),
        }
    }

    pub fn write(table: Table, action: WriteAction, source: impl Into<anyhow::Error>) -> Self {
        StoreError::Write {
            table,
            action,
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Permission denied: requires permission to {0}")]
    PermissionDenied(Permission),

    #[error("Invalid input: {0}")]
    Invalid(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

//! Persistence abstractions: the query contract every backend implements and
//! the typed record boundary on top of it.

use crate::core::error::StoreError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::Display;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Recoveries,
    Retainers,
    RetainerPayments,
    Expenses,
    Goals,
    Profiles,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Recoveries,
        Table::Retainers,
        Table::RetainerPayments,
        Table::Expenses,
        Table::Goals,
        Table::Profiles,
    ];

    /// Name of the table on the hosted service.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Recoveries => "financial_recoveries",
            Table::Retainers => "financial_retainers",
            Table::RetainerPayments => "financial_retainer_payments",
            Table::Expenses => "financial_expenses",
            Table::Goals => "goals",
            Table::Profiles => "profiles",
        }
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    IsNull(String),
    Gte(String, Value),
    Lt(String, Value),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::IsNull(c) | Filter::Gte(c, _) | Filter::Lt(c, _) => c,
        }
    }

    pub fn matches(&self, row: &Value) -> bool {
        let field = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Filter::IsNull(_) => field.is_null(),
            Filter::Eq(_, value) => {
                !field.is_null() && compare_values(field, value) == Ordering::Equal
            }
            Filter::Gte(_, value) => {
                !field.is_null() && compare_values(field, value) != Ordering::Less
            }
            Filter::Lt(_, value) => {
                !field.is_null() && compare_values(field, value) == Ordering::Less
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filters, sorts and truncates rows held locally. Sorting is stable so
    /// rows with equal keys keep their stored order.
    pub fn apply(&self, rows: impl IntoIterator<Item = Value>) -> Vec<Value> {
        let mut rows: Vec<Value> = rows
            .into_iter()
            .filter(|row| self.filters.iter().all(|f| f.matches(row)))
            .collect();

        if let Some(order) = &self.order {
            rows.sort_by(|a, b| {
                let a = a.get(&order.column).unwrap_or(&Value::Null);
                let b = b.get(&order.column).unwrap_or(&Value::Null);
                let ord = compare_values(a, b);
                if order.ascending { ord } else { ord.reverse() }
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }
}

/// Orders JSON scalars the way the hosted service orders columns. Nulls sort
/// after every other value.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (a, b) => a.to_string().cmp(&b.to_string()),
    }
}

/// Shallow-merges `patch` into `row`; only object patches have an effect.
pub fn merge_patch(row: &mut Value, patch: &Value) {
    if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            row.insert(key.clone(), value.clone());
        }
    }
}

/// The persistence service every component reads from and writes to.
///
/// Each call is an independent request: there are no transactions spanning
/// several calls, no retries and no caching.
#[async_trait]
pub trait Store: Send + Sync {
    async fn fetch(&self, table: Table, query: &Query) -> Result<Vec<Value>, StoreError>;

    /// Inserts a row and returns it as stored, with `id` and `created_at`
    /// filled in when the caller left them out.
    async fn insert(&self, table: Table, record: Value) -> Result<Value, StoreError>;

    async fn update(&self, table: Table, id: &str, patch: Value) -> Result<Value, StoreError>;

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError>;

    /// Applies `patch` to the first row matching every filter in `key`, or
    /// inserts `record` when none matches.
    async fn upsert(
        &self,
        table: Table,
        key: &[Filter],
        patch: Value,
        record: Value,
    ) -> Result<Value, StoreError>;
}

/// A typed row of one of the store tables.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const TABLE: Table;

    fn id(&self) -> &str;
}

pub fn decode<R: Record>(row: Value) -> Result<R, StoreError> {
    serde_json::from_value(row).map_err(|source| StoreError::Decode {
        table: R::TABLE,
        source,
    })
}

pub fn encode<R: Record>(record: &R) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|source| StoreError::Decode {
        table: R::TABLE,
        source,
    })
}

/// Fetches and decodes rows. A single malformed row fails the whole fetch.
pub async fn fetch_records<R: Record>(store: &dyn Store, query: &Query) -> Result<Vec<R>, StoreError> {
    let rows = store.fetch(R::TABLE, query).await?;
    debug!("Fetched {} rows from {}", rows.len(), R::TABLE);
    rows.into_iter().map(decode::<R>).collect()
}

pub async fn fetch_record<R: Record>(store: &dyn Store, id: &str) -> Result<R, StoreError> {
    let rows = store
        .fetch(R::TABLE, &Query::new().eq("id", id).limit(1))
        .await?;
    match rows.into_iter().next() {
        Some(row) => decode(row),
        None => Err(StoreError::NotFound {
            table: R::TABLE,
            id: id.to_string(),
        }),
    }
}

pub async fn insert_record<R: Record>(store: &dyn Store, record: &R) -> Result<R, StoreError> {
    let row = store.insert(R::TABLE, encode(record)?).await?;
    decode(row)
}

pub async fn update_record<R: Record>(
    store: &dyn Store,
    id: &str,
    patch: Value,
) -> Result<R, StoreError> {
    let row = store.update(R::TABLE, id, patch).await?;
    decode(row)
}

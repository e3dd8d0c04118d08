//! Persistence: the `Store` trait and its PostgreSQL and in-memory implementations.
//!
//! Stores speak JSON records keyed by column name. They do not validate; the use-case
//! layer decides what is written.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::catalog::EntityDef;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// One row as a JSON object, keyed by column name.
pub type Record = serde_json::Map<String, Value>;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

#[derive(Clone, Debug, PartialEq)]
pub struct SortOrder {
    pub column: String,
    pub descending: bool,
}

/// List parameters. Column names must exist in the definition; stores skip unknown ones.
#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    /// Exact-match filters, AND-ed.
    pub filters: Vec<(String, Value)>,
    /// Case-insensitive substring matched against the searchable columns.
    pub search: Option<String>,
    /// Ties (and the default) order by id ascending.
    pub sort: Option<SortOrder>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            filters: Vec::new(),
            search: None,
            sort: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Equality match used for uniqueness rules and dependent counts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Criteria {
    pub equals: Vec<(String, Value)>,
    /// Compare text values lower-cased.
    pub ignore_case: bool,
    pub exclude_id: Option<i64>,
}

impl Criteria {
    pub fn column_equals(column: &str, value: Value) -> Self {
        Criteria {
            equals: vec![(column.to_string(), value)],
            ..Criteria::default()
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn fetch(&self, def: &'static EntityDef, id: i64) -> Result<Option<Record>, AppError>;

    async fn list(&self, def: &'static EntityDef, query: &ListQuery) -> Result<Vec<Record>, AppError>;

    /// Insert with a store-generated id; returns the stored row.
    async fn insert(&self, def: &'static EntityDef, fields: &Record) -> Result<Record, AppError>;

    /// Replace the given columns of row `id`. None when the row does not exist.
    async fn update(&self, def: &'static EntityDef, id: i64, fields: &Record) -> Result<Option<Record>, AppError>;

    /// False when the row did not exist.
    async fn delete(&self, def: &'static EntityDef, id: i64) -> Result<bool, AppError>;

    async fn count(&self, def: &'static EntityDef, criteria: &Criteria) -> Result<u64, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

/// Escape LIKE wildcards so user input matches literally.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

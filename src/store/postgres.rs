//! PostgreSQL store: every statement comes from `crate::sql`, values are bound as parameters.

use super::{Criteria, ListQuery, Record, Store};
use crate::catalog::{self, EntityDef, SqlType};
use crate::error::AppError;
use crate::migration::unique_index_name;
use crate::service::DATE_FORMAT;
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgRow};
use sqlx::{ConnectOptions, Row};
use std::str::FromStr;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<PgRow>, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query.fetch_optional(&self.pool).await
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<PgRow>, sqlx::Error> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query.fetch_all(&self.pool).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn fetch(&self, def: &'static EntityDef, id: i64) -> Result<Option<Record>, AppError> {
        let q = sql::select_by_id(def, &self.schema, id);
        let row = self.fetch_optional(&q).await?;
        row.map(|r| row_to_record(def, &r)).transpose()
    }

    async fn list(&self, def: &'static EntityDef, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        let q = sql::select_list(def, &self.schema, query);
        let rows = self.fetch_all(&q).await?;
        rows.iter().map(|r| row_to_record(def, r)).collect()
    }

    async fn insert(&self, def: &'static EntityDef, fields: &Record) -> Result<Record, AppError> {
        let q = sql::insert(def, &self.schema, fields);
        let row = self
            .fetch_optional(&q)
            .await
            .map_err(|e| write_error(def, e))?
            .ok_or_else(|| AppError::Internal(format!("insert into {} returned no row", def.table)))?;
        row_to_record(def, &row)
    }

    async fn update(&self, def: &'static EntityDef, id: i64, fields: &Record) -> Result<Option<Record>, AppError> {
        let q = sql::update(def, &self.schema, id, fields);
        let row = self.fetch_optional(&q).await.map_err(|e| write_error(def, e))?;
        row.map(|r| row_to_record(def, &r)).transpose()
    }

    async fn delete(&self, def: &'static EntityDef, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(def, &self.schema, id);
        match self.fetch_optional(&q).await {
            Ok(row) => Ok(row.is_some()),
            Err(e) if db_code(&e).as_deref() == Some(FOREIGN_KEY_VIOLATION) => Err(AppError::Conflict(format!(
                "{} {} is still referenced by other records",
                def.label, id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn count(&self, def: &'static EntityDef, criteria: &Criteria) -> Result<u64, AppError> {
        let q = sql::count(def, &self.schema, criteria);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let n = query.fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn db_code(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Translate constraint violations raised by INSERT/UPDATE. The service layer checks the
/// same rules first; these cover races between concurrent writers.
fn write_error(def: &'static EntityDef, e: sqlx::Error) -> AppError {
    let (code, constraint) = match &e {
        sqlx::Error::Database(db) => (
            db.code().map(|c| c.into_owned()),
            db.constraint().map(str::to_string),
        ),
        _ => return e.into(),
    };
    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => {
            let message = def
                .unique
                .iter()
                .find(|u| constraint.as_deref() == Some(unique_index_name(def, u).as_str()))
                .map(|u| u.message.to_string())
                .unwrap_or_else(|| format!("duplicate {}", def.label));
            AppError::Conflict(message)
        }
        Some(FOREIGN_KEY_VIOLATION) => {
            let column = constraint
                .as_deref()
                .and_then(|c| c.strip_prefix(def.table))
                .and_then(|c| c.strip_prefix('_'))
                .and_then(|c| c.strip_suffix("_fkey"));
            match column.and_then(|c| def.references.iter().find(|r| r.column == c)) {
                Some(r) => AppError::Reference {
                    field: r.column.to_string(),
                    target: catalog::def(r.target).label,
                },
                None => e.into(),
            }
        }
        Some(CHECK_VIOLATION) => AppError::BadRequest(format!(
            "{} violates constraint {}",
            def.label,
            constraint.unwrap_or_default()
        )),
        _ => e.into(),
    }
}

/// Decode a row by the declared column types.
fn row_to_record(def: &EntityDef, row: &PgRow) -> Result<Record, AppError> {
    let mut out = Record::new();
    for name in def.column_names() {
        let ty = def.sql_type(name).unwrap_or(SqlType::Text);
        let v = match ty {
            SqlType::BigInt => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
            SqlType::Text => row.try_get::<Option<String>, _>(name)?.map(Value::String),
            SqlType::Bool => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
            SqlType::Date => row
                .try_get::<Option<chrono::NaiveDate>, _>(name)?
                .map(|d| Value::String(d.format(DATE_FORMAT).to_string())),
            SqlType::Tags => row.try_get::<Option<Value>, _>(name)?,
        };
        out.insert(name.to_string(), v.unwrap_or(Value::Null));
    }
    Ok(out)
}

/// Create the target database when missing by connecting to the `postgres` maintenance
/// database on the same server.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin, db_name) = maintenance_target(database_url)?;
    let Some(db_name) = db_name.filter(|name| name != "postgres") else {
        return Ok(());
    };
    let mut conn: sqlx::PgConnection = admin.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Options for the maintenance database on the same server, and the database the URL names.
fn maintenance_target(database_url: &str) -> Result<(PgConnectOptions, Option<String>), AppError> {
    let opts = PgConnectOptions::from_str(database_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let name = opts.get_database().map(str::to_string).filter(|n| !n.is_empty());
    Ok((opts.database("postgres"), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_comes_from_the_path() {
        let (admin, name) = maintenance_target("postgres://u:p@db:5432/innohub?sslmode=disable").unwrap();
        assert_eq!(name.as_deref(), Some("innohub"));
        assert_eq!(admin.get_database(), Some("postgres"));
        assert_eq!(admin.get_host(), "db");
        assert_eq!(admin.get_port(), 5432);
        assert_eq!(admin.get_username(), "u");
    }

    #[test]
    fn slashes_in_the_query_do_not_move_the_database_name() {
        let (admin, name) = maintenance_target("postgres://u:p@host/innohub?options=-c%20x/y").unwrap();
        assert_eq!(name.as_deref(), Some("innohub"));
        assert_eq!(admin.get_host(), "host");
        assert_eq!(admin.get_database(), Some("postgres"));
    }

    #[test]
    fn url_without_a_database_keeps_the_host() {
        let (admin, name) = maintenance_target("postgres://localhost:5432").unwrap();
        assert_eq!(name, None);
        assert_eq!(admin.get_host(), "localhost");
        assert_eq!(admin.get_port(), 5432);
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(maintenance_target("innohub").is_err());
    }
}

//! Apply the catalog to the database: schema, tables, foreign keys and indexes.
//! Tables are created parent-first; every statement is idempotent.

use crate::catalog::{self, validate_catalog, ColumnDef, EntityDef, SqlType, UniqueRule, CATALOG, ID_COLUMN};
use crate::error::AppError;
use crate::sql::{qualified_table, quoted};
use sqlx::PgPool;

/// Create the schema and every catalog table that does not exist yet.
pub async fn apply_migrations(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    validate_catalog()?;

    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
        .execute(pool)
        .await?;

    for def in CATALOG {
        let ddl = create_table_sql(def, schema);
        tracing::debug!(sql = %ddl, "migration");
        sqlx::query(&ddl).execute(pool).await?;
        for sql in index_sql(def, schema) {
            tracing::debug!(sql = %sql, "migration");
            sqlx::query(&sql).execute(pool).await?;
        }
    }
    tracing::info!(schema = %schema, tables = CATALOG.len(), "migrations applied");
    Ok(())
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn column_ddl(def: &EntityDef, schema: &str, c: &ColumnDef) -> String {
    let mut out = format!("{} {}", quoted(c.name), c.sql_type.ddl());
    match c.sql_type {
        SqlType::Tags => out.push_str(" NOT NULL DEFAULT '[]'::jsonb"),
        SqlType::Bool => out.push_str(" NOT NULL DEFAULT FALSE"),
        _ if c.rule.required => out.push_str(" NOT NULL"),
        _ => {}
    }
    if let Some(allowed) = c.rule.allowed {
        let labels: Vec<String> = allowed.iter().map(|l| literal(l)).collect();
        out.push_str(&format!(" CHECK ({} IN ({}))", quoted(c.name), labels.join(", ")));
    }
    if let Some(r) = def.references.iter().find(|r| r.column == c.name) {
        out.push_str(&format!(
            " REFERENCES {} ({}) ON DELETE RESTRICT",
            qualified_table(schema, catalog::def(r.target).table),
            quoted(ID_COLUMN)
        ));
    }
    out
}

/// CREATE TABLE for one definition. Inline constraints keep PostgreSQL's default names
/// (`{table}_{column}_fkey`), which the store relies on to report the offending field.
pub fn create_table_sql(def: &EntityDef, schema: &str) -> String {
    let mut cols = vec![format!("{} BIGSERIAL PRIMARY KEY", quoted(ID_COLUMN))];
    cols.extend(def.columns.iter().map(|c| column_ddl(def, schema, c)));
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        qualified_table(schema, def.table),
        cols.join(",\n    ")
    )
}

pub fn unique_index_name(def: &EntityDef, rule: &UniqueRule) -> String {
    format!("{}_{}_key", def.table, rule.columns.join("_"))
}

/// Indexes on reference columns plus one unique index per rule.
pub fn index_sql(def: &EntityDef, schema: &str) -> Vec<String> {
    let table = qualified_table(schema, def.table);
    let mut out: Vec<String> = def
        .references
        .iter()
        .map(|r| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(&format!("{}_{}_idx", def.table, r.column)),
                table,
                quoted(r.column)
            )
        })
        .collect();
    for rule in def.unique {
        let keys: Vec<String> = rule
            .columns
            .iter()
            .map(|col| match def.sql_type(col) {
                Some(SqlType::Text) if rule.ignore_case => format!("lower({})", quoted(col)),
                _ => quoted(col),
            })
            .collect();
        out.push(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            quoted(&unique_index_name(def, rule)),
            table,
            keys.join(", ")
        ));
    }
    out
}

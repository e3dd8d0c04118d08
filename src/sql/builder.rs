//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from catalog definitions.

use crate::catalog::{EntityDef, SqlType, ID_COLUMN};
use crate::store::{like_pattern, Criteria, ListQuery, Record};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from the catalog or validated settings).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Bind a value and return its placeholder, cast to the column type when needed.
    fn push_param(&mut self, v: Value, ty: SqlType) -> String {
        self.params.push(v);
        let n = self.params.len();
        match ty.cast() {
            Some(cast) => format!("${}::{}", n, cast),
            None => format!("${}", n),
        }
    }
}

fn select_column_list(def: &EntityDef) -> String {
    def.column_names().map(quoted).collect::<Vec<_>>().join(", ")
}

/// Equality on one column; text compares lower-cased when `ignore_case`.
fn equals_clause(q: &mut QueryBuf, column: &str, ty: SqlType, value: &Value, ignore_case: bool) -> String {
    if value.is_null() {
        return format!("{} IS NULL", quoted(column));
    }
    let ph = q.push_param(value.clone(), ty);
    if ignore_case && ty == SqlType::Text {
        format!("lower({}) = lower({})", quoted(column), ph)
    } else {
        format!("{} = {}", quoted(column), ph)
    }
}

fn where_clause(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT by primary key.
pub fn select_by_id(def: &EntityDef, schema: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(Value::from(id), SqlType::BigInt);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(def),
        qualified_table(schema, def.table),
        quoted(ID_COLUMN),
        ph
    );
    q
}

/// SELECT list: exact-match filters, ILIKE search over searchable columns, ORDER BY the
/// sort column then id, LIMIT/OFFSET. Columns unknown to the definition are skipped.
pub fn select_list(def: &EntityDef, schema: &str, query: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();

    for (col, val) in &query.filters {
        if let Some(ty) = def.sql_type(col) {
            where_parts.push(equals_clause(&mut q, col, ty, val, false));
        }
    }

    if let Some(term) = query.search.as_deref().filter(|t| !t.is_empty()) {
        let searchable: Vec<_> = def.searchable().collect();
        if !searchable.is_empty() {
            let ph = q.push_param(Value::String(like_pattern(term)), SqlType::Text);
            let ors: Vec<String> = searchable
                .iter()
                .map(|c| format!("{} ILIKE {}", quoted(c.name), ph))
                .collect();
            where_parts.push(format!("({})", ors.join(" OR ")));
        }
    }

    let mut order = Vec::new();
    if let Some(sort) = query.sort.as_ref().filter(|s| def.has_column(&s.column)) {
        let dir = if sort.descending { "DESC" } else { "ASC" };
        order.push(format!("{} {}", quoted(&sort.column), dir));
    }
    if order.is_empty() || query.sort.as_ref().map(|s| s.column != ID_COLUMN).unwrap_or(false) {
        order.push(format!("{} ASC", quoted(ID_COLUMN)));
    }

    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(def),
        qualified_table(schema, def.table),
        where_clause(&where_parts),
        order.join(", "),
        query.limit,
        query.offset
    );
    q
}

/// SELECT COUNT(*) for uniqueness and dependent checks.
pub fn count(def: &EntityDef, schema: &str, criteria: &Criteria) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (col, val) in &criteria.equals {
        if let Some(ty) = def.sql_type(col) {
            where_parts.push(equals_clause(&mut q, col, ty, val, criteria.ignore_case));
        }
    }
    if let Some(id) = criteria.exclude_id {
        let ph = q.push_param(Value::from(id), SqlType::BigInt);
        where_parts.push(format!("{} <> {}", quoted(ID_COLUMN), ph));
    }
    q.sql = format!(
        "SELECT COUNT(*) FROM {}{}",
        qualified_table(schema, def.table),
        where_clause(&where_parts)
    );
    q
}

/// INSERT every declared column (missing ones as NULL); the id comes from the sequence.
pub fn insert(def: &EntityDef, schema: &str, fields: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(def.columns.len());
    let mut placeholders = Vec::with_capacity(def.columns.len());
    for c in def.columns {
        let val = fields.get(c.name).cloned().unwrap_or(Value::Null);
        placeholders.push(q.push_param(val, c.sql_type));
        cols.push(quoted(c.name));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        qualified_table(schema, def.table),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(def)
    );
    q
}

/// UPDATE by id: SET only declared columns present in `fields`. With nothing to set this
/// degrades to a SELECT so callers still get the current row back.
pub fn update(def: &EntityDef, schema: &str, id: i64, fields: &Record) -> QueryBuf {
    let mut sets = Vec::new();
    let mut q = QueryBuf::new();
    for c in def.columns {
        if let Some(v) = fields.get(c.name) {
            let ph = q.push_param(v.clone(), c.sql_type);
            sets.push(format!("{} = {}", quoted(c.name), ph));
        }
    }
    if sets.is_empty() {
        return select_by_id(def, schema, id);
    }
    let id_ph = q.push_param(Value::from(id), SqlType::BigInt);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(schema, def.table),
        sets.join(", "),
        quoted(ID_COLUMN),
        id_ph,
        select_column_list(def)
    );
    q
}

/// DELETE by id.
pub fn delete(def: &EntityDef, schema: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(Value::from(id), SqlType::BigInt);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(schema, def.table),
        quoted(ID_COLUMN),
        ph,
        quoted(ID_COLUMN)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{def, EntityKind};
    use crate::store::SortOrder;
    use serde_json::json;

    #[test]
    fn select_by_id_lists_every_column() {
        let q = select_by_id(def(EntityKind::Program), "hub", 3);
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"name\", \"description\", \"focus_area\", \"national_alignment\", \"phase\" \
             FROM \"hub\".\"programs\" WHERE \"id\" = $1::bigint"
        );
        assert_eq!(q.params, vec![json!(3)]);
    }

    #[test]
    fn insert_binds_missing_columns_as_null_with_casts() {
        let mut fields = Record::new();
        fields.insert("program_id".into(), json!(1));
        fields.insert("name".into(), json!("Solar dryer"));
        fields.insert("stage".into(), json!("ideation"));
        fields.insert("start_date".into(), json!("2024-01-15"));
        let q = insert(def(EntityKind::Project), "hub", &fields);
        assert!(q.sql.starts_with("INSERT INTO \"hub\".\"projects\" (\"program_id\", \"facility_id\", \"name\""));
        assert!(q.sql.contains("VALUES ($1::bigint, $2::bigint, $3, $4, $5, $6::jsonb, $7, $8::date, $9::date)"));
        assert_eq!(q.params.len(), 9);
        assert_eq!(q.params[1], Value::Null);
        assert_eq!(q.params[7], json!("2024-01-15"));
    }

    #[test]
    fn update_sets_only_given_columns() {
        let mut fields = Record::new();
        fields.insert("status".into(), json!("maintenance"));
        fields.insert("not_a_column".into(), json!("x"));
        let q = update(def(EntityKind::Equipment), "hub", 9, &fields);
        assert!(q.sql.starts_with("UPDATE \"hub\".\"equipment\" SET \"status\" = $1 WHERE \"id\" = $2::bigint RETURNING"));
        assert_eq!(q.params, vec![json!("maintenance"), json!(9)]);
    }

    #[test]
    fn empty_update_reads_the_row() {
        let q = update(def(EntityKind::Equipment), "hub", 9, &Record::new());
        assert!(q.sql.starts_with("SELECT"));
        assert_eq!(q.params, vec![json!(9)]);
    }

    #[test]
    fn list_combines_filters_search_and_sort() {
        let query = ListQuery {
            filters: vec![("phase".into(), json!("active")), ("bogus".into(), json!(1))],
            search: Some("agri".into()),
            sort: Some(SortOrder { column: "name".into(), descending: true }),
            limit: 10,
            offset: 20,
        };
        let q = select_list(def(EntityKind::Program), "hub", &query);
        assert!(q.sql.contains(
            "WHERE \"phase\" = $1 AND (\"name\" ILIKE $2 OR \"description\" ILIKE $2 OR \"focus_area\" ILIKE $2)"
        ));
        assert!(q.sql.ends_with("ORDER BY \"name\" DESC, \"id\" ASC LIMIT 10 OFFSET 20"));
        assert_eq!(q.params, vec![json!("active"), json!("%agri%")]);
    }

    #[test]
    fn count_excludes_own_id_and_ignores_case() {
        let criteria = Criteria {
            equals: vec![("program_id".into(), json!(2)), ("name".into(), json!("Drone"))],
            ignore_case: true,
            exclude_id: Some(5),
        };
        let q = count(def(EntityKind::Project), "hub", &criteria);
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) FROM \"hub\".\"projects\" WHERE \"program_id\" = $1::bigint \
             AND lower(\"name\") = lower($2) AND \"id\" <> $3::bigint"
        );
    }

    #[test]
    fn delete_returns_id() {
        let q = delete(def(EntityKind::Outcome), "hub", 4);
        assert_eq!(q.sql, "DELETE FROM \"hub\".\"outcomes\" WHERE \"id\" = $1::bigint RETURNING \"id\"");
    }
}

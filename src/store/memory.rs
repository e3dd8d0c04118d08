//! In-process store with the same observable behavior as `PgStore`: sequential ids,
//! unique rules, reference checks and restricted deletes. Used for tests and
//! `INNOHUB_STORE=memory`.

use super::{Criteria, ListQuery, Record, Store};
use crate::catalog::{self, EntityDef, EntityKind, UniqueRule, ID_COLUMN};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Record>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<EntityKind, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<EntityKind, Table>>, AppError> {
        self.tables
            .read()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<EntityKind, Table>>, AppError> {
        self.tables
            .write()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }
}

fn rows_of(tables: &HashMap<EntityKind, Table>, kind: EntityKind) -> impl Iterator<Item = &Record> {
    tables.get(&kind).into_iter().flat_map(|t| t.rows.values())
}

fn values_equal(a: &Value, b: &Value, ignore_case: bool) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) if ignore_case => x.to_lowercase() == y.to_lowercase(),
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn matches_criteria(row: &Record, criteria: &Criteria) -> bool {
    let excluded = criteria
        .exclude_id
        .map(|id| row.get(ID_COLUMN).and_then(Value::as_i64) == Some(id))
        .unwrap_or(false);
    !excluded
        && criteria.equals.iter().all(|(col, want)| {
            let have = row.get(col).unwrap_or(&Value::Null);
            if want.is_null() {
                have.is_null()
            } else {
                values_equal(have, want, criteria.ignore_case)
            }
        })
}

/// Ascending order with NULLs last, matching PostgreSQL's default.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn unique_conflict(
    tables: &HashMap<EntityKind, Table>,
    def: &EntityDef,
    rule: &UniqueRule,
    row: &Record,
    own_id: Option<i64>,
) -> bool {
    let mut criteria = Criteria {
        ignore_case: rule.ignore_case,
        exclude_id: own_id,
        ..Criteria::default()
    };
    for col in rule.columns {
        match row.get(*col) {
            Some(v) if !v.is_null() => criteria.equals.push((col.to_string(), v.clone())),
            _ => return false,
        }
    }
    rows_of(tables, def.kind).any(|r| matches_criteria(r, &criteria))
}

/// Enforce what the database enforces through foreign keys and unique indexes.
fn check_constraints(
    tables: &HashMap<EntityKind, Table>,
    def: &'static EntityDef,
    row: &Record,
    own_id: Option<i64>,
) -> Result<(), AppError> {
    for r in def.references {
        let Some(target_id) = row.get(r.column).filter(|v| !v.is_null()) else {
            continue;
        };
        let exists = target_id
            .as_i64()
            .map(|id| tables.get(&r.target).map(|t| t.rows.contains_key(&id)).unwrap_or(false))
            .unwrap_or(false);
        if !exists {
            return Err(AppError::Reference {
                field: r.column.to_string(),
                target: catalog::def(r.target).label,
            });
        }
    }
    for rule in def.unique {
        if unique_conflict(tables, def, rule, row, own_id) {
            return Err(AppError::Conflict(rule.message.to_string()));
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch(&self, def: &'static EntityDef, id: i64) -> Result<Option<Record>, AppError> {
        let tables = self.read()?;
        Ok(tables.get(&def.kind).and_then(|t| t.rows.get(&id)).cloned())
    }

    async fn list(&self, def: &'static EntityDef, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        let tables = self.read()?;
        let filters = Criteria {
            equals: query
                .filters
                .iter()
                .filter(|(col, _)| def.has_column(col))
                .cloned()
                .collect(),
            ..Criteria::default()
        };
        let needle = query
            .search
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        let mut rows: Vec<Record> = rows_of(&tables, def.kind)
            .filter(|r| matches_criteria(r, &filters))
            .filter(|r| match &needle {
                None => true,
                Some(n) => def.searchable().any(|c| {
                    r.get(c.name)
                        .and_then(Value::as_str)
                        .map(|s| s.to_lowercase().contains(n.as_str()))
                        .unwrap_or(false)
                }),
            })
            .cloned()
            .collect();

        // BTreeMap iteration already yields id order; a stable sort keeps it for ties.
        if let Some(sort) = query.sort.as_ref().filter(|s| def.has_column(&s.column)) {
            rows.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(&sort.column).unwrap_or(&Value::Null),
                    b.get(&sort.column).unwrap_or(&Value::Null),
                );
                if sort.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        Ok(rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn insert(&self, def: &'static EntityDef, fields: &Record) -> Result<Record, AppError> {
        let mut tables = self.write()?;
        let mut row = Record::new();
        for c in def.columns {
            row.insert(c.name.to_string(), fields.get(c.name).cloned().unwrap_or(Value::Null));
        }
        check_constraints(&tables, def, &row, None)?;

        let table = tables.entry(def.kind).or_default();
        table.next_id += 1;
        let id = table.next_id;
        let mut stored = Record::new();
        stored.insert(ID_COLUMN.to_string(), Value::from(id));
        stored.extend(row);
        table.rows.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, def: &'static EntityDef, id: i64, fields: &Record) -> Result<Option<Record>, AppError> {
        let mut tables = self.write()?;
        let Some(mut row) = tables.get(&def.kind).and_then(|t| t.rows.get(&id)).cloned() else {
            return Ok(None);
        };
        for c in def.columns {
            if let Some(v) = fields.get(c.name) {
                row.insert(c.name.to_string(), v.clone());
            }
        }
        check_constraints(&tables, def, &row, Some(id))?;
        tables.entry(def.kind).or_default().rows.insert(id, row.clone());
        Ok(Some(row))
    }

    async fn delete(&self, def: &'static EntityDef, id: i64) -> Result<bool, AppError> {
        let mut tables = self.write()?;
        if !tables.get(&def.kind).map(|t| t.rows.contains_key(&id)).unwrap_or(false) {
            return Ok(false);
        }
        for (dependent, reference) in catalog::dependents_of(def.kind) {
            let referenced = rows_of(&tables, dependent.kind)
                .any(|r| r.get(reference.column).and_then(Value::as_i64) == Some(id));
            if referenced {
                return Err(AppError::Conflict(format!(
                    "{} {} is still referenced by other records",
                    def.label, id
                )));
            }
        }
        Ok(tables
            .get_mut(&def.kind)
            .map(|t| t.rows.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn count(&self, def: &'static EntityDef, criteria: &Criteria) -> Result<u64, AppError> {
        let tables = self.read()?;
        Ok(rows_of(&tables, def.kind)
            .filter(|r| matches_criteria(r, criteria))
            .count() as u64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::def;
    use crate::store::SortOrder;
    use crate::test_support::body as record;
    use serde_json::json;

    async fn seed_program(store: &MemoryStore, name: &str, phase: &str) -> i64 {
        let row = store
            .insert(def(EntityKind::Program), &record(json!({"name": name, "phase": phase})))
            .await
            .unwrap();
        row["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn ids_are_sequential_and_never_reused() {
        let store = MemoryStore::new();
        let programs = def(EntityKind::Program);
        assert_eq!(seed_program(&store, "AgriTech", "planning").await, 1);
        assert_eq!(seed_program(&store, "HealthTech", "active").await, 2);
        assert!(store.delete(programs, 2).await.unwrap());
        assert_eq!(seed_program(&store, "EdTech", "active").await, 3);
        assert!(!store.delete(programs, 2).await.unwrap());
    }

    #[tokio::test]
    async fn insert_fills_every_declared_column() {
        let store = MemoryStore::new();
        seed_program(&store, "AgriTech", "planning").await;
        let row = store.fetch(def(EntityKind::Program), 1).await.unwrap().unwrap();
        assert_eq!(row["focus_area"], Value::Null);
        assert_eq!(row.len(), 6);
    }

    #[tokio::test]
    async fn unknown_parent_is_a_reference_error() {
        let store = MemoryStore::new();
        let err = store
            .insert(
                def(EntityKind::Project),
                &record(json!({"program_id": 42, "name": "Dryer", "stage": "ideation"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Reference { ref field, target: "program" } if field == "program_id"));
    }

    #[tokio::test]
    async fn unique_rule_ignores_case_and_own_row() {
        let store = MemoryStore::new();
        let programs = def(EntityKind::Program);
        seed_program(&store, "AgriTech", "planning").await;
        let err = store
            .insert(programs, &record(json!({"name": "agritech", "phase": "active"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let updated = store
            .update(programs, 1, &record(json!({"name": "AGRITECH"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], "AGRITECH");
    }

    #[tokio::test]
    async fn referenced_rows_cannot_be_deleted() {
        let store = MemoryStore::new();
        let id = seed_program(&store, "AgriTech", "planning").await;
        store
            .insert(
                def(EntityKind::Project),
                &record(json!({"program_id": id, "name": "Dryer", "stage": "ideation"})),
            )
            .await
            .unwrap();
        let err = store.delete(def(EntityKind::Program), id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_filters_searches_sorts_and_pages() {
        let store = MemoryStore::new();
        let programs = def(EntityKind::Program);
        seed_program(&store, "AgriTech", "active").await;
        seed_program(&store, "HealthTech", "planning").await;
        seed_program(&store, "Agri 50%", "active").await;

        let active = ListQuery {
            filters: vec![("phase".into(), json!("active"))],
            sort: Some(SortOrder { column: "name".into(), descending: true }),
            ..ListQuery::default()
        };
        let names: Vec<_> = store
            .list(programs, &active)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r["name"].clone())
            .collect();
        assert_eq!(names, [json!("AgriTech"), json!("Agri 50%")]);

        let search = ListQuery {
            search: Some("TECH".into()),
            limit: 1,
            offset: 1,
            ..ListQuery::default()
        };
        let page = store.list(programs, &search).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["name"], "HealthTech");
    }

    #[tokio::test]
    async fn count_matches_criteria() {
        let store = MemoryStore::new();
        seed_program(&store, "AgriTech", "active").await;
        seed_program(&store, "HealthTech", "active").await;
        let programs = def(EntityKind::Program);
        let criteria = Criteria::column_equals("phase", json!("active"));
        assert_eq!(store.count(programs, &criteria).await.unwrap(), 2);
        let criteria = Criteria {
            exclude_id: Some(1),
            ..criteria
        };
        assert_eq!(store.count(programs, &criteria).await.unwrap(), 1);
    }
}

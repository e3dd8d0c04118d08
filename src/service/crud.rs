//! CrudService: the use cases behind every entity route.
//!
//! Each write runs the same pipeline: keep catalog columns, coerce and check field rules,
//! decode into the typed entity, run its cross-field rules, resolve references, match
//! requirements against the parent's capabilities, enforce uniqueness, then make exactly
//! one store call.

use super::RequestValidator;
use crate::catalog::{self, EntityDef, ID_COLUMN};
use crate::domain::{Entity, Tags};
use crate::error::{AppError, FieldErrors};
use crate::store::{Criteria, ListQuery, Record, Store};
use serde_json::Value;

pub struct CrudService<'a> {
    store: &'a dyn Store,
}

impl<'a> CrudService<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        CrudService { store }
    }

    pub async fn list<E: Entity>(&self, query: &ListQuery) -> Result<Vec<E>, AppError> {
        let rows = self.store.list(E::def(), query).await?;
        rows.into_iter().map(decode).collect()
    }

    pub async fn get<E: Entity>(&self, id: i64) -> Result<E, AppError> {
        let row = self.fetch_row(E::def(), id).await?;
        decode(row)
    }

    pub async fn create<E: Entity>(&self, body: Record) -> Result<E, AppError> {
        let def = E::def();
        let mut record = RequestValidator::retain_columns(def, body);
        self.prepare::<E>(&mut record, None).await?;
        let row = self.store.insert(def, &record).await?;
        let created: E = decode(row)?;
        tracing::info!(entity = def.label, id = created.id(), "created");
        Ok(created)
    }

    /// Fields in `body` replace the stored ones; the merged record is validated as a whole.
    pub async fn update<E: Entity>(&self, id: i64, body: Record) -> Result<E, AppError> {
        let def = E::def();
        let mut record = self.fetch_row(def, id).await?;
        record.remove(ID_COLUMN);
        record.extend(RequestValidator::retain_columns(def, body));
        self.prepare::<E>(&mut record, Some(id)).await?;
        self.check_populated(def, id, &record).await?;
        let row = self
            .store
            .update(def, id, &record)
            .await?
            .ok_or_else(|| not_found(def, id))?;
        tracing::info!(entity = def.label, id, "updated");
        decode(row)
    }

    /// Rejected while other records still reference this one.
    pub async fn delete<E: Entity>(&self, id: i64) -> Result<(), AppError> {
        let def = E::def();
        self.fetch_row(def, id).await?;

        let mut blocking = Vec::new();
        for (dependent, reference) in catalog::dependents_of(def.kind) {
            let n = self
                .store
                .count(dependent, &Criteria::column_equals(reference.column, Value::from(id)))
                .await?;
            if n > 0 {
                blocking.push(format!("{} {}", n, dependent.table));
            }
        }
        if !blocking.is_empty() {
            tracing::warn!(entity = def.label, id, blocking = ?blocking, "delete blocked");
            return Err(AppError::Conflict(format!(
                "{} {} is referenced by {}",
                def.label,
                id,
                blocking.join(", ")
            )));
        }

        if !self.store.delete(def, id).await? {
            return Err(not_found(def, id));
        }
        tracing::info!(entity = def.label, id, "deleted");
        Ok(())
    }

    async fn fetch_row(&self, def: &'static EntityDef, id: i64) -> Result<Record, AppError> {
        self.store.fetch(def, id).await?.ok_or_else(|| not_found(def, id))
    }

    /// Field rules, cross-field rules, references and uniqueness. `own_id` is excluded from
    /// uniqueness checks on update.
    async fn prepare<E: Entity>(&self, record: &mut Record, own_id: Option<i64>) -> Result<(), AppError> {
        let def = E::def();
        RequestValidator::validate(def, record).into_result()?;

        let entity: E = serde_json::from_value(Value::Object(record.clone()))
            .map_err(|e| AppError::Validation(FieldErrors::single("body", e.to_string())))?;
        entity.check().into_result()?;

        let mut parents = Vec::new();
        for r in def.references {
            let Some(target_id) = record.get(r.column).and_then(Value::as_i64) else {
                continue;
            };
            let target = catalog::def(r.target);
            match self.store.fetch(target, target_id).await? {
                Some(parent) => parents.push((r.column, parent)),
                None => {
                    return Err(AppError::Reference {
                        field: r.column.to_string(),
                        target: target.label,
                    })
                }
            }
        }
        check_capabilities(def, record, &parents).into_result()?;

        for rule in def.unique {
            let mut criteria = Criteria {
                ignore_case: rule.ignore_case,
                exclude_id: own_id,
                ..Criteria::default()
            };
            let complete = rule.columns.iter().all(|col| match record.get(*col) {
                Some(v) if !v.is_null() => {
                    criteria.equals.push((col.to_string(), v.clone()));
                    true
                }
                _ => false,
            });
            if complete && self.store.count(def, &criteria).await? > 0 {
                return Err(AppError::Conflict(rule.message.to_string()));
            }
        }
        Ok(())
    }

    async fn check_populated(&self, def: &'static EntityDef, id: i64, record: &Record) -> Result<(), AppError> {
        let Some(rule) = def.populated_while else {
            return Ok(());
        };
        let empty = record
            .get(rule.column)
            .and_then(Value::as_array)
            .map(|a| a.is_empty())
            .unwrap_or(true);
        if !empty {
            return Ok(());
        }
        for kind in rule.dependents {
            let dependent = catalog::def(*kind);
            for r in dependent.references.iter().filter(|r| r.target == def.kind) {
                let n = self
                    .store
                    .count(dependent, &Criteria::column_equals(r.column, Value::from(id)))
                    .await?;
                if n > 0 {
                    return Err(AppError::Validation(FieldErrors::single(
                        rule.column,
                        format!("cannot be empty while {} {} exist", n, dependent.table),
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Requirement entries the referenced parent does not list among its capabilities are
/// reported on their own column.
fn check_capabilities(def: &EntityDef, record: &Record, parents: &[(&str, Record)]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let Some(rule) = def.capability_match else {
        return errors;
    };
    let Some((_, parent)) = parents.iter().find(|(column, _)| *column == rule.reference) else {
        return errors;
    };
    let parent_label = def
        .references
        .iter()
        .find(|r| r.column == rule.reference)
        .map(|r| catalog::def(r.target).label)
        .unwrap_or("parent");
    let offered = tags_of(parent.get(rule.capabilities));
    for col in rule.requirements {
        let required = tags_of(record.get(*col));
        let missing: Vec<&str> = required
            .as_slice()
            .iter()
            .map(String::as_str)
            .filter(|t| !offered.contains(t))
            .collect();
        if !missing.is_empty() {
            errors.add(
                col,
                format!("not offered by {} {}: {}", parent_label, rule.capabilities, missing.join(", ")),
            );
        }
    }
    errors
}

/// Tag list from a JSON array or a comma-separated string.
fn tags_of(value: Option<&Value>) -> Tags {
    value
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn not_found(def: &EntityDef, id: i64) -> AppError {
    AppError::NotFound(format!("{} {}", def.label, id))
}

fn decode<E: Entity>(row: Record) -> Result<E, AppError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| AppError::Internal(format!("stored {} does not decode: {}", E::def().label, e)))
}

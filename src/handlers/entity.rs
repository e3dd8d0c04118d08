//! Entity CRUD handlers: list, create, read, update, delete. Generic over the entity type;
//! routes instantiate one set per catalog entry.

use crate::catalog::{EntityDef, SqlType};
use crate::domain::Entity;
use crate::error::AppError;
use crate::response::{success_many, success_one};
use crate::service::CrudService;
use crate::state::AppState;
use crate::store::{ListQuery, Record, SortOrder, DEFAULT_LIMIT, MAX_LIMIT};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

const RESERVED_PARAMS: &[&str] = &["q", "sort", "limit", "offset"];

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

fn body_to_map(body: Result<Json<Value>, JsonRejection>) -> Result<Record, AppError> {
    let Json(value) = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(e.body_text())
        } else {
            AppError::BadRequest(e.body_text())
        }
    })?;
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn query_value_for_column(def: &EntityDef, col: &str, s: &str) -> Result<Value, AppError> {
    let invalid = || AppError::BadRequest(format!("invalid value for filter {}: {}", col, s));
    Ok(match def.sql_type(col) {
        Some(SqlType::BigInt) => Value::from(s.parse::<i64>().map_err(|_| invalid())?),
        Some(SqlType::Bool) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        _ => Value::String(s.to_string()),
    })
}

/// `q` searches, `sort=col` / `sort=-col` orders, `limit` / `offset` page; any other key
/// naming a filterable column is an exact-match filter. Unknown keys are ignored.
pub fn parse_list_query(def: &EntityDef, params: &HashMap<String, String>) -> Result<ListQuery, AppError> {
    let mut query = ListQuery::default();

    if let Some(q) = params.get("q").map(|q| q.trim()).filter(|q| !q.is_empty()) {
        query.search = Some(q.to_string());
    }
    if let Some(sort) = params.get("sort").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let (column, descending) = match sort.strip_prefix('-') {
            Some(c) => (c, true),
            None => (sort, false),
        };
        if !def.has_column(column) {
            return Err(AppError::BadRequest(format!("cannot sort {} by {}", def.table, column)));
        }
        query.sort = Some(SortOrder {
            column: column.to_string(),
            descending,
        });
    }
    if let Some(limit) = params.get("limit") {
        let n: u32 = limit
            .parse()
            .map_err(|_| AppError::BadRequest(format!("invalid limit: {}", limit)))?;
        query.limit = if n == 0 { DEFAULT_LIMIT } else { n.min(MAX_LIMIT) };
    }
    if let Some(offset) = params.get("offset") {
        query.offset = offset
            .parse()
            .map_err(|_| AppError::BadRequest(format!("invalid offset: {}", offset)))?;
    }

    let mut filters: Vec<(String, Value)> = Vec::new();
    for (k, v) in params {
        if RESERVED_PARAMS.contains(&k.as_str()) || !def.is_filterable(k) {
            continue;
        }
        filters.push((k.clone(), query_value_for_column(def, k, v)?));
    }
    filters.sort_by(|a, b| a.0.cmp(&b.0));
    query.filters = filters;
    Ok(query)
}

pub async fn list<E: Entity>(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let query = parse_list_query(E::def(), &params)?;
    let rows: Vec<E> = CrudService::new(state.store.as_ref()).list(&query).await?;
    Ok(success_many(rows, query.limit, query.offset))
}

pub async fn create<E: Entity>(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    let created: E = CrudService::new(state.store.as_ref()).create(body).await?;
    Ok(success_one(StatusCode::CREATED, created))
}

pub async fn read<E: Entity>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let entity: E = CrudService::new(state.store.as_ref()).get(id).await?;
    Ok(success_one(StatusCode::OK, entity))
}

pub async fn update<E: Entity>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    let updated: E = CrudService::new(state.store.as_ref()).update(id, body).await?;
    Ok(success_one(StatusCode::OK, updated))
}

pub async fn delete<E: Entity>(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    CrudService::new(state.store.as_ref()).delete::<E>(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Response envelopes. Single entities are returned bare; lists are wrapped.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

#[derive(Serialize)]
pub struct ListMeta {
    pub count: u64,
    pub limit: u32,
    pub offset: u32,
}

pub fn success_one<T: Serialize>(status: StatusCode, data: T) -> (StatusCode, Json<T>) {
    (status, Json(data))
}

pub fn success_many<T: Serialize>(data: Vec<T>, limit: u32, offset: u32) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: ListMeta { count, limit, offset },
        }),
    )
}

//! Entity CRUD routes: five per catalog entry, all under the entity's path segment.

use crate::domain::{Entity, Equipment, Facility, Outcome, Participant, Program, Project, Service};
use crate::handlers::entity::{create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

/// `/{seg}/`, `/{seg}/create/`, `/{seg}/:id/`, `/{seg}/:id/update/`, `/{seg}/:id/delete/`.
pub fn crud_routes<E: Entity>() -> Router<AppState> {
    let seg = E::def().path_segment;
    Router::new()
        .route(&format!("/{}/", seg), get(list::<E>))
        .route(&format!("/{}/create/", seg), post(create::<E>))
        .route(&format!("/{}/:id/", seg), get(read::<E>))
        .route(&format!("/{}/:id/update/", seg), put(update::<E>).patch(update::<E>))
        .route(&format!("/{}/:id/delete/", seg), delete(delete_handler::<E>))
}

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .merge(crud_routes::<Facility>())
        .merge(crud_routes::<Program>())
        .merge(crud_routes::<Project>())
        .merge(crud_routes::<Equipment>())
        .merge(crud_routes::<Service>())
        .merge(crud_routes::<Participant>())
        .merge(crud_routes::<Outcome>())
        .with_state(state)
}

//! innohub: innovation hub registry. Programs, projects, facilities, equipment, services,
//! participants and outcomes over a JSON REST API backed by PostgreSQL.

pub mod catalog;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::validate_catalog;
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use routes::{app, common_routes, entity_routes};
pub use service::CrudService;
pub use settings::{Settings, StoreKind};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store};

//! Use cases: validation and persistence orchestration per entity.

mod crud;
mod validation;
pub use crud::CrudService;
pub use validation::{RequestValidator, DATE_FORMAT};

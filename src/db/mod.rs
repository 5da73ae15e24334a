//! Data layer for the attendance schema.
//!
//! # Architecture
//!
//! - `error`: Storage-agnostic error types
//! - `models`: Entities, choice sets, dump records and import summaries
//! - `schema`: Table layout driving export and import
//! - `repository`: Trait definitions for data access
//! - `validate`: Format checks applied to dumps before import
//! - `sqlite`: SQLite implementation

mod error;
mod models;
mod repository;
pub mod schema;
pub mod sqlite;
pub mod validate;

#[cfg(test)]
mod validate_test;

pub use error::{DbError, DbResult};
pub use models::*;
pub use repository::*;
pub use sqlite::SqliteDatabase;
pub use validate::{ValidationIssue, Validator};

//! Database error types.
//!
//! Storage-backend agnostic errors for the data layer. Uses miette for
//! diagnostic output and thiserror for the derive macros.

use miette::Diagnostic;
use thiserror::Error;

/// Data layer errors.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Entity not found: {entity_type} with id '{id}'")]
    #[diagnostic(code(tams::db::not_found))]
    NotFound { entity_type: String, id: String },

    #[error("Invalid data: {message} (hint: {help})")]
    #[diagnostic(code(tams::db::invalid_data))]
    InvalidData { message: String, help: String },

    #[error("Unknown model in dump: {model}")]
    #[diagnostic(
        code(tams::db::unknown_model),
        help("Only attendance models can be loaded; check the dump was produced by tams or manage.py dumpdata")
    )]
    UnknownModel { model: String },

    #[error("Database error: {message}")]
    #[diagnostic(code(tams::db::database_error))]
    Database { message: String },

    #[error("Migration error: {message}")]
    #[diagnostic(code(tams::db::migration_error))]
    Migration { message: String },

    #[error("Connection error: {message}")]
    #[diagnostic(code(tams::db::connection_error))]
    Connection { message: String },

    #[error("Constraint violation: {message}")]
    #[diagnostic(code(tams::db::constraint))]
    Constraint { message: String },

    #[error("External data layer failed: {message}")]
    #[diagnostic(code(tams::db::external))]
    External { message: String },

    #[error("Operation not supported by this backend: {operation}")]
    #[diagnostic(code(tams::db::unsupported))]
    Unsupported { operation: String },
}

impl DbError {
    /// Classify an sqlx error, surfacing constraint failures separately.
    pub(crate) fn from_sqlx(context: &str, e: sqlx::Error) -> Self {
        let text = e.to_string();
        if text.contains("FOREIGN KEY constraint failed")
            || text.contains("UNIQUE constraint failed")
            || text.contains("CHECK constraint failed")
            || text.contains("NOT NULL constraint failed")
        {
            DbError::Constraint {
                message: format!("{}: {}", context, text),
            }
        } else {
            DbError::Database {
                message: format!("{}: {}", context, text),
            }
        }
    }
}

/// Result type for data layer operations.
pub type DbResult<T> = Result<T, DbError>;

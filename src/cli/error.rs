use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::db::DbError;
use crate::sync::{StoreError, SyncError};

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error("`{command}` needs the SQLite backend")]
    #[diagnostic(
        code(tams::cli::requires_sqlite),
        help("Remove the \"backend\" entry from config.json, or run the host framework's own management commands")
    )]
    RequiresSqlite { command: &'static str },

    #[error("Failed to create directory {path}: {source}")]
    #[diagnostic(code(tams::cli::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(tams::cli::render))]
    Render(#[from] serde_json::Error),
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Sync(SyncError::Store(e))
    }
}

pub type CliResult<T> = Result<T, CliError>;

//! Data layer selected by configuration.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::cli::error::{CliError, CliResult};
use crate::config::BackendConfig;
use crate::db::{
    DataLayer, Database, DbResult, DumpPayload, Entity, ImportMode, ImportSummary, NodeDevice,
    SqliteDatabase,
};
use crate::sync::{CommandDataLayer, RealCommand};

pub enum Backend {
    Sqlite(SqliteDatabase),
    Command(CommandDataLayer<RealCommand>),
}

impl Backend {
    /// Open the configured backend. SQLite databases are created and
    /// migrated on first use.
    pub async fn open(config: &BackendConfig, db_path: &Path) -> CliResult<Self> {
        match config {
            BackendConfig::Sqlite => {
                if let Some(parent) = db_path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent).map_err(|source| CliError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                let db = SqliteDatabase::open(db_path).await?;
                db.migrate().await?;
                debug!(path = %db_path.display(), "sqlite backend ready");
                Ok(Backend::Sqlite(db))
            }
            BackendConfig::Command {
                program,
                args,
                app_label,
                working_dir,
            } => {
                let runner = RealCommand::new(program, args.clone(), working_dir.clone());
                debug!(program = %program, "command backend ready");
                Ok(Backend::Command(CommandDataLayer::new(runner, app_label)))
            }
        }
    }

    /// The local database, for operations only SQLite supports.
    pub fn database(&self, command: &'static str) -> CliResult<&SqliteDatabase> {
        match self {
            Backend::Sqlite(db) => Ok(db),
            Backend::Command(_) => Err(CliError::RequiresSqlite { command }),
        }
    }
}

impl DataLayer for Backend {
    async fn export(&self, entities: &[Entity]) -> DbResult<DumpPayload> {
        match self {
            Backend::Sqlite(db) => db.export(entities).await,
            Backend::Command(cmd) => cmd.export(entities).await,
        }
    }

    async fn import(&self, path: &Path, mode: ImportMode) -> DbResult<ImportSummary> {
        match self {
            Backend::Sqlite(db) => db.import(path, mode).await,
            Backend::Command(cmd) => cmd.import(path, mode).await,
        }
    }

    async fn verify_device(&self, token: &str) -> DbResult<NodeDevice> {
        match self {
            Backend::Sqlite(db) => db.verify_device(token).await,
            Backend::Command(cmd) => cmd.verify_device(token).await,
        }
    }

    async fn counts(&self) -> DbResult<BTreeMap<Entity, usize>> {
        match self {
            Backend::Sqlite(db) => db.counts().await,
            Backend::Command(cmd) => cmd.counts().await,
        }
    }
}

//! SQLite database connection and migration management.

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use super::device::SqliteDeviceRepository;
use super::dump::{count_rows, export_entities, import_payload};
use crate::db::{
    DataLayer, Database, DbError, DbResult, DeviceRepository, DumpPayload, Entity, ImportMode,
    ImportSummary, NodeDevice,
};

/// SQLite database implementation.
///
/// Foreign keys are enforced on every connection, so dumps must list parent
/// tables before the tables that reference them.
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (creating if needed) a database at the given path.
    pub async fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        debug!(path = %path.as_ref().display(), "opened sqlite database");
        Ok(Self { pool })
    }

    /// Create an in-memory database (useful for testing).
    ///
    /// The pool holds a single connection that never expires; every new
    /// connection to `:memory:` would otherwise see an empty database.
    pub async fn in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Underlying connection pool, for tests and ad-hoc queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl DataLayer for SqliteDatabase {
    async fn export(&self, entities: &[Entity]) -> DbResult<DumpPayload> {
        // One read transaction so the dump is a consistent snapshot.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::from_sqlx("Failed to begin transaction", e))?;

        let payload = export_entities(&mut tx, entities).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::from_sqlx("Failed to end export transaction", e))?;

        Ok(payload)
    }

    async fn import(&self, path: &Path, mode: ImportMode) -> DbResult<ImportSummary> {
        let payload = DumpPayload::from_path(path)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::from_sqlx("Failed to begin transaction", e))?;

        // Dropping the transaction on error rolls back every applied record.
        let summary = import_payload(&mut tx, &payload, mode).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::from_sqlx("Failed to commit import", e))?;

        info!(
            records = summary.total(),
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            "import committed"
        );
        Ok(summary)
    }

    async fn verify_device(&self, token: &str) -> DbResult<NodeDevice> {
        self.devices()
            .find_by_token(token)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity_type: "NodeDevice".to_string(),
                id: "<token>".to_string(),
            })
    }

    async fn counts(&self) -> DbResult<BTreeMap<Entity, usize>> {
        let mut counts = BTreeMap::new();
        for entity in Entity::ALL {
            counts.insert(entity, count_rows(&self.pool, entity).await?);
        }
        Ok(counts)
    }
}

impl Database for SqliteDatabase {
    type Devices<'a> = SqliteDeviceRepository<'a>;

    async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./data/sql/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration {
                message: e.to_string(),
            })?;

        debug!("migrations applied");
        Ok(())
    }

    fn devices(&self) -> Self::Devices<'_> {
        SqliteDeviceRepository { pool: &self.pool }
    }
}

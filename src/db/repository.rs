//! Data layer traits.
//!
//! `DataLayer` is the export/import seam the sync coordinator talks to; it is
//! implemented in-process by SQLite and out-of-process by a management
//! command. `Database` and `DeviceRepository` cover what only a local store
//! can do.

use std::collections::BTreeMap;
use std::path::Path;

use crate::db::{
    DbResult,
    models::{DumpPayload, Entity, ImportMode, ImportSummary, NodeDevice},
};

/// Bulk export/import of dump records.
pub trait DataLayer {
    /// Export every row of the given entities, in list order, as one payload.
    async fn export(&self, entities: &[Entity]) -> DbResult<DumpPayload>;

    /// Import the dump file at `path`.
    async fn import(&self, path: &Path, mode: ImportMode) -> DbResult<ImportSummary>;

    /// Resolve a node device by its token, failing if it is not registered.
    async fn verify_device(&self, token: &str) -> DbResult<NodeDevice>;

    /// Row counts per entity.
    async fn counts(&self) -> DbResult<BTreeMap<Entity, usize>>;
}

/// Registry of node devices.
pub trait DeviceRepository {
    /// Register a device with the next free id and a fresh token.
    async fn register(&self, name: Option<&str>) -> DbResult<NodeDevice>;

    /// All registered devices ordered by id.
    async fn list(&self) -> DbResult<Vec<NodeDevice>>;

    /// Find a device by token.
    async fn find_by_token(&self, token: &str) -> DbResult<Option<NodeDevice>>;
}

/// A local store with migrations and a device registry.
pub trait Database: DataLayer {
    type Devices<'a>: DeviceRepository
    where
        Self: 'a;

    /// Apply pending schema migrations.
    async fn migrate(&self) -> DbResult<()>;

    fn devices(&self) -> Self::Devices<'_>;
}

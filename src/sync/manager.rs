//! Sync manager - high-level dump and load operations.
//!
//! Coordinates table selection, dump production, the dump store and the load
//! applier, plus the device checks that guard loads into the server.

use miette::Diagnostic;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::{
    applier::{ApplyError, apply_dump},
    producer::{ProduceError, produce_dump},
    selection::{Origin, Target},
    store::{DumpStore, StoreError},
};
use crate::db::{DataLayer, DbError, Entity, ImportSummary, NodeDevice, ValidationIssue, Validator};

/// Errors that can occur during sync operations.
#[derive(Error, Diagnostic, Debug)]
pub enum SyncError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Produce(#[from] ProduceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error("A device token is required to load node dumps into the server")]
    #[diagnostic(
        code(tams::sync::device_token_required),
        help("Pass --device-token with a token from `tams-sync device register`")
    )]
    DeviceTokenRequired,

    #[error("Device token is not registered")]
    #[diagnostic(code(tams::sync::unknown_device))]
    UnknownDevice,
}

/// Result of writing a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOutcome {
    pub origin: Origin,
    pub path: PathBuf,
    pub records: usize,
}

/// Result of loading a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub target: Target,
    pub summary: ImportSummary,
    /// The device that pushed the dump, when a token was given.
    pub device: Option<NodeDevice>,
}

/// State of one dump file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFileStatus {
    pub origin: Origin,
    pub path: PathBuf,
    pub exists: bool,
    /// Records per model label. Empty when the file is missing or unreadable.
    pub models: BTreeMap<String, usize>,
    pub checksum: Option<String>,
    /// Set when the file exists but does not parse as a dump.
    pub error: Option<String>,
}

impl DumpFileStatus {
    pub fn records(&self) -> usize {
        self.models.values().sum()
    }
}

/// Overall sync status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub dump_dir: PathBuf,
    pub dumps: Vec<DumpFileStatus>,
    /// Row counts per entity, when the data layer can report them.
    pub db_counts: Option<BTreeMap<Entity, usize>>,
}

/// Sync manager handles all dump and load operations.
pub struct SyncManager {
    store: DumpStore,
    validator: Validator,
    require_device_token: bool,
}

impl SyncManager {
    pub fn new(store: DumpStore, validator: Validator) -> Self {
        Self {
            store,
            validator,
            require_device_token: false,
        }
    }

    /// Refuse loads into the server that do not carry a device token.
    pub fn require_device_token(mut self, required: bool) -> Self {
        self.require_device_token = required;
        self
    }

    pub fn store(&self) -> &DumpStore {
        &self.store
    }

    /// Export the entities `origin` is responsible for and store the dump.
    #[instrument(skip(self, layer))]
    pub async fn dump<L: DataLayer>(&self, layer: &L, origin: Origin) -> Result<DumpOutcome, SyncError> {
        let text = produce_dump(layer, origin).await?;
        let path = self.store.save(&text, origin)?;
        let records = self.store.load_payload(origin)?.len();

        info!(path = %path.display(), records, "dump written");
        Ok(DumpOutcome {
            origin,
            path,
            records,
        })
    }

    /// Load the opposite side's dump into `target`.
    #[instrument(skip(self, layer, device_token))]
    pub async fn load<L: DataLayer>(
        &self,
        layer: &L,
        target: Target,
        device_token: Option<&str>,
    ) -> Result<LoadOutcome, SyncError> {
        let device = match (target, device_token) {
            (Target::Server, Some(token)) => Some(self.verify_device(layer, token).await?),
            (Target::Server, None) if self.require_device_token => {
                return Err(SyncError::DeviceTokenRequired);
            }
            (Target::Node, Some(_)) => {
                debug!("device token ignored when loading into a node");
                None
            }
            _ => None,
        };

        let summary = apply_dump(layer, &self.store, &self.validator, target).await?;

        if let Some(device) = &device {
            info!(device = %device.name, records = summary.total(), "accepted node dump");
        }
        Ok(LoadOutcome {
            target,
            summary,
            device,
        })
    }

    /// The stored dump for `origin`, as JSON.
    pub fn show(&self, origin: Origin) -> Result<Value, SyncError> {
        Ok(self.store.load(origin)?)
    }

    /// Validate the stored dump for `origin` without loading it.
    pub fn validate(&self, origin: Origin) -> Result<Vec<ValidationIssue>, SyncError> {
        let payload = self.store.load_payload(origin)?;
        Ok(self.validator.validate_payload(&payload))
    }

    /// Dump files and database row counts.
    pub async fn status<L: DataLayer>(&self, layer: &L) -> Result<SyncStatus, SyncError> {
        let mut dumps = Vec::new();
        for origin in Origin::ALL {
            dumps.push(self.dump_status(origin)?);
        }

        let db_counts = match layer.counts().await {
            Ok(counts) => Some(counts),
            Err(DbError::Unsupported { .. }) => None,
            Err(e) => return Err(e.into()),
        };

        Ok(SyncStatus {
            dump_dir: self.store.dir().to_path_buf(),
            dumps,
            db_counts,
        })
    }

    fn dump_status(&self, origin: Origin) -> Result<DumpFileStatus, SyncError> {
        let path = self.store.path(origin);
        let mut status = DumpFileStatus {
            origin,
            path,
            exists: self.store.exists(origin),
            models: BTreeMap::new(),
            checksum: None,
            error: None,
        };
        if !status.exists {
            return Ok(status);
        }

        status.checksum = Some(self.store.checksum(origin)?);
        match self.store.load_payload(origin) {
            Ok(payload) => status.models = payload.counts(),
            Err(StoreError::Parse(e)) => status.error = Some(e.to_string()),
            Err(e) => return Err(e.into()),
        }
        Ok(status)
    }

    async fn verify_device<L: DataLayer>(&self, layer: &L, token: &str) -> Result<NodeDevice, SyncError> {
        match layer.verify_device(token).await {
            Ok(device) => Ok(device),
            Err(DbError::NotFound { .. }) => {
                warn!("rejected load with unregistered device token");
                Err(SyncError::UnknownDevice)
            }
            Err(e) => Err(e.into()),
        }
    }
}

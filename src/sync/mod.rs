//! Sync module - dump/load coordination between the server and node devices.
//!
//! The server exports reference data (`server_dump.json`) for nodes to load;
//! nodes export the attendance they collected (`node_dump.json`) for the
//! server to merge. Moving the files between machines is left to the operator.

mod applier;
#[cfg(test)]
mod applier_test;
mod command;
mod manager;
mod paths;
#[cfg(test)]
mod paths_test;
mod producer;
mod selection;
#[cfg(test)]
mod selection_test;
mod store;

pub use applier::{ApplyError, apply_dump};
#[cfg(test)]
pub use command::MockCommandRunner;
pub use command::{CommandDataLayer, CommandError, CommandRunner, RealCommand, parse_installed};
pub use manager::{DumpFileStatus, DumpOutcome, LoadOutcome, SyncError, SyncManager, SyncStatus};
pub use paths::{get_config_path, get_data_dir, get_db_path, get_dump_dir};
pub use producer::{ProduceError, produce_dump};
pub use selection::{NODE_DUMP, Origin, SERVER_DUMP, Target, select_entities};
pub use store::{DumpStore, StoreError};

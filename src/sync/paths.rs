//! Path resolution for tams directories.
//!
//! Provides XDG-compliant defaults; every path can be overridden through
//! `config.json` or command line flags.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "tams";

/// Get XDG-compliant data directory for tams.
///
/// Uses `$XDG_DATA_HOME/tams`, falling back to `~/.local/share/tams`. When
/// neither variable is set the current directory is used.
pub fn get_data_dir() -> PathBuf {
    let data_home = env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".local/share")))
        .unwrap_or_else(|_| PathBuf::from("."));

    data_home.join(APP_DIR)
}

/// Directory holding `server_dump.json` and `node_dump.json`.
pub fn get_dump_dir() -> PathBuf {
    get_data_dir().join("dumps")
}

/// Default SQLite database file.
pub fn get_db_path() -> PathBuf {
    get_data_dir().join("tams.db")
}

/// Default configuration file.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.json")
}

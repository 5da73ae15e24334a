pub mod backend;
mod commands;
pub mod error;
pub mod utils;


use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::{Database, Validator};
use crate::sync::{DumpStore, Origin, SyncManager, Target, get_config_path};
use backend::Backend;
use error::CliResult;

#[derive(Parser)]
#[command(name = "tams-sync")]
#[command(author, version, about = "Attendance dump/load between the server and node devices", long_about = None)]
pub struct Cli {
    /// Config file (default: $XDG_DATA_HOME/tams/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding server_dump.json and node_dump.json
    #[arg(long, global = true)]
    pub dump_dir: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Export this side's tables to its dump file
    Dump {
        /// Which side this machine is
        #[arg(long, value_enum)]
        from: Origin,
    },
    /// Load the other side's dump into this machine
    Load {
        /// Which side this machine is
        #[arg(long, value_enum)]
        to: Target,
        /// Token of the node device that produced the dump
        #[arg(long)]
        device_token: Option<String>,
    },
    /// Print a stored dump
    Show {
        #[arg(long, value_enum)]
        from: Origin,
    },
    /// Check a stored dump against the configured formats
    Validate {
        #[arg(long, value_enum)]
        from: Origin,
    },
    /// Show dump files and database row counts
    Status,
    /// Node device registry
    Device {
        #[command(subcommand)]
        command: DeviceCommands,
    },
}

#[derive(Subcommand)]
enum DeviceCommands {
    /// Register a node device and print its token
    Register {
        /// Device name (default: "TAMS <id>")
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered devices
    List,
}

/// Initialize tracing subscriber with env filter, logging to stderr
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tams=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub async fn run() -> miette::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let output = execute(cli).await?;
    println!("{}", output);
    Ok(())
}

async fn execute(cli: Cli) -> CliResult<String> {
    let config_path = cli.config.unwrap_or_else(get_config_path);
    let config = Config::load(&config_path)?;

    let dump_dir = cli.dump_dir.unwrap_or_else(|| config.dump_dir());
    let db_path = cli.db.unwrap_or_else(|| config.database_path());

    let validator = Validator::new(&config.formats)?;
    let backend = || Backend::open(&config.backend, &db_path);

    let manager = || -> CliResult<SyncManager> {
        let store = DumpStore::new(&dump_dir)?;
        Ok(SyncManager::new(store, validator.clone())
            .require_device_token(config.require_device_token))
    };

    match cli.command {
        Commands::Migrate => {
            backend().await?.database("migrate")?.migrate().await?;
            Ok("Database migrations complete".to_string())
        }
        Commands::Dump { from } => {
            commands::sync::dump(&manager()?, &backend().await?, from).await
        }
        Commands::Load { to, device_token } => {
            let backend = backend().await?;
            commands::sync::load(&manager()?, &backend, to, device_token.as_deref()).await
        }
        Commands::Show { from } => commands::sync::show(&manager()?, from),
        Commands::Validate { from } => commands::sync::validate(&manager()?, from),
        Commands::Status => commands::sync::status(&manager()?, &backend().await?).await,
        Commands::Device { command } => {
            let backend = backend().await?;
            let db = backend.database("device")?;
            match command {
                DeviceCommands::Register { name } => {
                    commands::device::register(db, name.as_deref()).await
                }
                DeviceCommands::List => commands::device::list(db).await,
            }
        }
    }
}

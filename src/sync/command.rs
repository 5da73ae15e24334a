//! Data layer backed by an external management command.
//!
//! The command is invoked as `<program> <args…> dumpdata <app>.<Model>…` and
//! `<program> <args…> loaddata <path>`, for example `python manage.py`.
//! Unlike a fire-and-forget subprocess call, every invocation checks the exit
//! status and surfaces the command's output on failure.

use miette::Diagnostic;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::db::{
    DataLayer, DbError, DbResult, DumpPayload, Entity, ImportMode, ImportSummary, NodeDevice,
};

#[derive(Error, Diagnostic, Debug)]
pub enum CommandError {
    #[error("Command failed to start: {0}")]
    #[diagnostic(code(tams::sync::command::command_failed))]
    CommandFailed(String),

    #[error("Command returned non-zero exit code {code}: {output}")]
    #[diagnostic(code(tams::sync::command::non_zero_exit))]
    NonZeroExit { code: i32, output: String },

    #[error("Command not installed or not in PATH: {0}")]
    #[diagnostic(code(tams::sync::command::not_found))]
    NotFound(String),
}

impl From<CommandError> for DbError {
    fn from(e: CommandError) -> Self {
        DbError::External {
            message: e.to_string(),
        }
    }
}

/// Runs the management command. Can be mocked in tests.
#[cfg_attr(test, automock)]
pub trait CommandRunner {
    /// Run the command with extra arguments, failing on a non-zero exit.
    fn run(&self, args: &[String]) -> Result<Output, CommandError>;
}

/// Real implementation of CommandRunner using std::process::Command.
#[derive(Debug, Clone)]
pub struct RealCommand {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl RealCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>, working_dir: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir,
        }
    }

    pub(crate) fn check_output(&self, output: Output) -> Result<Output, CommandError> {
        if output.status.success() {
            return Ok(output);
        }

        let code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let combined = match (stdout.is_empty(), stderr.is_empty()) {
            (false, false) => format!("{}\n{}", stdout, stderr),
            (false, true) => stdout,
            _ => stderr,
        };
        Err(CommandError::NonZeroExit {
            code,
            output: combined,
        })
    }
}

impl CommandRunner for RealCommand {
    fn run(&self, args: &[String]) -> Result<Output, CommandError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).args(args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        debug!(program = %self.program, ?args, "running management command");
        let output = command.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::NotFound(self.program.clone())
            } else {
                CommandError::CommandFailed(e.to_string())
            }
        })?;
        self.check_output(output)
    }
}

/// Number reported by `loaddata`'s "Installed N object(s)" line.
pub fn parse_installed(output: &str) -> Option<usize> {
    Regex::new(r"Installed (\d+) object")
        .ok()?
        .captures(output)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// DataLayer that shells out to `dumpdata` / `loaddata`.
pub struct CommandDataLayer<R: CommandRunner> {
    runner: R,
    app_label: String,
}

impl<R: CommandRunner> CommandDataLayer<R> {
    pub fn new(runner: R, app_label: impl Into<String>) -> Self {
        Self {
            runner,
            app_label: app_label.into(),
        }
    }

    fn model_arg(&self, entity: Entity) -> String {
        format!("{}.{}", self.app_label, entity.name())
    }
}

impl<R: CommandRunner> DataLayer for CommandDataLayer<R> {
    async fn export(&self, entities: &[Entity]) -> DbResult<DumpPayload> {
        let mut args = vec!["dumpdata".to_string()];
        args.extend(entities.iter().map(|&e| self.model_arg(e)));

        let output = self.runner.run(&args)?;
        serde_json::from_slice(&output.stdout).map_err(|e| DbError::External {
            message: format!("dumpdata produced invalid JSON: {}", e),
        })
    }

    async fn import(&self, path: &Path, mode: ImportMode) -> DbResult<ImportSummary> {
        if mode == ImportMode::Merge {
            warn!("command backend loads by primary key; merge matching is not applied");
        }

        // Per-entity counts come from the file itself; loaddata only reports a total.
        let payload = DumpPayload::from_path(path)?;
        let mut entities = BTreeMap::new();
        for record in &payload.records {
            let entity = record.entity().ok_or_else(|| DbError::UnknownModel {
                model: record.model.clone(),
            })?;
            *entities.entry(entity).or_insert(0) += 1;
        }

        let args = vec!["loaddata".to_string(), path.display().to_string()];
        let output = self.runner.run(&args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        let installed = parse_installed(&stdout).ok_or_else(|| DbError::External {
            message: format!("loaddata did not report installed objects: {}", stdout.trim()),
        })?;

        Ok(ImportSummary {
            entities,
            created: installed,
            updated: 0,
            skipped: 0,
        })
    }

    async fn verify_device(&self, _token: &str) -> DbResult<NodeDevice> {
        Err(DbError::Unsupported {
            operation: "device verification".to_string(),
        })
    }

    async fn counts(&self) -> DbResult<BTreeMap<Entity, usize>> {
        Err(DbError::Unsupported {
            operation: "row counts".to_string(),
        })
    }
}

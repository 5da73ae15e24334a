//! Loading a stored dump into the local data layer.

use miette::Diagnostic;
use thiserror::Error;
use tracing::{info, instrument, warn};

use super::selection::Target;
use super::store::{DumpStore, StoreError};
use crate::db::{DataLayer, DbError, ImportSummary, ValidationIssue, Validator};

#[derive(Error, Diagnostic, Debug)]
pub enum ApplyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("Dump failed validation with {} issue(s)", .0.len())]
    #[diagnostic(
        code(tams::sync::apply::validation),
        help("Run `tams-sync validate` to list every issue")
    )]
    Validation(Vec<ValidationIssue>),

    #[error("Import failed: {0}")]
    #[diagnostic(code(tams::sync::apply::import))]
    Import(#[from] DbError),
}

/// Load the dump produced by the opposite side of `target`.
///
/// The payload is validated before anything is written; the import itself is
/// all-or-nothing.
#[instrument(skip(layer, store, validator))]
pub async fn apply_dump<L: DataLayer>(
    layer: &L,
    store: &DumpStore,
    validator: &Validator,
    target: Target,
) -> Result<ImportSummary, ApplyError> {
    let source = target.source();
    let payload = store.load_payload(source)?;

    let issues = validator.validate_payload(&payload);
    if !issues.is_empty() {
        for issue in issues.iter().take(10) {
            warn!(%issue, "invalid record");
        }
        return Err(ApplyError::Validation(issues));
    }

    let summary = layer
        .import(&store.path(source), target.import_mode())
        .await?;

    info!(
        records = summary.total(),
        created = summary.created,
        skipped = summary.skipped,
        "loaded {} dump into {}",
        source,
        target
    );
    Ok(summary)
}

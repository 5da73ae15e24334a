//! Dump production: one export call covering a side's selection.

use miette::Diagnostic;
use thiserror::Error;
use tracing::{info, instrument};

use super::selection::Origin;
use crate::db::{DataLayer, DbError};

#[derive(Error, Diagnostic, Debug)]
pub enum ProduceError {
    #[error("Export failed: {0}")]
    #[diagnostic(code(tams::sync::produce::export))]
    Export(#[from] DbError),

    #[error("Failed to serialize dump: {0}")]
    #[diagnostic(code(tams::sync::produce::serialize))]
    Serialize(#[from] serde_json::Error),
}

/// Export every entity selected for `origin` and return the dump text.
#[instrument(skip(layer))]
pub async fn produce_dump<L: DataLayer>(layer: &L, origin: Origin) -> Result<String, ProduceError> {
    let payload = layer.export(origin.entities()).await?;
    let text = serde_json::to_string(&payload)?;

    info!(records = payload.len(), "produced {} dump", origin);
    Ok(text)
}

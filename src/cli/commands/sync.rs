//! Dump, load and inspection commands.

use tabled::{Table, Tabled};

use crate::cli::error::CliResult;
use crate::cli::utils::{apply_table_style, or_dash, truncate_with_ellipsis};
use crate::db::{DataLayer, ImportSummary, ValidationIssue};
use crate::sync::{LoadOutcome, Origin, SyncManager, SyncStatus, Target};

#[derive(Tabled)]
pub(crate) struct CountDisplay {
    #[tabled(rename = "Model")]
    pub(crate) model: String,
    #[tabled(rename = "Records")]
    pub(crate) records: usize,
}

#[derive(Tabled)]
pub(crate) struct DumpFileDisplay {
    #[tabled(rename = "Dump")]
    pub(crate) origin: String,
    #[tabled(rename = "Path")]
    pub(crate) path: String,
    #[tabled(rename = "Records")]
    pub(crate) records: String,
    #[tabled(rename = "SHA-256")]
    pub(crate) checksum: String,
}

#[derive(Tabled)]
pub(crate) struct IssueDisplay {
    #[tabled(rename = "Model")]
    pub(crate) model: String,
    #[tabled(rename = "PK")]
    pub(crate) pk: String,
    #[tabled(rename = "Field")]
    pub(crate) field: String,
    #[tabled(rename = "Problem")]
    pub(crate) message: String,
}

impl From<&ValidationIssue> for IssueDisplay {
    fn from(issue: &ValidationIssue) -> Self {
        Self {
            model: issue.model.clone(),
            pk: issue.pk.clone(),
            field: or_dash(issue.field.as_deref()),
            message: issue.message.clone(),
        }
    }
}

fn count_table<I>(rows: I) -> String
where
    I: IntoIterator<Item = (String, usize)>,
{
    let display: Vec<CountDisplay> = rows
        .into_iter()
        .map(|(model, records)| CountDisplay { model, records })
        .collect();
    let mut table = Table::new(display);
    apply_table_style(&mut table);
    table.to_string()
}

pub(crate) fn format_summary(summary: &ImportSummary) -> String {
    let mut output = String::new();
    if !summary.entities.is_empty() {
        output.push_str(&count_table(
            summary.entities.iter().map(|(e, n)| (e.to_string(), *n)),
        ));
        output.push('\n');
    }
    output.push_str(&format!(
        "{} record(s): {} created, {} updated, {} skipped",
        summary.total(),
        summary.created,
        summary.updated,
        summary.skipped
    ));
    output
}

pub(crate) fn format_issues(origin: Origin, issues: &[ValidationIssue]) -> String {
    if issues.is_empty() {
        return format!("No issues found in {} dump.", origin);
    }

    let display: Vec<IssueDisplay> = issues.iter().map(IssueDisplay::from).collect();
    let mut table = Table::new(display);
    apply_table_style(&mut table);
    format!("{}\n{} issue(s) found in {} dump.", table, issues.len(), origin)
}

pub(crate) fn format_status(status: &SyncStatus) -> String {
    let display: Vec<DumpFileDisplay> = status
        .dumps
        .iter()
        .map(|dump| DumpFileDisplay {
            origin: dump.origin.to_string(),
            path: dump.path.display().to_string(),
            records: match (&dump.error, dump.exists) {
                (Some(_), _) => "invalid".to_string(),
                (None, true) => dump.records().to_string(),
                (None, false) => "missing".to_string(),
            },
            checksum: or_dash(
                dump.checksum
                    .as_deref()
                    .map(|c| truncate_with_ellipsis(c, 19))
                    .as_deref(),
            ),
        })
        .collect();
    let mut table = Table::new(display);
    apply_table_style(&mut table);

    let mut output = format!("Dump directory: {}\n{}", status.dump_dir.display(), table);
    if let Some(counts) = &status.db_counts {
        output.push_str("\n\nDatabase:\n");
        output.push_str(&count_table(counts.iter().map(|(e, n)| (e.to_string(), *n))));
    }
    output
}

/// Produce and store the dump for `origin`.
pub async fn dump<L: DataLayer>(manager: &SyncManager, layer: &L, origin: Origin) -> CliResult<String> {
    let outcome = manager.dump(layer, origin).await?;
    Ok(format!(
        "Wrote {} record(s) to {}",
        outcome.records,
        outcome.path.display()
    ))
}

/// Load the opposite side's dump into `target`.
pub async fn load<L: DataLayer>(
    manager: &SyncManager,
    layer: &L,
    target: Target,
    device_token: Option<&str>,
) -> CliResult<String> {
    let LoadOutcome {
        summary, device, ..
    } = manager.load(layer, target, device_token).await?;

    let mut output = format!("Loaded {} dump into {}", target.source(), target);
    if let Some(device) = device {
        output.push_str(&format!(" from {} (#{})", device.name, device.id));
    }
    output.push('\n');
    output.push_str(&format_summary(&summary));
    Ok(output)
}

/// Pretty-print the stored dump for `origin`.
pub fn show(manager: &SyncManager, origin: Origin) -> CliResult<String> {
    let document = manager.show(origin)?;
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn validate(manager: &SyncManager, origin: Origin) -> CliResult<String> {
    let issues = manager.validate(origin)?;
    Ok(format_issues(origin, &issues))
}

pub async fn status<L: DataLayer>(manager: &SyncManager, layer: &L) -> CliResult<String> {
    let status = manager.status(layer).await?;
    Ok(format_status(&status))
}

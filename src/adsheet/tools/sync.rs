use std::path::{Path, PathBuf};

use tracing::{debug, error, info, instrument, warn};

use crate::adsheet::tools::alias::LOGIN_ATTRIBUTE;
use crate::adsheet::tools::directory::Directory;
use crate::adsheet::tools::error::{Result, ToolError};
use crate::adsheet::tools::headers::{HeaderMapping, normalize_headers};
use crate::adsheet::tools::io::excel_read;
use crate::adsheet::tools::io::excel_write::{self, SheetTable};
use crate::adsheet::tools::model::{ImportSummary, SheetRow};
use crate::adsheet::tools::rows::{PreparedRow, RowOutcome, prepare_row};

/// Active, non-computer user entries. Bit 2 of `userAccountControl` marks a
/// disabled account.
pub const EXPORT_FILTER: &str = "(&(objectClass=user)(!(objectClass=computer))(!(userAccountControl:1.2.840.113556.1.4.803:=2)))";
/// Attributes fetched by the export, in column order.
pub const EXPORT_ATTRIBUTES: [&str; 3] = [LOGIN_ATTRIBUTE, "mobile", "title"];
/// Header row of the export workbook.
pub const EXPORT_COLUMNS: [&str; 3] = ["Login", "Mobile", "Title"];
pub const EXPORT_SHEET: &str = "Usuarios";
pub const DEFAULT_EXPORT_PATH: &str = "usuarios.xlsx";

/// Parameters of an import run that do not concern the connection.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub input: PathBuf,
    pub sheet: Option<String>,
    pub skip_header: bool,
    pub base_dn: String,
    pub dry_run: bool,
}

/// Validated worksheet content ready to be applied.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub mapping: HeaderMapping,
    pub rows: Vec<SheetRow>,
}

/// Reads and validates the input workbook.
///
/// Returns `None` when the worksheet holds no data rows. Header validation
/// happens here so a bad workbook never leads to a connection attempt.
#[instrument(level = "info", skip_all, fields(input = %request.input.display()))]
pub fn plan_import(request: &ImportRequest) -> Result<Option<ImportPlan>> {
    if !request.input.exists() {
        return Err(ToolError::MissingInput(request.input.clone()));
    }

    let sheet = excel_read::read_table(
        &request.input,
        request.sheet.as_deref(),
        request.skip_header,
    )?;
    if sheet.rows.is_empty() {
        return Ok(None);
    }

    let mapping = normalize_headers(&sheet.headers)?;
    debug!(
        columns = mapping.attributes.len() + 1,
        rows = sheet.rows.len(),
        "headers normalized"
    );
    Ok(Some(ImportPlan {
        mapping,
        rows: sheet.rows,
    }))
}

/// Runs a complete import: validates the workbook, opens the directory with
/// `connect`, applies every row and closes the session.
///
/// Returns `None` when there was nothing to import; `connect` is not called
/// in that case nor when validation fails.
pub fn import_workbook<D, F>(request: &ImportRequest, connect: F) -> Result<Option<ImportSummary>>
where
    D: Directory,
    F: FnOnce() -> Result<D>,
{
    let Some(plan) = plan_import(request)? else {
        info!(input = %request.input.display(), "no data rows found");
        return Ok(None);
    };

    let mut directory = connect()?;
    let summary = apply_rows(
        &mut directory,
        &plan.mapping,
        &plan.rows,
        &request.base_dn,
        request.dry_run,
    );
    close_session(directory);
    Ok(Some(summary))
}

/// Ends the session once its work is done. A failed unbind cannot undo that
/// work, so it is logged instead of failing the run.
fn close_session<D: Directory>(directory: D) {
    if let Err(err) = directory.close() {
        warn!(error = %err, "failed to close directory session");
    }
}

/// Applies each row to the directory, tallying the outcome.
///
/// Per-row failures are logged and counted; they never stop the loop. With
/// `dry_run` the lookups still run but no modification is submitted.
#[instrument(level = "info", skip_all, fields(rows = rows.len(), dry_run = dry_run))]
pub fn apply_rows<D: Directory>(
    directory: &mut D,
    mapping: &HeaderMapping,
    rows: &[SheetRow],
    base_dn: &str,
    dry_run: bool,
) -> ImportSummary {
    let mut summary = ImportSummary {
        dry_run,
        ..ImportSummary::default()
    };

    for row in rows {
        match prepare_row(row, mapping) {
            RowOutcome::Blank => debug!(line = row.line, "blank row"),
            RowOutcome::MissingLogin => {
                warn!(line = row.line, "no login in the first column, skipping");
                summary.skipped += 1;
            }
            RowOutcome::NothingToChange { login } => {
                warn!(line = row.line, %login, "no attribute values to change, skipping");
                summary.skipped += 1;
            }
            RowOutcome::Ready(prepared) => {
                apply_row(directory, &prepared, base_dn, dry_run, &mut summary)
            }
        }
    }

    info!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        not_found = summary.not_found,
        failed = summary.failed,
        skipped = summary.skipped,
        "import finished"
    );
    summary
}

fn apply_row<D: Directory>(
    directory: &mut D,
    row: &PreparedRow,
    base_dn: &str,
    dry_run: bool,
    summary: &mut ImportSummary,
) {
    let dn = match directory.find_user_dn(base_dn, &row.login) {
        Ok(Some(dn)) => dn,
        Ok(None) => {
            warn!(line = row.line, login = %row.login, "user not found");
            summary.not_found += 1;
            return;
        }
        Err(err) => {
            error!(line = row.line, login = %row.login, error = %err, "user lookup failed");
            summary.failed += 1;
            return;
        }
    };

    info!(line = row.line, login = %row.login, %dn, changes = %row.changes, "updating entry");
    summary.processed += 1;
    if dry_run {
        return;
    }

    match directory.apply_changes(&dn, &row.changes) {
        Ok(()) => summary.succeeded += 1,
        Err(err) => {
            error!(line = row.line, %dn, error = %err, "modification failed");
            summary.failed += 1;
        }
    }
}

/// Searches active users under `base_dn` and renders one row per entry with
/// the login, mobile and title; missing attributes become empty strings.
#[instrument(level = "info", skip(directory))]
pub fn collect_users<D: Directory>(directory: &mut D, base_dn: &str) -> Result<Vec<Vec<String>>> {
    let entries = directory.search(base_dn, EXPORT_FILTER, &EXPORT_ATTRIBUTES)?;
    info!(entries = entries.len(), "users found");

    Ok(entries
        .iter()
        .map(|entry| {
            EXPORT_ATTRIBUTES
                .iter()
                .map(|attribute| entry.first(attribute).unwrap_or_default().to_string())
                .collect()
        })
        .collect())
}

/// Writes the export rows to `output`.
pub fn write_users(output: &Path, rows: Vec<Vec<String>>) -> Result<()> {
    let table = SheetTable {
        sheet_name: EXPORT_SHEET.to_string(),
        columns: EXPORT_COLUMNS.iter().map(|column| column.to_string()).collect(),
        rows,
    };
    excel_write::write_table(output, &table)
}

/// Runs a complete export and returns the number of rows written.
#[instrument(level = "info", skip(connect, output), fields(output = %output.display()))]
pub fn export_workbook<D, F>(base_dn: &str, output: &Path, connect: F) -> Result<usize>
where
    D: Directory,
    F: FnOnce() -> Result<D>,
{
    let mut directory = connect()?;
    let rows = collect_users(&mut directory, base_dn)?;

    let count = rows.len();
    write_users(output, rows)?;
    close_session(directory);
    Ok(count)
}
